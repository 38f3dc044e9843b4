//! The compact delta wire format.
//!
//! `=3\t-2\t+ing` means: keep 3 code points, delete 2, insert "ing".
//! Counts are code-point counts; inserted text is percent-encoded with the
//! same unreserved set the patch format uses.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{Diff, Error, Op};

/// Characters left untouched by the encoder, mirroring `encodeURI`: the
/// unreserved marks plus the reserved set, with space kept literal.
const ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b'-')
    .remove(b'.')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'?')
    .remove(b'@')
    .remove(b'_')
    .remove(b'~');

pub(crate) fn encode_text(text: &str) -> String {
    utf8_percent_encode(text, ESCAPES).to_string()
}

pub(crate) fn decode_text(text: &str) -> Result<String, Error> {
    percent_decode_str(text)
        .decode_utf8()
        .map(|cow| cow.into_owned())
        .map_err(|_| Error::MalformedDelta(text.to_string()))
}

/// Crush a diff into a delta string describing how to turn its source text
/// into its destination text.
pub fn to_delta(diffs: &[Diff]) -> String {
    let mut tokens = Vec::with_capacity(diffs.len());
    for diff in diffs {
        match diff.op() {
            Op::Insert => tokens.push(format!("+{}", encode_text(&diff.text()))),
            Op::Delete => tokens.push(format!("-{}", diff.len())),
            Op::Equal => tokens.push(format!("={}", diff.len())),
        }
    }
    tokens.join("\t")
}

/// Rebuild the full diff from the source text and a delta produced by
/// [`to_delta`].
///
/// Fails on unknown opcodes, bad counts, or a delta that does not consume
/// exactly the source text.
pub fn from_delta(text: &str, delta: &str) -> Result<Vec<Diff>, Error> {
    let source: Vec<char> = text.chars().collect();
    let mut pointer = 0;
    let mut diffs = Vec::new();

    for token in delta.split('\t') {
        if token.is_empty() {
            // Blank tokens are ok, e.g. from a trailing tab.
            continue;
        }

        // One-character opcode, then the parameter.
        let mut ops = token.chars();
        let opcode = ops.next().ok_or_else(|| Error::MalformedDelta(token.to_string()))?;
        let param = &token[opcode.len_utf8()..];

        match opcode {
            '+' => {
                let text = decode_text(param)?;
                diffs.push(Diff::insert(&text));
            }
            '-' | '=' => {
                let n: isize = param
                    .parse()
                    .map_err(|_| Error::MalformedDelta(token.to_string()))?;
                if n < 0 {
                    return Err(Error::MalformedDelta(token.to_string()));
                }
                let end = pointer + n as usize;
                if end > source.len() {
                    return Err(Error::DeltaSourceMismatch);
                }
                let run = &source[pointer..end];
                pointer = end;
                if opcode == '=' {
                    diffs.push(Diff::raw(Op::Equal, run));
                } else {
                    diffs.push(Diff::raw(Op::Delete, run));
                }
            }
            _ => return Err(Error::MalformedDelta(token.to_string())),
        }
    }

    if pointer != source.len() {
        return Err(Error::DeltaSourceMismatch);
    }

    Ok(diffs)
}
