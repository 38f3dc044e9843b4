//! The textual patch format, close kin to GNU diff/patch output.
//!
//! ```text
//! @@ -382,8 +481,9 @@
//!  precon
//! -text
//! +new text
//!  postcon
//! ```
//!
//! Starts are one-based in the header except for zero-length spans; a length
//! of one is elided. Body lines carry the same percent-escaping as the delta
//! format.

use std::fmt;

use crate::diff::delta::{decode_text, encode_text};
use crate::patch::{Patch, Patches};
use crate::{Diff, Error, Op};

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            span(self.start1, self.length1),
            span(self.start2, self.length2)
        )?;
        for diff in &self.diffs {
            let sign = match diff.op() {
                Op::Insert => '+',
                Op::Delete => '-',
                Op::Equal => ' ',
            };
            writeln!(f, "{sign}{}", encode_text(&diff.text()))?;
        }
        Ok(())
    }
}

fn span(start: usize, length: usize) -> String {
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{length}", start + 1),
    }
}

/// Serialize patches into a block of text for storage or transmission.
pub fn patch_to_text(patches: &[Patch]) -> String {
    patches.iter().map(Patch::to_string).collect()
}

/// Parse a block of text produced by [`patch_to_text`] back into patches.
pub fn patch_from_text(text: &str) -> Result<Patches, Error> {
    let mut patches = Vec::new();
    if text.is_empty() {
        return Ok(patches);
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let mut at = 0;
    while at < lines.len() {
        let header = lines[at];
        let (start1, len1, start2, len2) =
            parse_header(header).ok_or_else(|| Error::MalformedPatch(header.to_string()))?;

        let mut patch = Patch {
            start1,
            start2,
            ..Default::default()
        };

        // Starts are one-based on the wire unless the span is empty.
        match len1 {
            None => {
                patch.start1 = one_based(start1, header)?;
                patch.length1 = 1;
            }
            Some(0) => patch.length1 = 0,
            Some(n) => {
                patch.start1 = one_based(start1, header)?;
                patch.length1 = n;
            }
        }
        match len2 {
            None => {
                patch.start2 = one_based(start2, header)?;
                patch.length2 = 1;
            }
            Some(0) => patch.length2 = 0,
            Some(n) => {
                patch.start2 = one_based(start2, header)?;
                patch.length2 = n;
            }
        }

        at += 1;
        while at < lines.len() {
            let line = lines[at];
            let Some(sign) = line.chars().next() else {
                // Blank line; skip it.
                at += 1;
                continue;
            };
            if sign == '@' {
                // Start of the next patch.
                break;
            }
            let op = match sign {
                '-' => Op::Delete,
                '+' => Op::Insert,
                ' ' => Op::Equal,
                _ => return Err(Error::MalformedPatch(line.to_string())),
            };
            let body = decode_text(&line[sign.len_utf8()..])
                .map_err(|_| Error::MalformedPatch(line.to_string()))?;
            patch.diffs.push(Diff::new(op, &body));
            at += 1;
        }

        patches.push(patch);
    }

    Ok(patches)
}

fn one_based(start: usize, header: &str) -> Result<usize, Error> {
    start
        .checked_sub(1)
        .ok_or_else(|| Error::MalformedPatch(header.to_string()))
}

/// Parse `@@ -start1[,len1] +start2[,len2] @@`. Digits only; anything else
/// is malformed.
fn parse_header(line: &str) -> Option<(usize, Option<usize>, usize, Option<usize>)> {
    let rest = line.strip_prefix("@@ -")?;
    let rest = rest.strip_suffix(" @@")?;
    let (old, new) = rest.split_once(" +")?;
    let (start1, len1) = parse_span(old)?;
    let (start2, len2) = parse_span(new)?;
    Some((start1, len1, start2, len2))
}

fn parse_span(text: &str) -> Option<(usize, Option<usize>)> {
    match text.split_once(',') {
        Some((start, len)) => Some((parse_number(start)?, Some(parse_number(len)?))),
        None => Some((parse_number(text)?, None)),
    }
}

fn parse_number(text: &str) -> Option<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
