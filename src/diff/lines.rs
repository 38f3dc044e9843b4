//! Line-level tokenization for the line-mode diff speedup.
//!
//! Each distinct line is assigned a synthetic single code point, so a
//! line-level diff is just a character diff over short token strings.

use std::collections::HashMap;

use crate::{Diff, Error};

/// Highest token value handed out. Stays below the surrogate block so every
/// token is a valid `char`; also the ceiling on distinct lines.
const MAX_LINE_TOKEN: u32 = 0xD7FF;

/// The two encoded texts plus the table mapping tokens back to lines.
/// `lines[0]` is reserved and always empty; token values index `lines`.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct LineTokens<'a> {
    pub(crate) old_tokens: Vec<char>,
    pub(crate) new_tokens: Vec<char>,
    pub(crate) lines: Vec<&'a [char]>,
}

pub(crate) fn lines_to_tokens<'a>(
    old: &'a [char],
    new: &'a [char],
) -> Result<LineTokens<'a>, Error> {
    let mut lines: Vec<&[char]> = vec![&[]];
    let mut index: HashMap<&[char], u32> = HashMap::new();

    let old_tokens = encode(old, &mut lines, &mut index)?;
    let new_tokens = encode(new, &mut lines, &mut index)?;

    Ok(LineTokens {
        old_tokens,
        new_tokens,
        lines,
    })
}

fn encode<'a>(
    text: &'a [char],
    lines: &mut Vec<&'a [char]>,
    index: &mut HashMap<&'a [char], u32>,
) -> Result<Vec<char>, Error> {
    let mut tokens = Vec::new();
    for line in text.split_inclusive(|&c| c == '\n') {
        let next = lines.len() as u32;
        let id = *index.entry(line).or_insert(next);
        if id == next {
            if next > MAX_LINE_TOKEN {
                return Err(Error::TokenSpaceExhausted);
            }
            lines.push(line);
        }
        let token = char::from_u32(id).ok_or(Error::TokenSpaceExhausted)?;
        tokens.push(token);
    }
    Ok(tokens)
}

/// Rehydrate a token-level diff into the lines the tokens stand for.
pub(crate) fn tokens_to_lines(diffs: &[Diff], lines: &[&[char]]) -> Vec<Diff> {
    diffs
        .iter()
        .map(|d| {
            let text: Vec<char> = d
                .chars()
                .iter()
                .flat_map(|&token| lines[token as usize].iter().copied())
                .collect();
            Diff::raw(d.op(), &text)
        })
        .collect()
}
