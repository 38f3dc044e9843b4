//! The diff engine: compare two texts and produce a minimal edit script.

mod bisect;
pub(crate) mod cleanup;
pub(crate) mod common;
pub mod delta;
pub(crate) mod lines;

use chrono::{DateTime, Utc};

pub use cleanup::{cleanup_merge, cleanup_semantic, cleanup_semantic_lossless};

use crate::diff::common::{common_prefix, common_suffix, find_sub};
use crate::diff::lines::{lines_to_tokens, tokens_to_lines};
use crate::{Diff, Error, Op, Redline};

/// A five-way split of two texts around a shared middle at least half as
/// long as the longer text. Finding one lets the diff recurse on much
/// smaller problems.
#[derive(Debug, PartialEq, Eq)]
struct HalfMatch<'a> {
    prefix1: &'a [char],
    suffix1: &'a [char],
    prefix2: &'a [char],
    suffix2: &'a [char],
    common: &'a [char],
}

/// Same split, oriented by length rather than argument order.
struct Split<'a> {
    long_prefix: &'a [char],
    long_suffix: &'a [char],
    short_prefix: &'a [char],
    short_suffix: &'a [char],
    common: &'a [char],
}

impl Redline {
    /// Compute the differences between two texts.
    ///
    /// The result is a cleaned edit script: concatenating the non-insert
    /// records yields `old`, the non-delete records yield `new`.
    ///
    /// ```
    /// use redline::{Diff, Redline};
    ///
    /// # fn main() -> Result<(), redline::Error> {
    /// let mut rl = Redline::new();
    /// rl.set_checklines(false);
    /// let diffs = rl.diff_main("abc", "ab123c")?;
    /// assert_eq!(
    ///     vec![Diff::equal("ab"), Diff::insert("123"), Diff::equal("c")],
    ///     diffs
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub fn diff_main(&self, old: &str, new: &str) -> Result<Vec<Diff>, Error> {
        let old: Vec<char> = old.chars().collect();
        let new: Vec<char> = new.chars().collect();
        self.diff_internal(&old, &new, self.checklines(), self.deadline())
    }

    pub(crate) fn diff_internal(
        &self,
        old: &[char],
        new: &[char],
        checklines: bool,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Vec<Diff>, Error> {
        if old == new {
            if old.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![Diff::raw(Op::Equal, old)]);
        }

        // Peel off what the ends share and diff only the middle.
        let prefix = common_prefix(old, new);
        let suffix = common_suffix(&old[prefix..], &new[prefix..]);

        let mut diffs = self.compute(
            &old[prefix..old.len() - suffix],
            &new[prefix..new.len() - suffix],
            checklines,
            deadline,
        )?;

        if prefix > 0 {
            diffs.insert(0, Diff::raw(Op::Equal, &old[..prefix]));
        }
        if suffix > 0 {
            diffs.push(Diff::raw(Op::Equal, &old[old.len() - suffix..]));
        }

        cleanup_merge(&mut diffs);
        Ok(diffs)
    }

    /// Diff two middles that share no prefix or suffix.
    fn compute(
        &self,
        old: &[char],
        new: &[char],
        checklines: bool,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Vec<Diff>, Error> {
        if old.is_empty() {
            return Ok(vec![Diff::raw(Op::Insert, new)]);
        }
        if new.is_empty() {
            return Ok(vec![Diff::raw(Op::Delete, old)]);
        }

        let (long, short, deleted) = if old.len() > new.len() {
            (old, new, true)
        } else {
            (new, old, false)
        };

        if let Some(at) = find_sub(long, short, 0) {
            // The shorter text sits whole inside the longer one.
            let op = if deleted { Op::Delete } else { Op::Insert };
            return Ok(vec![
                Diff::raw(op, &long[..at]),
                Diff::raw(Op::Equal, short),
                Diff::raw(op, &long[at + short.len()..]),
            ]);
        }

        if short.len() == 1 {
            // A single character that is not inside the other text.
            return Ok(vec![Diff::raw(Op::Delete, old), Diff::raw(Op::Insert, new)]);
        }

        if let Some(hm) = self.half_match(old, new) {
            let mut diffs = self.diff_internal(hm.prefix1, hm.prefix2, checklines, deadline)?;
            diffs.push(Diff::raw(Op::Equal, hm.common));
            diffs.extend(self.diff_internal(hm.suffix1, hm.suffix2, checklines, deadline)?);
            return Ok(diffs);
        }

        if checklines && old.len() > 100 && new.len() > 100 {
            return self.line_mode(old, new, deadline);
        }

        self.bisect(old, new, deadline)
    }

    /// Line-level diff first, then rediff the changed areas character by
    /// character. Faster on large texts, can produce non-minimal results.
    fn line_mode(
        &self,
        old: &[char],
        new: &[char],
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Vec<Diff>, Error> {
        let encoded = lines_to_tokens(old, new)?;
        let token_diffs =
            self.diff_internal(&encoded.old_tokens, &encoded.new_tokens, false, deadline)?;
        let mut diffs = tokens_to_lines(&token_diffs, &encoded.lines);

        // Eliminate freak line-level matches before looking closer.
        cleanup_semantic(&mut diffs);

        // Rediff each replacement block at character granularity. The
        // trailing empty equality flushes the final block.
        diffs.push(Diff::raw(Op::Equal, &[]));
        let mut pointer = 0;
        let mut del_count = 0;
        let mut ins_count = 0;
        let mut del_text: Vec<char> = Vec::new();
        let mut ins_text: Vec<char> = Vec::new();

        while pointer < diffs.len() {
            match diffs[pointer].op() {
                Op::Insert => {
                    ins_count += 1;
                    ins_text.extend_from_slice(diffs[pointer].chars());
                }
                Op::Delete => {
                    del_count += 1;
                    del_text.extend_from_slice(diffs[pointer].chars());
                }
                Op::Equal => {
                    if del_count >= 1 && ins_count >= 1 {
                        let at = pointer - del_count - ins_count;
                        let sub = self.diff_internal(&del_text, &ins_text, false, deadline)?;
                        let sub_len = sub.len();
                        diffs.splice(at..pointer, sub);
                        pointer = at + sub_len;
                    }
                    del_count = 0;
                    ins_count = 0;
                    del_text.clear();
                    ins_text.clear();
                }
            }
            pointer += 1;
        }

        // Drop the sentinel, but only if it is still the empty record.
        if diffs.last().is_some_and(|d| d.is_empty()) {
            diffs.pop();
        }

        Ok(diffs)
    }

    /// Look for a substring of the longer text, at least half its length,
    /// that also occurs in the shorter text. Skipped entirely when the
    /// timeout is unbounded, since the split can cost optimality.
    fn half_match<'a>(&self, old: &'a [char], new: &'a [char]) -> Option<HalfMatch<'a>> {
        self.diff_timeout()?;

        let (long, short) = if old.len() > new.len() {
            (old, new)
        } else {
            (new, old)
        };
        if long.len() < 4 || short.len() * 2 < long.len() {
            return None;
        }

        // Seed once in the second quarter, once at the midpoint.
        let hm1 = Self::half_match_at(long, short, long.len().div_ceil(4));
        let hm2 = Self::half_match_at(long, short, long.len().div_ceil(2));
        let hm = match (hm1, hm2) {
            (None, None) => return None,
            (Some(hm), None) | (None, Some(hm)) => hm,
            (Some(hm1), Some(hm2)) => {
                // Keep the larger match; ties go to the quarter seed.
                if hm1.common.len() >= hm2.common.len() {
                    hm1
                } else {
                    hm2
                }
            }
        };

        Some(if old.len() > new.len() {
            HalfMatch {
                prefix1: hm.long_prefix,
                suffix1: hm.long_suffix,
                prefix2: hm.short_prefix,
                suffix2: hm.short_suffix,
                common: hm.common,
            }
        } else {
            HalfMatch {
                prefix1: hm.short_prefix,
                suffix1: hm.short_suffix,
                prefix2: hm.long_prefix,
                suffix2: hm.long_suffix,
                common: hm.common,
            }
        })
    }

    /// Grow a quarter-length seed at `idx` into the best shared run around it.
    fn half_match_at<'a>(long: &'a [char], short: &'a [char], idx: usize) -> Option<Split<'a>> {
        let seed = &long[idx..idx + long.len() / 4];

        let mut best_common: &[char] = &[];
        let mut best_long = (&long[..0], &long[..0]);
        let mut best_short = (&short[..0], &short[..0]);

        let mut next = find_sub(short, seed, 0);
        while let Some(at) = next {
            let prefix_len = common_prefix(&long[idx..], &short[at..]);
            let suffix_len = common_suffix(&long[..idx], &short[..at]);
            if best_common.len() < suffix_len + prefix_len {
                best_common = &short[at - suffix_len..at + prefix_len];
                best_long = (&long[..idx - suffix_len], &long[idx + prefix_len..]);
                best_short = (&short[..at - suffix_len], &short[at + prefix_len..]);
            }
            next = find_sub(short, seed, at + 1);
        }

        if best_common.len() * 2 >= long.len() {
            Some(Split {
                long_prefix: best_long.0,
                long_suffix: best_long.1,
                short_prefix: best_short.0,
                short_suffix: best_short.1,
                common: best_common,
            })
        } else {
            None
        }
    }
}

/// The source text of a diff: every record except the insertions.
pub fn diff_text1(diffs: &[Diff]) -> String {
    text1_chars(diffs).iter().collect()
}

/// The destination text of a diff: every record except the deletions.
pub fn diff_text2(diffs: &[Diff]) -> String {
    text2_chars(diffs).iter().collect()
}

pub(crate) fn text1_chars(diffs: &[Diff]) -> Vec<char> {
    diffs
        .iter()
        .filter(|d| d.op() != Op::Insert)
        .flat_map(|d| d.chars().iter().copied())
        .collect()
}

pub(crate) fn text2_chars(diffs: &[Diff]) -> Vec<char> {
    diffs
        .iter()
        .filter(|d| d.op() != Op::Delete)
        .flat_map(|d| d.chars().iter().copied())
        .collect()
}

/// The Levenshtein distance a diff encodes: a paired deletion and insertion
/// counts as one substitution.
pub fn levenshtein(diffs: &[Diff]) -> usize {
    let mut distance = 0;
    let mut inserts = 0;
    let mut deletes = 0;
    for diff in diffs {
        match diff.op() {
            Op::Insert => inserts += diff.len(),
            Op::Delete => deletes += diff.len(),
            Op::Equal => {
                distance += inserts.max(deletes);
                inserts = 0;
                deletes = 0;
            }
        }
    }
    distance + inserts.max(deletes)
}

/// Map a location in the source text to its equivalent in the destination
/// text. A position inside a deletion maps to the point where the deletion
/// happened.
pub fn x_index(diffs: &[Diff], loc: usize) -> usize {
    let mut chars1 = 0;
    let mut chars2 = 0;
    let mut last_chars1 = 0;
    let mut last_chars2 = 0;
    let mut hit = None;

    for diff in diffs {
        if diff.op() != Op::Insert {
            chars1 += diff.len();
        }
        if diff.op() != Op::Delete {
            chars2 += diff.len();
        }
        if chars1 > loc {
            hit = Some(diff);
            break;
        }
        last_chars1 = chars1;
        last_chars2 = chars2;
    }

    if hit.is_some_and(|d| d.op() == Op::Delete) {
        // The location was deleted.
        return last_chars2;
    }
    last_chars2 + (loc - last_chars1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Diff, Redline};

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_diff_text() {
        let diffs = vec![
            Diff::equal("jump"),
            Diff::delete("s"),
            Diff::insert("ed"),
            Diff::equal(" over "),
            Diff::delete("the"),
            Diff::insert("a"),
            Diff::equal(" lazy"),
        ];
        assert_eq!("jumps over the lazy", diff_text1(&diffs));
        assert_eq!("jumped over a lazy", diff_text2(&diffs));
    }

    #[test]
    fn test_levenshtein() {
        // Trailing equality.
        let diffs = vec![Diff::delete("abc"), Diff::insert("1234"), Diff::equal("xyz")];
        assert_eq!(4, levenshtein(&diffs));
        // Leading equality.
        let diffs = vec![Diff::equal("xyz"), Diff::delete("abc"), Diff::insert("1234")];
        assert_eq!(4, levenshtein(&diffs));
        // Middle equality splits the edits into two substitutions.
        let diffs = vec![Diff::delete("abc"), Diff::equal("xyz"), Diff::insert("1234")];
        assert_eq!(7, levenshtein(&diffs));
    }

    #[test]
    fn test_x_index() {
        // Translation on equality.
        let diffs = vec![Diff::delete("a"), Diff::insert("1234"), Diff::equal("xyz")];
        assert_eq!(5, x_index(&diffs, 2));
        // Translation on deletion.
        let diffs = vec![Diff::equal("a"), Diff::delete("1234"), Diff::equal("xyz")];
        assert_eq!(1, x_index(&diffs, 3));
    }

    #[test]
    fn test_half_match() {
        let mut rl = Redline::new();

        // No match.
        assert!(rl
            .half_match(&chars("1234567890"), &chars("abcdef"))
            .is_none());
        assert!(rl.half_match(&chars("12345"), &chars("23")).is_none());

        // Single match.
        assert_eq!(
            Some(HalfMatch {
                prefix1: &chars("12")[..],
                suffix1: &chars("90")[..],
                prefix2: &chars("a")[..],
                suffix2: &chars("z")[..],
                common: &chars("345678")[..],
            }),
            rl.half_match(&chars("1234567890"), &chars("a345678z"))
        );
        assert_eq!(
            Some(HalfMatch {
                prefix1: &chars("a")[..],
                suffix1: &chars("z")[..],
                prefix2: &chars("12")[..],
                suffix2: &chars("90")[..],
                common: &chars("345678")[..],
            }),
            rl.half_match(&chars("a345678z"), &chars("1234567890"))
        );

        // Multiple matches.
        assert_eq!(
            Some(HalfMatch {
                prefix1: &chars("12123")[..],
                suffix1: &chars("123121")[..],
                prefix2: &chars("a")[..],
                suffix2: &chars("z")[..],
                common: &chars("1234123451234")[..],
            }),
            rl.half_match(&chars("121231234123451234123121"), &chars("a1234123451234z"))
        );
        assert_eq!(
            Some(HalfMatch {
                prefix1: &chars("")[..],
                suffix1: &chars("-=-=-=-=-=")[..],
                prefix2: &chars("x")[..],
                suffix2: &chars("")[..],
                common: &chars("x-=-=-=-=-=-=-=")[..],
            }),
            rl.half_match(
                &chars("x-=-=-=-=-=-=-=-=-=-=-=-="),
                &chars("xx-=-=-=-=-=-=-=")
            )
        );

        // Non-optimal halfmatch: with a timeout the split is taken even
        // though the optimal diff would pair Hello with Hello.
        assert_eq!(
            Some(HalfMatch {
                prefix1: &chars("qHillo")[..],
                suffix1: &chars("w")[..],
                prefix2: &chars("x")[..],
                suffix2: &chars("Hulloy")[..],
                common: &chars("HelloHe")[..],
            }),
            rl.half_match(&chars("qHilloHelloHew"), &chars("xHelloHeHulloy"))
        );

        // Unbounded time means the shortcut is skipped entirely.
        rl.set_diff_timeout(None);
        assert!(rl
            .half_match(&chars("qHilloHelloHew"), &chars("xHelloHeHulloy"))
            .is_none());
    }

    #[test]
    fn test_diff_main_trivial() {
        let mut rl = Redline::new();
        rl.set_checklines(false);

        // Null case.
        assert!(rl.diff_main("", "").unwrap().is_empty());

        // Equality.
        assert_eq!(
            vec![Diff::equal("abc")],
            rl.diff_main("abc", "abc").unwrap()
        );

        // Simple insertion.
        assert_eq!(
            vec![Diff::equal("ab"), Diff::insert("123"), Diff::equal("c")],
            rl.diff_main("abc", "ab123c").unwrap()
        );

        // Simple deletion.
        assert_eq!(
            vec![Diff::equal("a"), Diff::delete("123"), Diff::equal("bc")],
            rl.diff_main("a123bc", "abc").unwrap()
        );

        // Two insertions.
        assert_eq!(
            vec![
                Diff::equal("a"),
                Diff::insert("123"),
                Diff::equal("b"),
                Diff::insert("456"),
                Diff::equal("c"),
            ],
            rl.diff_main("abc", "a123b456c").unwrap()
        );

        // Two deletions.
        assert_eq!(
            vec![
                Diff::equal("a"),
                Diff::delete("123"),
                Diff::equal("b"),
                Diff::delete("456"),
                Diff::equal("c"),
            ],
            rl.diff_main("a123b456c", "abc").unwrap()
        );
    }

    #[test]
    fn test_diff_main_optimal() {
        let mut rl = Redline::new();
        rl.set_checklines(false);
        // Perform a real diff and favor optimality over speed.
        rl.set_diff_timeout(None);

        // Simple cases.
        assert_eq!(
            vec![Diff::delete("a"), Diff::insert("b")],
            rl.diff_main("a", "b").unwrap()
        );

        assert_eq!(
            vec![
                Diff::delete("Apple"),
                Diff::insert("Banana"),
                Diff::equal("s are a"),
                Diff::insert("lso"),
                Diff::equal(" fruit."),
            ],
            rl.diff_main("Apples are a fruit.", "Bananas are also fruit.")
                .unwrap()
        );

        assert_eq!(
            vec![
                Diff::delete("a"),
                Diff::insert("\u{0680}"),
                Diff::equal("x"),
                Diff::delete("\t"),
                Diff::insert("\0"),
            ],
            rl.diff_main("ax\t", "\u{0680}x\0").unwrap()
        );

        // Overlaps.
        assert_eq!(
            vec![
                Diff::delete("1"),
                Diff::equal("a"),
                Diff::delete("y"),
                Diff::equal("b"),
                Diff::delete("2"),
                Diff::insert("xab"),
            ],
            rl.diff_main("1ayb2", "abxab").unwrap()
        );

        assert_eq!(
            vec![Diff::insert("xaxcx"), Diff::equal("abc"), Diff::delete("y")],
            rl.diff_main("abcy", "xaxcxabc").unwrap()
        );

        assert_eq!(
            vec![
                Diff::delete("ABCD"),
                Diff::equal("a"),
                Diff::delete("="),
                Diff::insert("-"),
                Diff::equal("bcd"),
                Diff::delete("="),
                Diff::insert("-"),
                Diff::equal("efghijklmnopqrs"),
                Diff::delete("EFGHIJKLMNOefg"),
            ],
            rl.diff_main(
                "ABCDa=bcd=efghijklmnopqrsEFGHIJKLMNOefg",
                "a-bcd-efghijklmnopqrs"
            )
            .unwrap()
        );

        // Large equality.
        assert_eq!(
            vec![
                Diff::insert(" "),
                Diff::equal("a"),
                Diff::insert("nd"),
                Diff::equal(" [[Pennsylvania]]"),
                Diff::delete(" and [[New"),
            ],
            rl.diff_main("a [[Pennsylvania]] and [[New", " and [[Pennsylvania]]")
                .unwrap()
        );
    }

    #[test]
    fn test_diff_main_linemode() {
        let rl = Redline::new();

        // A multi-line diff must still reconstruct both inputs exactly.
        let old = "1234567890\n".repeat(13);
        let new = "abcdefghij\n".repeat(13);
        let diffs = rl.diff_main(&old, &new).unwrap();
        assert_eq!(old, diff_text1(&diffs));
        assert_eq!(new, diff_text2(&diffs));

        // Line mode and character mode agree on single-line shaped input.
        let old = "1234567890".repeat(13);
        let new = "abcdefghij".repeat(13);
        let line_diffs = rl.diff_main(&old, &new).unwrap();
        let mut char_rl = Redline::new();
        char_rl.set_checklines(false);
        let char_diffs = char_rl.diff_main(&old, &new).unwrap();
        assert_eq!(char_diffs, line_diffs);

        // Overlapping edits across many lines.
        let old = "1234567890\n1234567890\n1234567890\n1234567890\n1234567890\n1234567890\n\
                   1234567890\n1234567890\n1234567890\n1234567890\n1234567890\n1234567890\n";
        let new = "abcdefghij\n1234567890\n1234567890\n1234567890\nabcdefghij\n1234567890\n\
                   1234567890\n1234567890\nabcdefghij\n1234567890\n1234567890\n1234567890\n";
        let diffs = rl.diff_main(old, new).unwrap();
        assert_eq!(old, diff_text1(&diffs));
        assert_eq!(new, diff_text2(&diffs));
    }

    #[test]
    fn test_diff_main_unicode() {
        let mut rl = Redline::new();
        rl.set_checklines(false);

        // Code points that differ only in their final UTF-8 byte still
        // produce whole-character diffs.
        let diffs = rl.diff_main("🤪", "🤔").unwrap();
        assert_eq!(vec![Diff::delete("🤪"), Diff::insert("🤔")], diffs);

        let diffs = rl.diff_main("I am 🤪 here", "I am 🤔 here").unwrap();
        assert_eq!(
            vec![
                Diff::equal("I am "),
                Diff::delete("🤪"),
                Diff::insert("🤔"),
                Diff::equal(" here"),
            ],
            diffs
        );
    }
}
