//! The match engine: locate a pattern in a text near an expected location,
//! tolerating errors in both content and position.

use std::collections::HashMap;

use crate::diff::common::{find_sub, rfind_sub};
use crate::{Error, Redline};

impl Redline {
    /// Locate `pattern` in `text` closest to `loc`.
    ///
    /// Scoring balances character errors against distance from `loc`;
    /// [`Redline::set_match_threshold`] and [`Redline::set_match_distance`]
    /// tune the trade-off. Returns `None` when nothing scores below the
    /// threshold, and an error only if the pattern is too long for the
    /// engine's bit width.
    ///
    /// ```
    /// use redline::Redline;
    ///
    /// # fn main() -> Result<(), redline::Error> {
    /// let rl = Redline::new();
    /// assert_eq!(Some(4), rl.match_main("abcdefghijk", "efxhi", 0)?);
    /// # Ok(())
    /// # }
    /// ```
    pub fn match_main(&self, text: &str, pattern: &str, loc: usize) -> Result<Option<usize>, Error> {
        let text: Vec<char> = text.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();
        self.match_inner(&text, &pattern, loc)
    }

    pub(crate) fn match_inner(
        &self,
        text: &[char],
        pattern: &[char],
        loc: usize,
    ) -> Result<Option<usize>, Error> {
        let loc = loc.min(text.len());

        if text == pattern {
            // Shortcut (potentially not guaranteed by the algorithm).
            return Ok(Some(0));
        }
        if text.is_empty() {
            return Ok(None);
        }
        if text[loc..(loc + pattern.len()).min(text.len())] == *pattern {
            // Perfect match at the perfect spot (includes the null pattern).
            return Ok(Some(loc));
        }
        self.bitap(text, pattern, loc)
    }

    /// Bitap, after Wu and Manber: one bit per pattern position, one pass
    /// per error level.
    fn bitap(&self, text: &[char], pattern: &[char], loc: usize) -> Result<Option<usize>, Error> {
        if pattern.len() > self.match_max_bits() {
            return Err(Error::PatternTooLong(self.match_max_bits()));
        }

        let alphabet = bitap_alphabet(pattern);

        // Highest score beyond which we give up.
        let mut score_threshold = self.match_threshold();

        // A nearby exact match tightens the threshold up front.
        if let Some(best) = find_sub(text, pattern, loc) {
            score_threshold = self.bitap_score(0, best, loc, pattern.len()).min(score_threshold);
            // And so does one in the other direction.
            if let Some(best) = rfind_sub(text, pattern, loc + pattern.len()) {
                score_threshold = self.bitap_score(0, best, loc, pattern.len()).min(score_threshold);
            }
        }

        let match_mask: usize = 1 << (pattern.len() - 1);
        let mut best_loc = None;

        let mut bin_max = pattern.len() + text.len();
        let mut last_rd: Vec<usize> = Vec::new();

        for d in 0..pattern.len() {
            // How far from loc may a match at this error level stray and
            // still beat the threshold? Binary search the radius.
            let mut bin_min = 0;
            let mut bin_mid = bin_max;
            while bin_min < bin_mid {
                if self.bitap_score(d, loc + bin_mid, loc, pattern.len()) <= score_threshold {
                    bin_min = bin_mid;
                } else {
                    bin_max = bin_mid;
                }
                bin_mid = (bin_max - bin_min) / 2 + bin_min;
            }
            // Use the result as the ceiling for the next level.
            bin_max = bin_mid;

            let mut start = if loc > bin_mid {
                (loc - bin_mid + 1).max(1)
            } else {
                1
            };
            let finish = (loc + bin_mid).min(text.len()) + pattern.len();

            let mut rd = vec![0_usize; finish + 2];
            rd[finish + 1] = (1 << d) - 1;

            let mut j = finish;
            while j >= start {
                let char_match = if text.len() < j {
                    0
                } else {
                    alphabet.get(&text[j - 1]).copied().unwrap_or(0)
                };

                rd[j] = if d == 0 {
                    // First pass: exact matches only.
                    ((rd[j + 1] << 1) | 1) & char_match
                } else {
                    // Subsequent passes fold in substitutions, insertions
                    // and deletions from the previous level.
                    ((rd[j + 1] << 1) | 1) & char_match
                        | (((last_rd[j + 1] | last_rd[j]) << 1) | 1)
                        | last_rd[j + 1]
                };

                if rd[j] & match_mask != 0 {
                    let score = self.bitap_score(d, j - 1, loc, pattern.len());
                    // This match will almost certainly be better than any
                    // existing match, but check anyway.
                    if score <= score_threshold {
                        score_threshold = score;
                        best_loc = Some(j - 1);
                        if j - 1 > loc {
                            // When passing loc, don't exceed the current
                            // distance from it.
                            let left = 2 * loc as isize - (j as isize - 1);
                            start = left.max(1) as usize;
                        } else {
                            // Already passed loc; downhill from here.
                            break;
                        }
                    }
                }
                j -= 1;
            }

            // No hope of a better match at higher error levels.
            if self.bitap_score(d + 1, loc, loc, pattern.len()) > score_threshold {
                break;
            }
            last_rd = rd;
        }

        Ok(best_loc)
    }

    /// Score a match with `errors` errors found at `x`; lower is better.
    fn bitap_score(&self, errors: usize, x: usize, loc: usize, pattern_len: usize) -> f32 {
        let accuracy = errors as f32 / pattern_len as f32;
        let proximity = (loc as isize - x as isize).unsigned_abs();

        if self.match_distance() == 0 {
            // Strict location mode: any drift is a total miss.
            if proximity > 0 {
                return 1.0;
            }
            return accuracy;
        }
        accuracy + proximity as f32 / self.match_distance() as f32
    }
}

/// One bitmask per distinct pattern character, bit i set where the character
/// occupies position `len - i - 1`.
fn bitap_alphabet(pattern: &[char]) -> HashMap<char, usize> {
    let mut map = HashMap::with_capacity(pattern.len());
    for (i, &c) in pattern.iter().enumerate() {
        *map.entry(c).or_insert(0_usize) |= 1 << (pattern.len() - i - 1);
    }
    map
}
