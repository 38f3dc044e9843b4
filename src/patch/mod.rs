//! The patch engine: turn diffs into portable, context-bearing patches and
//! apply them to targets that may have drifted from the original text.

pub(crate) mod text;

pub use text::{patch_from_text, patch_to_text};

use crate::diff::cleanup::{cleanup_semantic, cleanup_semantic_lossless};
use crate::diff::common::{find_sub, rfind_sub};
use crate::diff::{levenshtein, text1_chars, text2_chars, x_index};
use crate::{Diff, Error, Op, Redline};

/// One patch: a run of diffs plus enough surrounding context to locate it,
/// and its spans in the pre- and post-text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub(crate) diffs: Vec<Diff>,
    pub(crate) start1: usize,
    pub(crate) start2: usize,
    pub(crate) length1: usize,
    pub(crate) length2: usize,
}

impl Patch {
    pub fn diffs(&self) -> &[Diff] {
        &self.diffs
    }

    /// Zero-based offset into the source text.
    pub fn start1(&self) -> usize {
        self.start1
    }

    /// Zero-based offset into the destination text.
    pub fn start2(&self) -> usize {
        self.start2
    }

    /// Code points this patch consumes from the source text.
    pub fn length1(&self) -> usize {
        self.length1
    }

    /// Code points this patch produces in the destination text.
    pub fn length2(&self) -> usize {
        self.length2
    }
}

pub type Patches = Vec<Patch>;

/// What to build patches from: two texts, a ready-made diff, or both.
///
/// When the original text and its diffs are both at hand, `TextDiffs` is the
/// cheapest; the other variants compute the missing piece.
pub enum PatchSource<'a> {
    Texts(&'a str, &'a str),
    Diffs(&'a [Diff]),
    TextDiffs(&'a str, &'a [Diff]),
}

impl Redline {
    /// Build a list of patches that turns one text into another.
    ///
    /// ```
    /// use redline::{PatchSource, Redline};
    ///
    /// # fn main() -> Result<(), redline::Error> {
    /// let rl = Redline::new();
    /// let patches = rl.patch_make(PatchSource::Texts(
    ///     "Apples are a fruit.",
    ///     "Bananas are also fruit.",
    /// ))?;
    /// let (new_text, _) = rl.patch_apply(&patches, "Apples are a fruit.")?;
    /// assert_eq!("Bananas are also fruit.", new_text);
    /// # Ok(())
    /// # }
    /// ```
    pub fn patch_make(&self, input: PatchSource) -> Result<Patches, Error> {
        let storage;
        let (text, diffs): (Vec<char>, &[Diff]) = match input {
            PatchSource::Texts(old, new) => {
                let mut diffs = self.diff_main(old, new)?;
                if diffs.len() > 2 {
                    cleanup_semantic(&mut diffs);
                    self.cleanup_efficiency(&mut diffs);
                }
                storage = diffs;
                (old.chars().collect(), &storage[..])
            }
            // No origin text provided; reconstruct it from the diffs.
            PatchSource::Diffs(diffs) => (text1_chars(diffs), diffs),
            PatchSource::TextDiffs(old, diffs) => (old.chars().collect(), diffs),
        };
        Ok(self.patch_make_internal(&text, diffs))
    }

    fn patch_make_internal(&self, text: &[char], diffs: &[Diff]) -> Patches {
        if diffs.is_empty() {
            return Vec::new();
        }
        let margin = self.patch_margin() as usize;

        let mut patches = Vec::new();
        let mut patch = Patch::default();
        let mut chars1 = 0;
        let mut chars2 = 0;

        // prepatch tracks the text each patch's context is cut from;
        // postpatch shadows it with the edits so far applied, so later
        // patches get a rolling context.
        let mut prepatch: Vec<char> = text.to_vec();
        let mut postpatch: Vec<char> = prepatch.clone();

        for (idx, diff) in diffs.iter().enumerate() {
            if patch.diffs.is_empty() && diff.op() != Op::Equal {
                // A new patch starts here.
                patch.start1 = chars1;
                patch.start2 = chars2;
            }

            match diff.op() {
                Op::Insert => {
                    patch.length2 += diff.len();
                    patch.diffs.push(diff.clone());
                    postpatch.splice(chars2..chars2, diff.chars().iter().copied());
                }
                Op::Delete => {
                    patch.length1 += diff.len();
                    patch.diffs.push(diff.clone());
                    postpatch.drain(chars2..chars2 + diff.len());
                }
                Op::Equal => {
                    if diff.len() <= 2 * margin && !patch.diffs.is_empty() && idx + 1 != diffs.len()
                    {
                        // Small equality inside a patch.
                        patch.length1 += diff.len();
                        patch.length2 += diff.len();
                        patch.diffs.push(diff.clone());
                    } else if diff.len() >= 2 * margin && !patch.diffs.is_empty() {
                        // Large equality: close out the current patch.
                        self.add_context(&mut patch, &prepatch);
                        patches.push(std::mem::take(&mut patch));
                        prepatch.clone_from(&postpatch);
                        chars1 = chars2;
                    }
                }
            }

            if diff.op() != Op::Insert {
                chars1 += diff.len();
            }
            if diff.op() != Op::Delete {
                chars2 += diff.len();
            }
        }

        // Pick up the leftover patch if not empty.
        if !patch.diffs.is_empty() {
            self.add_context(&mut patch, &prepatch);
            patches.push(patch);
        }

        patches
    }

    /// Grow the patch's context until its reference pattern is unique in
    /// `text` (or as close as the match engine's window allows), then pad by
    /// one more margin for good measure.
    fn add_context(&self, patch: &mut Patch, text: &[char]) {
        if text.is_empty() {
            return;
        }
        let margin = self.patch_margin() as usize;
        let max_width = self.match_max_bits().saturating_sub(2 * margin);

        let mut pattern: &[char] = &text[patch.start2..patch.start2 + patch.length1];
        let mut padding = 0;
        while pattern.is_empty()
            || (find_sub(text, pattern, 0) != rfind_sub(text, pattern, text.len())
                && pattern.len() < max_width)
        {
            padding += margin;
            let begin = patch.start2.saturating_sub(padding);
            let end = (patch.start2 + patch.length1 + padding).min(text.len());
            pattern = &text[begin..end];
        }

        // One more chunk for luck.
        padding += margin;

        let begin = patch.start2.saturating_sub(padding);
        let prefix = &text[begin..patch.start2];
        if !prefix.is_empty() {
            patch.diffs.insert(0, Diff::raw(Op::Equal, prefix));
        }

        let begin = (patch.start2 + patch.length1).min(text.len());
        let end = (patch.start2 + patch.length1 + padding).min(text.len());
        let suffix = &text[begin..end];
        if !suffix.is_empty() {
            patch.diffs.push(Diff::raw(Op::Equal, suffix));
        }

        patch.start1 -= prefix.len();
        patch.start2 -= prefix.len();
        patch.length1 += prefix.len() + suffix.len();
        patch.length2 += prefix.len() + suffix.len();
    }

    /// Apply patches to `source`, locating each one fuzzily.
    ///
    /// Returns the patched text and one flag per input patch telling whether
    /// it could be placed.
    pub fn patch_apply(&self, patches: &[Patch], source: &str) -> Result<(String, Vec<bool>), Error> {
        let source: Vec<char> = source.chars().collect();
        let (patched, applied) = self.patch_apply_internal(patches, &source)?;
        Ok((patched.into_iter().collect(), applied))
    }

    fn patch_apply_internal(
        &self,
        patches: &[Patch],
        source: &[char],
    ) -> Result<(Vec<char>, Vec<bool>), Error> {
        if patches.is_empty() {
            return Ok((source.to_vec(), Vec::new()));
        }

        let deadline = self.deadline();
        let max_bits = self.match_max_bits();

        // Work on copies: neither the caller's patches nor the source move.
        let mut patches = patches.to_vec();
        let pad = self.add_padding(&mut patches);
        let mut text: Vec<char> = Vec::with_capacity(source.len() + 2 * pad.len());
        text.extend_from_slice(&pad);
        text.extend_from_slice(source);
        text.extend_from_slice(&pad);

        self.split_max(&mut patches);

        // delta tracks the drift between expected and actual positions of
        // previous patches: patches expected at 10 and 20 where the first
        // lands at 12 give the second an effective expectation of 22.
        let mut delta: isize = 0;
        let mut applied = vec![false; patches.len()];

        for (idx, patch) in patches.iter().enumerate() {
            let expected = patch.start2 as isize + delta;
            let text1 = text1_chars(&patch.diffs);

            let (start_loc, end_loc) = if text1.len() > max_bits {
                // split_max only leaves an oversized pattern behind for a
                // monster delete; anchor its head and tail separately.
                let head = self.match_inner(&text, &text1[..max_bits], expected.max(0) as usize)?;
                match head {
                    Some(head_loc) => {
                        let tail_expected = expected + (text1.len() - max_bits) as isize;
                        let tail = self.match_inner(
                            &text,
                            &text1[text1.len() - max_bits..],
                            tail_expected.max(0) as usize,
                        )?;
                        match tail {
                            Some(tail_loc) if head_loc < tail_loc => (Some(head_loc), Some(tail_loc)),
                            // No valid trailing context; drop this patch.
                            _ => (None, None),
                        }
                    }
                    None => (None, None),
                }
            } else {
                (self.match_inner(&text, &text1, expected.max(0) as usize)?, None)
            };

            let Some(start_loc) = start_loc else {
                // No match. Subtract this patch's delta so the rest stay
                // aligned.
                log::warn!("patch {idx} could not be placed, skipping it");
                delta -= patch.length2 as isize - patch.length1 as isize;
                continue;
            };

            applied[idx] = true;
            delta = start_loc as isize - expected;

            let text2: Vec<char> = match end_loc {
                Some(end_loc) => {
                    text[start_loc..(end_loc + max_bits).min(text.len())].to_vec()
                }
                None => text[start_loc..(start_loc + text1.len()).min(text.len())].to_vec(),
            };

            if text1 == text2 {
                // Perfect match: shove the replacement straight in.
                let replacement = text2_chars(&patch.diffs);
                text.splice(start_loc..start_loc + text1.len(), replacement);
                continue;
            }

            // Imperfect match. Diff what we expected against what is there
            // to get a frame of equivalent indices.
            let mut guide = self.diff_internal(&text1, &text2, false, deadline)?;
            if text1.len() > max_bits
                && levenshtein(&guide) as f32 / text1.len() as f32 > self.delete_threshold()
            {
                // The end points match but the content is unacceptably bad.
                applied[idx] = false;
                log::warn!("patch {idx} matched but its content drifted too far, rejecting");
                continue;
            }

            cleanup_semantic_lossless(&mut guide);
            let mut offset1 = 0;
            for diff in &patch.diffs {
                if diff.op() != Op::Equal {
                    let offset2 = x_index(&guide, offset1);
                    match diff.op() {
                        Op::Insert => {
                            let at = (start_loc + offset2).min(text.len());
                            text.splice(at..at, diff.chars().iter().copied());
                        }
                        Op::Delete => {
                            let to = (start_loc + x_index(&guide, offset1 + diff.len()))
                                .min(text.len());
                            let from = (start_loc + offset2).min(to);
                            text.drain(from..to);
                        }
                        Op::Equal => {}
                    }
                }
                if diff.op() != Op::Delete {
                    offset1 += diff.len();
                }
            }
        }

        // Strip the padding off.
        let patched = text[pad.len()..text.len() - pad.len()].to_vec();
        Ok((patched, applied))
    }

    /// Wrap every patch (and by contract the target text) in margin-sized
    /// padding of low code points, so edge-anchored patches have context to
    /// match against. Returns the padding string.
    fn add_padding(&self, patches: &mut Patches) -> Vec<char> {
        let margin = self.patch_margin() as usize;
        let pad: Vec<char> = (1..=self.patch_margin() as u32)
            .filter_map(char::from_u32)
            .collect();

        // Bump all the patches forward.
        for patch in patches.iter_mut() {
            patch.start1 += margin;
            patch.start2 += margin;
        }

        // Pad the leading edge of the first patch.
        if let Some(first) = patches.first_mut() {
            let needs_full = first.diffs.first().map_or(true, |d| d.op() != Op::Equal);
            if needs_full {
                first.diffs.insert(0, Diff::raw(Op::Equal, &pad));
                first.start1 -= margin;
                first.start2 -= margin;
                first.length1 += margin;
                first.length2 += margin;
            } else if let Some(d) = first.diffs.first_mut() {
                if margin > d.len() {
                    // Grow the first equality to cover the margin.
                    let extra = margin - d.len();
                    let mut grown: Vec<char> = pad[d.len()..].to_vec();
                    grown.extend_from_slice(d.chars());
                    d.text = grown;
                    first.start1 -= extra;
                    first.start2 -= extra;
                    first.length1 += extra;
                    first.length2 += extra;
                }
            }
        }

        // And the trailing edge of the last one.
        if let Some(last) = patches.last_mut() {
            let needs_full = last.diffs.last().map_or(true, |d| d.op() != Op::Equal);
            if needs_full {
                last.diffs.push(Diff::raw(Op::Equal, &pad));
                last.length1 += margin;
                last.length2 += margin;
            } else if let Some(d) = last.diffs.last_mut() {
                if margin > d.len() {
                    let extra = margin - d.len();
                    d.text.extend_from_slice(&pad[..extra]);
                    last.length1 += extra;
                    last.length2 += extra;
                }
            }
        }

        pad
    }

    /// Break up any patch whose span exceeds what the match engine can
    /// locate in one window. Meant to be called on the working copy inside
    /// [`Redline::patch_apply`].
    fn split_max(&self, patches: &mut Patches) {
        let max_bits = self.match_max_bits();
        let margin = self.patch_margin() as usize;

        let mut idx = 0;
        while idx < patches.len() {
            if patches[idx].length1 <= max_bits {
                idx += 1;
                continue;
            }

            log::debug!("splitting patch spanning {} characters", patches[idx].length1);
            let mut bigpatch = patches.remove(idx);
            let mut start1 = bigpatch.start1;
            let mut start2 = bigpatch.start2;

            let mut precontext: Vec<char> = Vec::new();
            let mut subpatches: Vec<Patch> = Vec::new();

            while !bigpatch.diffs.is_empty() {
                let mut patch = Patch {
                    start1: start1 - precontext.len(),
                    start2: start2 - precontext.len(),
                    ..Default::default()
                };
                let mut empty = true;

                if !precontext.is_empty() {
                    patch.length1 = precontext.len();
                    patch.length2 = precontext.len();
                    patch.diffs.push(Diff::raw(Op::Equal, &precontext));
                }

                while !bigpatch.diffs.is_empty() && patch.length1 < max_bits - margin {
                    let op = bigpatch.diffs[0].op();
                    if op == Op::Insert {
                        // Insertions are harmless.
                        patch.length2 += bigpatch.diffs[0].len();
                        start2 += bigpatch.diffs[0].len();
                        let d = bigpatch.diffs.remove(0);
                        patch.diffs.push(d);
                        empty = false;
                    } else if op == Op::Delete
                        && patch.diffs.len() == 1
                        && patch.diffs[0].op() == Op::Equal
                        && bigpatch.diffs[0].len() > 2 * max_bits
                    {
                        // A monster delete: let it pass in one chunk.
                        patch.length1 += bigpatch.diffs[0].len();
                        start1 += bigpatch.diffs[0].len();
                        let d = bigpatch.diffs.remove(0);
                        patch.diffs.push(d);
                        empty = false;
                    } else {
                        // Deletion or equality; take as much as fits.
                        let take = bigpatch.diffs[0]
                            .len()
                            .min(max_bits - patch.length1 - margin);
                        let run: Vec<char> = bigpatch.diffs[0].chars()[..take].to_vec();

                        patch.length1 += run.len();
                        start1 += run.len();
                        if op == Op::Equal {
                            patch.length2 += run.len();
                            start2 += run.len();
                        } else {
                            empty = false;
                        }

                        patch.diffs.push(Diff::raw(op, &run));
                        if run.len() == bigpatch.diffs[0].len() {
                            bigpatch.diffs.remove(0);
                        } else {
                            bigpatch.diffs[0].text.drain(..run.len());
                        }
                    }
                }

                // Head context for the next subpatch.
                precontext = text2_chars(&patch.diffs);
                if precontext.len() > margin {
                    precontext = precontext[precontext.len() - margin..].to_vec();
                }

                // Tail context for this one.
                let mut postcontext = text1_chars(&bigpatch.diffs);
                postcontext.truncate(margin);
                if !postcontext.is_empty() {
                    patch.length1 += postcontext.len();
                    patch.length2 += postcontext.len();
                    match patch.diffs.last_mut() {
                        Some(last) if last.op() == Op::Equal => {
                            last.text.extend_from_slice(&postcontext);
                        }
                        _ => patch.diffs.push(Diff::raw(Op::Equal, &postcontext)),
                    }
                }

                if !empty {
                    subpatches.push(patch);
                }
            }

            let added = subpatches.len();
            patches.splice(idx..idx, subpatches);
            idx += added;
        }
    }
}
