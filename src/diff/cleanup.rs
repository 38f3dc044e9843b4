//! Normalization passes over edit scripts.

use crate::diff::common::{common_overlap, common_prefix, common_suffix};
use crate::{Diff, Op, Redline};

/// Reorder and merge like edit sections; merge equalities.
///
/// Any edit section can move as long as it doesn't cross an equality. The
/// result is canonical: no adjacent records share an op, no equality is
/// empty, and no delete/insert pair shares a common prefix or suffix.
pub fn cleanup_merge(diffs: &mut Vec<Diff>) {
    if diffs.is_empty() {
        return;
    }

    // A trailing empty equality flushes the final run of edits.
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
                pointer += 1;
            }
            Op::Delete => {
                del_count += 1;
                del_text.extend_from_slice(diffs[pointer].chars());
                pointer += 1;
            }
            Op::Equal => {
                if del_count + ins_count > 1 {
                    if del_count != 0 && ins_count != 0 {
                        // Factor out a common prefix onto the preceding
                        // equality, creating one if the run starts the list.
                        let common = common_prefix(&ins_text, &del_text);
                        if common != 0 {
                            let at = pointer - del_count - ins_count;
                            if at > 0 && diffs[at - 1].op() == Op::Equal {
                                let head: Vec<char> = ins_text[..common].to_vec();
                                diffs[at - 1].text.extend(head);
                            } else {
                                diffs.insert(0, Diff::raw(Op::Equal, &ins_text[..common]));
                                pointer += 1;
                            }
                            ins_text.drain(..common);
                            del_text.drain(..common);
                        }

                        // And a common suffix onto the following equality.
                        let common = common_suffix(&ins_text, &del_text);
                        if common != 0 {
                            let mut tail: Vec<char> = ins_text[ins_text.len() - common..].to_vec();
                            tail.extend_from_slice(diffs[pointer].chars());
                            diffs[pointer].text = tail;
                            ins_text.truncate(ins_text.len() - common);
                            del_text.truncate(del_text.len() - common);
                        }
                    }

                    // Replace the run with the merged records.
                    let at = pointer - del_count - ins_count;
                    let mut merged = Vec::with_capacity(2);
                    if !del_text.is_empty() {
                        merged.push(Diff::raw(Op::Delete, &del_text));
                    }
                    if !ins_text.is_empty() {
                        merged.push(Diff::raw(Op::Insert, &ins_text));
                    }
                    let merged_len = merged.len();
                    diffs.splice(at..pointer, merged);
                    pointer = at + merged_len + 1;
                } else if pointer != 0 && diffs[pointer - 1].op() == Op::Equal {
                    // Merge this equality into the previous one.
                    let tail = diffs.remove(pointer);
                    diffs[pointer - 1].text.extend(tail.text);
                } else {
                    pointer += 1;
                }

                del_count = 0;
                ins_count = 0;
                del_text.clear();
                ins_text.clear();
            }
        }
    }

    if diffs.last().is_some_and(|d| d.is_empty()) {
        diffs.pop();
    }

    // Second pass: a single edit surrounded by equalities can sometimes be
    // shifted sideways to eliminate one of them,
    // e.g. A<ins>BA</ins>C -> <ins>AB</ins>AC.
    let mut changes = false;
    let mut pointer = 1;
    while pointer + 1 < diffs.len() {
        if diffs[pointer - 1].op() == Op::Equal && diffs[pointer + 1].op() == Op::Equal {
            let prev = diffs[pointer - 1].text.clone();
            let next = diffs[pointer + 1].text.clone();
            let edit = diffs[pointer].text.clone();

            if edit.ends_with(&prev) {
                // Shift the edit over the previous equality.
                let mut shifted = prev.clone();
                shifted.extend_from_slice(&edit[..edit.len() - prev.len()]);
                diffs[pointer].text = shifted;

                let mut grown = prev;
                grown.extend_from_slice(&next);
                diffs[pointer + 1].text = grown;

                diffs.remove(pointer - 1);
                changes = true;
            } else if edit.starts_with(&next) {
                // Shift the edit over the next equality.
                diffs[pointer - 1].text.extend_from_slice(&next);

                let mut shifted: Vec<char> = edit[next.len()..].to_vec();
                shifted.extend_from_slice(&next);
                diffs[pointer].text = shifted;

                diffs.remove(pointer + 1);
                changes = true;
            }
        }
        pointer += 1;
    }

    // A shift can uncover further merges.
    if changes {
        cleanup_merge(diffs);
    }
}

/// Reduce the number of edits by eliminating semantically trivial
/// equalities, then align the remaining edits on logical boundaries and
/// factor out overlaps between adjacent delete/insert pairs.
pub fn cleanup_semantic(diffs: &mut Vec<Diff>) {
    let mut changes = false;
    // Positions of equalities seen so far on this scan.
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;

    // Edit mass before and after the equality on top of the stack.
    let mut ins_before = 0;
    let mut del_before = 0;
    let mut ins_after = 0;
    let mut del_after = 0;

    let mut pointer = 0;
    while pointer < diffs.len() {
        if diffs[pointer].op() == Op::Equal {
            equalities.push(pointer);
            ins_before = ins_after;
            del_before = del_after;
            ins_after = 0;
            del_after = 0;
            last_equality = Some(diffs[pointer].text.clone());
            pointer += 1;
            continue;
        }

        if diffs[pointer].op() == Op::Insert {
            ins_after += diffs[pointer].len();
        } else {
            del_after += diffs[pointer].len();
        }

        // An equality no longer than the edits on both sides of it carries
        // no information; turn it into a delete+insert pair.
        let eliminate = last_equality.as_ref().is_some_and(|eq| {
            eq.len() <= ins_before.max(del_before) && eq.len() <= ins_after.max(del_after)
        });
        if eliminate {
            if let (Some(eq), Some(&at)) = (last_equality.take(), equalities.last()) {
                diffs.insert(at, Diff::raw(Op::Delete, &eq));
                diffs[at + 1].op = Op::Insert;

                equalities.pop();
                // The previous equality needs re-evaluation too.
                equalities.pop();

                ins_before = 0;
                del_before = 0;
                ins_after = 0;
                del_after = 0;
                changes = true;

                pointer = match equalities.last() {
                    Some(&prev) => prev + 1,
                    None => 0,
                };
                continue;
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(diffs);
    }
    cleanup_semantic_lossless(diffs);

    // Factor overlaps between adjacent deletions and insertions,
    // e.g. <del>abcxxx</del><ins>xxxdef</ins> -> <del>abc</del>xxx<ins>def</ins>
    //      <del>xxxabc</del><ins>defxxx</ins> -> <ins>def</ins>xxx<del>abc</del>
    // Only worth it when the overlap is as big as the edit ahead or behind it.
    let mut pointer = 1;
    while pointer < diffs.len() {
        if diffs[pointer - 1].op() == Op::Delete && diffs[pointer].op() == Op::Insert {
            let deletion = diffs[pointer - 1].text.clone();
            let insertion = diffs[pointer].text.clone();
            let overlap1 = common_overlap(&deletion, &insertion);
            let overlap2 = common_overlap(&insertion, &deletion);
            let del_half = deletion.len().div_ceil(2);
            let ins_half = insertion.len().div_ceil(2);

            if overlap1 >= overlap2 {
                if overlap1 >= del_half || overlap1 >= ins_half {
                    diffs.insert(pointer, Diff::raw(Op::Equal, &insertion[..overlap1]));
                    diffs[pointer - 1].text = deletion[..deletion.len() - overlap1].to_vec();
                    diffs[pointer + 1].text = insertion[overlap1..].to_vec();
                    pointer += 1;
                }
            } else if overlap2 >= del_half || overlap2 >= ins_half {
                // Reverse overlap: swap the trimmed edits around the equality.
                diffs.insert(pointer, Diff::raw(Op::Equal, &deletion[..overlap2]));
                diffs[pointer - 1] = Diff::raw(Op::Insert, &insertion[..insertion.len() - overlap2]);
                diffs[pointer + 1] = Diff::raw(Op::Delete, &deletion[overlap2..]);
                pointer += 1;
            }
            pointer += 1;
        }
        pointer += 1;
    }
}

/// Shift edit boundaries sideways inside an equality/edit/equality triplet to
/// land them on logical boundaries, without changing what is deleted or
/// inserted.
///
/// e.g. The c<ins>at c</ins>ame. -> The <ins>cat </ins>came.
pub fn cleanup_semantic_lossless(diffs: &mut Vec<Diff>) {
    let mut pointer = 1;
    // The first and last records have nothing to trade with.
    while pointer + 1 < diffs.len() {
        if diffs[pointer - 1].op() == Op::Equal && diffs[pointer + 1].op() == Op::Equal {
            let mut equality1 = diffs[pointer - 1].text.clone();
            let mut edit = diffs[pointer].text.clone();
            let mut equality2 = diffs[pointer + 1].text.clone();

            // First shift the edit as far left as it will go.
            let common = common_suffix(&equality1, &edit);
            if common > 0 {
                let tail: Vec<char> = edit[edit.len() - common..].to_vec();
                equality1.truncate(equality1.len() - common);

                let mut rotated = tail.clone();
                rotated.extend_from_slice(&edit[..edit.len() - common]);
                edit = rotated;

                let mut grown = tail;
                grown.extend_from_slice(&equality2);
                equality2 = grown;
            }

            // Then step right one character at a time, keeping the best
            // scoring position. The >= favors trailing over leading
            // whitespace on the edit.
            let mut best_equality1 = equality1.clone();
            let mut best_edit = edit.clone();
            let mut best_equality2 = equality2.clone();
            let mut best_score =
                boundary_score(&equality1, &edit) + boundary_score(&edit, &equality2);

            while !edit.is_empty() && !equality2.is_empty() && edit[0] == equality2[0] {
                let step = edit[0];
                equality1.push(step);
                edit.remove(0);
                edit.push(equality2[0]);
                equality2.remove(0);

                let score = boundary_score(&equality1, &edit) + boundary_score(&edit, &equality2);
                if score >= best_score {
                    best_score = score;
                    best_equality1.clone_from(&equality1);
                    best_edit.clone_from(&edit);
                    best_equality2.clone_from(&equality2);
                }
            }

            if diffs[pointer - 1].text != best_equality1 {
                // An improvement was found; write it back.
                if !best_equality1.is_empty() {
                    diffs[pointer - 1].text = best_equality1;
                } else {
                    diffs.remove(pointer - 1);
                    pointer -= 1;
                }
                diffs[pointer].text = best_edit;
                if !best_equality2.is_empty() {
                    diffs[pointer + 1].text = best_equality2;
                } else {
                    diffs.remove(pointer + 1);
                    pointer = pointer.saturating_sub(1);
                }
            }
        }
        pointer += 1;
    }
}

/// Score the seam between two strings, 6 (best) to 0 (worst).
///
/// 6 edges, 5 blank lines, 4 line breaks, 3 ends of sentences, 2 whitespace,
/// 1 non-alphanumeric, 0 the middle of a word.
fn boundary_score(one: &[char], two: &[char]) -> u8 {
    let (Some(&char1), Some(&char2)) = (one.last(), two.first()) else {
        return 6;
    };

    let whitespace1 = char1.is_whitespace();
    let whitespace2 = char2.is_whitespace();
    let linebreak1 = whitespace1 && (char1 == '\n' || char1 == '\r');
    let linebreak2 = whitespace2 && (char2 == '\n' || char2 == '\r');
    let blankline1 = linebreak1 && ends_with_blank_line(one);
    let blankline2 = linebreak2 && starts_with_blank_line(two);

    if blankline1 || blankline2 {
        5
    } else if linebreak1 || linebreak2 {
        4
    } else if !char1.is_alphanumeric() && !whitespace1 && whitespace2 {
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if !char1.is_alphanumeric() || !char2.is_alphanumeric() {
        1
    } else {
        0
    }
}

fn ends_with_blank_line(text: &[char]) -> bool {
    text.ends_with(&['\n', '\n']) || text.ends_with(&['\n', '\r', '\n'])
}

fn starts_with_blank_line(text: &[char]) -> bool {
    text.starts_with(&['\n', '\n'])
        || text.starts_with(&['\n', '\r', '\n'])
        || text.starts_with(&['\r', '\n', '\n'])
        || text.starts_with(&['\r', '\n', '\r', '\n'])
}

impl Redline {
    /// Reduce the number of edits by eliminating operationally trivial
    /// equalities: runs of small edits cost more to process, store or
    /// transmit than one larger edit, so an equality shorter than the
    /// configured edit cost that sits between edits gets folded into them.
    pub fn cleanup_efficiency(&self, diffs: &mut Vec<Diff>) {
        if diffs.is_empty() {
            return;
        }
        let edit_cost = self.edit_cost();

        let mut changes = false;
        let mut equalities: Vec<usize> = Vec::new();
        let mut last_equality: Option<Vec<char>> = None;

        // Edits adjacent to the candidate equality, before and after.
        let mut pre_ins = false;
        let mut pre_del = false;
        let mut post_ins = false;
        let mut post_del = false;

        let mut pointer = 0;
        while pointer < diffs.len() {
            if diffs[pointer].op() == Op::Equal {
                if diffs[pointer].len() < edit_cost && (post_ins || post_del) {
                    // Candidate found.
                    equalities.push(pointer);
                    pre_ins = post_ins;
                    pre_del = post_del;
                    last_equality = Some(diffs[pointer].text.clone());
                } else {
                    // Not a candidate, and can never become one.
                    equalities.clear();
                    last_equality = None;
                }
                post_ins = false;
                post_del = false;
                pointer += 1;
                continue;
            }

            if diffs[pointer].op() == Op::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            // An equality with edits on all four sides is always worth
            // folding; with edits on exactly three it has to be shorter
            // than half the edit cost.
            let flags = pre_ins as u8 + pre_del as u8 + post_ins as u8 + post_del as u8;
            let eliminate = last_equality.as_ref().is_some_and(|eq| {
                (pre_ins && pre_del && post_ins && post_del)
                    || (eq.len() * 2 < edit_cost && flags == 3)
            });
            if eliminate {
                if let (Some(eq), Some(at)) = (last_equality.take(), equalities.pop()) {
                    diffs[at].op = Op::Insert;
                    diffs.insert(at, Diff::raw(Op::Delete, &eq));
                    changes = true;

                    if pre_ins && pre_del {
                        // No change affects earlier entries; keep going.
                        post_ins = true;
                        post_del = true;
                        equalities.clear();
                    } else {
                        equalities.pop();
                        pointer = match equalities.last() {
                            Some(&prev) => prev + 1,
                            None => 0,
                        };
                        post_ins = false;
                        post_del = false;
                        continue;
                    }
                }
            }
            pointer += 1;
        }

        if changes {
            cleanup_merge(diffs);
        }
    }
}
