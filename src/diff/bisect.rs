//! Myers' O(ND) bisection over two character sequences.

use chrono::{DateTime, Utc};

use crate::{Diff, Error, Op, Redline};

impl Redline {
    /// Find the middle snake, split the problem in two and diff both halves.
    /// See Myers 1986: An O(ND) Difference Algorithm and Its Variations.
    ///
    /// When the deadline fires the whole remainder is returned as one
    /// delete/insert pair; valid, just not minimal.
    pub(crate) fn bisect(
        &self,
        old: &[char],
        new: &[char],
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Vec<Diff>, Error> {
        let old_len = old.len() as isize;
        let new_len = new.len() as isize;

        let max_d = (old_len + new_len + 1) / 2;
        let v_offset = max_d;
        let v_len = (2 * max_d) as usize;

        let mut v1 = vec![-1_isize; v_len];
        let mut v2 = vec![-1_isize; v_len];
        v1[v_offset as usize + 1] = 0;
        v2[v_offset as usize + 1] = 0;

        let delta = old_len - new_len;
        // When the total length is odd the forward path collides with the
        // reverse one; when even, the reverse path does the colliding.
        let front = delta % 2 != 0;

        // Trim the k-range whenever a path runs off the edge of the grid.
        let mut k1start: isize = 0;
        let mut k1end: isize = 0;
        let mut k2start: isize = 0;
        let mut k2end: isize = 0;

        for d in 0..max_d {
            if let Some(deadline) = deadline {
                if Utc::now() > deadline {
                    log::trace!("bisect deadline hit at depth {d}, returning coarse diff");
                    break;
                }
            }

            // Walk the front path one step.
            let mut k1 = -d + k1start;
            while k1 <= d - k1end {
                let k1_offset = (v_offset + k1) as usize;
                let mut x1 = if k1 == -d || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1]) {
                    v1[k1_offset + 1]
                } else {
                    v1[k1_offset - 1] + 1
                };
                let mut y1 = x1 - k1;
                while x1 < old_len
                    && y1 < new_len
                    && old[x1 as usize] == new[y1 as usize]
                {
                    x1 += 1;
                    y1 += 1;
                }
                v1[k1_offset] = x1;

                if x1 > old_len {
                    // Ran off the right of the graph.
                    k1end += 2;
                } else if y1 > new_len {
                    // Ran off the bottom of the graph.
                    k1start += 2;
                } else if front {
                    let k2_offset = v_offset + delta - k1;
                    if k2_offset >= 0 && (k2_offset as usize) < v_len && v2[k2_offset as usize] != -1
                    {
                        // Mirror x2 onto the top-left coordinate system.
                        let x2 = old_len - v2[k2_offset as usize];
                        if x1 >= x2 {
                            return self.bisect_split(old, new, x1 as usize, y1 as usize, deadline);
                        }
                    }
                }
                k1 += 2;
            }

            // Walk the reverse path one step.
            let mut k2 = -d + k2start;
            while k2 <= d - k2end {
                let k2_offset = (v_offset + k2) as usize;
                let mut x2 = if k2 == -d || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1]) {
                    v2[k2_offset + 1]
                } else {
                    v2[k2_offset - 1] + 1
                };
                let mut y2 = x2 - k2;
                while x2 < old_len
                    && y2 < new_len
                    && old[(old_len - x2 - 1) as usize] == new[(new_len - y2 - 1) as usize]
                {
                    x2 += 1;
                    y2 += 1;
                }
                v2[k2_offset] = x2;

                if x2 > old_len {
                    // Ran off the left of the graph.
                    k2end += 2;
                } else if y2 > new_len {
                    // Ran off the top of the graph.
                    k2start += 2;
                } else if !front {
                    let k1_offset = v_offset + delta - k2;
                    if k1_offset >= 0 && (k1_offset as usize) < v_len && v1[k1_offset as usize] != -1
                    {
                        let x1 = v1[k1_offset as usize];
                        let y1 = v_offset + x1 - k1_offset;
                        // Mirror x2 onto the top-left coordinate system.
                        let x2 = old_len - x2;
                        if x1 >= x2 {
                            return self.bisect_split(old, new, x1 as usize, y1 as usize, deadline);
                        }
                    }
                }
                k2 += 2;
            }
        }

        // Ran out of depth or time: no commonality at all.
        Ok(vec![Diff::raw(Op::Delete, old), Diff::raw(Op::Insert, new)])
    }

    fn bisect_split(
        &self,
        old: &[char],
        new: &[char],
        x: usize,
        y: usize,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Vec<Diff>, Error> {
        let mut diffs = self.diff_internal(&old[..x], &new[..y], false, deadline)?;
        diffs.extend(self.diff_internal(&old[x..], &new[y..], false, deadline)?);
        Ok(diffs)
    }
}
