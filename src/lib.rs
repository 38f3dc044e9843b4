//! Diff, fuzzy match and resilient patching for plain text.
//!
//! `redline` bundles three cooperating engines:
//!
//! * a **diff** engine computing an edit script between two strings (Myers
//!   bisection plus semantic/efficiency cleanups and a line-mode speedup),
//! * a **match** engine locating a pattern inside a noisy text (Bitap,
//!   scored by a combined error/proximity metric),
//! * a **patch** engine producing context-bearing patches and applying them
//!   to targets that no longer match the original exactly.
//!
//! All operations are pure computations over in-memory strings. Texts are
//! handled as sequences of Unicode scalar values, so offsets and delta counts
//! are code-point counts, not byte offsets.
//!
//! ```
//! use redline::{PatchSource, Redline};
//!
//! # fn main() -> Result<(), redline::Error> {
//! let rl = Redline::new();
//! let patches = rl.patch_make(PatchSource::Texts(
//!     "The quick brown fox jumps over the lazy dog.",
//!     "That quick brown fox jumped over a lazy dog.",
//! ))?;
//! // The target has drifted, but the patches still find their places.
//! let (patched, ok) = rl.patch_apply(&patches, "The quick red rabbit jumps over the tired tiger.")?;
//! assert_eq!("That quick red rabbit jumped over a tired tiger.", patched);
//! assert_eq!(vec![true, true], ok);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde_repr::{Deserialize_repr, Serialize_repr};

pub mod diff;
mod errors;
pub mod fuzz;
pub mod html;
mod matching;
pub mod patch;

pub use diff::delta::{from_delta, to_delta};
pub use diff::{
    cleanup_merge, cleanup_semantic, cleanup_semantic_lossless, diff_text1, diff_text2,
    levenshtein, x_index,
};
pub use errors::Error;
pub use html::{diff_pretty_html, HtmlConfig};
pub use patch::{patch_from_text, patch_to_text, Patch, PatchSource, Patches};

/// The three operations an edit script is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(i8)]
pub enum Op {
    Delete = -1,
    Equal = 0,
    Insert = 1,
}

/// One record of an edit script: an operation and the text it applies to.
///
/// `(Delete, "Hello")` removes `Hello`, `(Insert, "Goodbye")` adds `Goodbye`,
/// `(Equal, "world")` keeps `world` as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub(crate) op: Op,
    pub(crate) text: Vec<char>,
}

impl Diff {
    pub fn new(op: Op, text: &str) -> Self {
        Self {
            op,
            text: text.chars().collect(),
        }
    }

    pub fn delete(text: &str) -> Self {
        Self::new(Op::Delete, text)
    }

    pub fn insert(text: &str) -> Self {
        Self::new(Op::Insert, text)
    }

    pub fn equal(text: &str) -> Self {
        Self::new(Op::Equal, text)
    }

    pub(crate) fn raw(op: Op, text: &[char]) -> Self {
        Self {
            op,
            text: text.to_vec(),
        }
    }

    pub fn op(&self) -> Op {
        self.op
    }

    /// The text this record covers.
    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub(crate) fn chars(&self) -> &[char] {
        &self.text
    }

    /// Length in code points.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {})", self.op, self.text())
    }
}

/// Tuning knobs shared by the diff, match and patch engines.
///
/// A `Redline` value is cheap to create and carries no other state; configure
/// one up front and reuse it. Tests that need different knobs build their own
/// value instead of mutating anything global.
#[derive(Debug, Clone)]
pub struct Redline {
    /// Run a line-level pre-pass on large inputs before the character diff.
    /// Faster, slightly less optimal. Defaults to `true`.
    checklines: bool,
    /// Wall-clock budget for the Myers bisection; `None` means unbounded.
    /// Defaults to one second.
    diff_timeout: Option<Duration>,
    /// Cost of an empty edit operation in terms of edit characters, used by
    /// the efficiency cleanup. Defaults to 4.
    diff_edit_cost: usize,
    /// Highest acceptable Bitap score (0.0 = perfection, 1.0 = very loose).
    /// Defaults to 0.5.
    match_threshold: f32,
    /// How far from the expected location a match may stray before its score
    /// reaches 1.0; 0 demands the exact location. Defaults to 1000.
    match_distance: usize,
    /// Bitap pattern-length ceiling. Patches longer than this are located by
    /// their head and tail windows.
    match_max_bits: usize,
    /// Context characters kept around each patch. Defaults to 4.
    patch_margin: u8,
    /// For oversized patches applied imperfectly, the highest tolerated
    /// Levenshtein/length ratio. Defaults to 0.5.
    patch_delete_threshold: f32,
}

impl Default for Redline {
    fn default() -> Self {
        Self {
            checklines: true,
            diff_timeout: Some(Duration::from_secs(1)),
            diff_edit_cost: 4,
            match_threshold: 0.5,
            match_distance: 1000,
            match_max_bits: 32,
            patch_margin: 4,
            patch_delete_threshold: 0.5,
        }
    }
}

impl Redline {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn checklines(&self) -> bool {
        self.checklines
    }

    /// Enable or disable the line-mode speedup for texts over ~100 lines.
    pub fn set_checklines(&mut self, checklines: bool) {
        self.checklines = checklines;
    }

    pub(crate) fn diff_timeout(&self) -> Option<Duration> {
        self.diff_timeout
    }

    /// Set the wall-clock budget for diff computation. `None` removes the
    /// bound entirely, which also makes the diff favor optimality over speed.
    pub fn set_diff_timeout(&mut self, timeout: Option<Duration>) {
        self.diff_timeout = timeout;
    }

    pub(crate) fn edit_cost(&self) -> usize {
        self.diff_edit_cost
    }

    /// Set the edit cost used by [`Redline::cleanup_efficiency`].
    pub fn set_edit_cost(&mut self, cost: usize) {
        self.diff_edit_cost = cost;
    }

    pub(crate) fn match_threshold(&self) -> f32 {
        self.match_threshold
    }

    /// Set the score above which [`Redline::match_main`] gives up.
    /// Closer to 0 demands accuracy; closer to 1 accepts looser matches.
    pub fn set_match_threshold(&mut self, threshold: f32) {
        self.match_threshold = threshold;
    }

    pub(crate) fn match_distance(&self) -> usize {
        self.match_distance
    }

    /// Set the location sensitivity of match scoring. A match this many
    /// characters from the expected location adds 1.0 to its score; 0 means
    /// only the exact location is acceptable.
    pub fn set_match_distance(&mut self, distance: usize) {
        self.match_distance = distance;
    }

    pub(crate) fn match_max_bits(&self) -> usize {
        self.match_max_bits
    }

    pub(crate) fn patch_margin(&self) -> u8 {
        self.patch_margin
    }

    /// Set the number of context characters kept around each patch.
    pub fn set_patch_margin(&mut self, margin: u8) {
        self.patch_margin = margin;
    }

    pub(crate) fn delete_threshold(&self) -> f32 {
        self.patch_delete_threshold
    }

    /// Set how closely the text inside a large delete has to match the
    /// expected text when a patch applies imperfectly (0.0 strict, 1.0 loose).
    pub fn set_delete_threshold(&mut self, threshold: f32) {
        self.patch_delete_threshold = threshold;
    }

    /// The moment the current diff computation has to give up, if any.
    pub(crate) fn deadline(&self) -> Option<DateTime<Utc>> {
        let timeout = self.diff_timeout?;
        let delta = TimeDelta::from_std(timeout).ok()?;
        Utc::now().checked_add_signed(delta)
    }
}
