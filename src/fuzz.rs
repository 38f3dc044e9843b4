//! Round-trip oracle used by the fuzz target: any pair of texts must
//! survive diff, patch construction and application unchanged.

use crate::{Error, PatchSource, Redline};

pub fn roundtrip(old: &str, new: &str) -> Result<(), Error> {
    let rl = Redline::new();

    let diffs = rl.diff_main(old, new)?;
    let patches = rl.patch_make(PatchSource::Diffs(&diffs))?;
    let (patched, _) = rl.patch_apply(&patches, old)?;
    assert_eq!(new, patched);

    Ok(())
}
