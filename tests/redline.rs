use std::time::Duration;

use redline::{
    diff_text1, diff_text2, from_delta, patch_from_text, patch_to_text, to_delta, Diff, Error,
    PatchSource, Redline,
};

#[test]
fn test_simple_insertion() {
    let mut rl = Redline::new();
    rl.set_checklines(false);
    let diffs = rl.diff_main("abc", "ab123c").unwrap();
    assert_eq!(
        vec![Diff::equal("ab"), Diff::insert("123"), Diff::equal("c")],
        diffs
    );
}

#[test]
fn test_delta_flow() {
    let rl = Redline::new();
    let old = "The old house and the new dog!";
    let new = "The old man and the new dog!";

    let diffs = rl.diff_main(old, new).unwrap();
    let delta = to_delta(&diffs);
    assert_eq!("=8\t-5\t+man\t=17", delta);

    // The delta and the source text are enough to rebuild the diff,
    // and from there the patched text.
    let restored = from_delta(old, &delta).unwrap();
    assert_eq!(diffs, restored);

    let patches = rl
        .patch_make(PatchSource::TextDiffs(old, &restored))
        .unwrap();
    let (patched, _) = rl.patch_apply(&patches, old).unwrap();
    assert_eq!(new, patched);
}

#[test]
fn test_patch_wire_flow() {
    // The canonical path: diff on one side, serialize, ship, parse and
    // apply on the other side against a drifted target.
    let rl = Redline::new();
    let patches = rl
        .patch_make(PatchSource::Texts(
            "The quick brown fox jumps over the lazy dog.",
            "That quick brown fox jumped over a lazy dog.",
        ))
        .unwrap();

    let wire = patch_to_text(&patches);
    let received = patch_from_text(&wire).unwrap();
    assert_eq!(patches, received);

    let (patched, applied) = rl
        .patch_apply(&received, "The quick red rabbit jumps over the tired tiger.")
        .unwrap();
    assert_eq!("That quick red rabbit jumped over a tired tiger.", patched);
    assert_eq!(vec![true, true], applied);
}

#[test]
fn test_unicode_flow() {
    let rl = Redline::new();
    let old = "Üben! Das Meer ist blau 🤪 und weit.";
    let new = "Üben! Das Meer ist grün 🤔 und weit.";

    let diffs = rl.diff_main(old, new).unwrap();
    assert_eq!(old, diff_text1(&diffs));
    assert_eq!(new, diff_text2(&diffs));

    // Delta counts are code points, so the round trip must hold for
    // text far outside ASCII.
    let delta = to_delta(&diffs);
    assert_eq!(diffs, from_delta(old, &delta).unwrap());

    let patches = rl.patch_make(PatchSource::Diffs(&diffs)).unwrap();
    let (patched, _) = rl.patch_apply(&patches, old).unwrap();
    assert_eq!(new, patched);
}

#[test]
fn test_expired_deadline_still_valid() {
    let mut rl = Redline::new();
    rl.set_diff_timeout(Some(Duration::ZERO));

    // Inputs engineered to reach the bisection: no common affixes, no
    // containment, nothing for the half-match to latch onto.
    let old: String = (0..600)
        .map(|i| char::from_u32('a' as u32 + (i * 7 % 17)).unwrap())
        .collect();
    let new: String = (0..600)
        .map(|i| char::from_u32('a' as u32 + (i * 11 % 19 + 1)).unwrap())
        .collect();

    // An instantly-expired deadline yields a coarse but valid diff.
    let diffs = rl.diff_main(&old, &new).unwrap();
    assert_eq!(old, diff_text1(&diffs));
    assert_eq!(new, diff_text2(&diffs));
}

#[test]
fn test_error_surfaces() {
    assert!(matches!(
        patch_from_text("this is not a patch"),
        Err(Error::MalformedPatch(_))
    ));
    assert!(matches!(
        from_delta("abc", "?3"),
        Err(Error::MalformedDelta(_))
    ));
    assert_eq!(Err(Error::DeltaSourceMismatch), from_delta("abcd", "=3"));
}

#[test]
fn test_applied_flags_report_failures() {
    let rl = Redline::new();
    let patches = rl
        .patch_make(PatchSource::Texts(
            "The quick brown fox jumps over the lazy dog.",
            "That quick brown fox jumped over a lazy dog.",
        ))
        .unwrap();

    // A target unrelated to the source leaves both patches unplaced and
    // the text untouched.
    let target = "I am the very model of a modern major general.";
    let (patched, applied) = rl.patch_apply(&patches, target).unwrap();
    assert_eq!(target, patched);
    assert_eq!(vec![false, false], applied);
}
