#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    let (old, new) = data;
    let _ = redline::fuzz::roundtrip(old, new);
});
