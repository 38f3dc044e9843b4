use criterion::{black_box, criterion_group, criterion_main, Criterion};

use redline::{PatchSource, Redline};

fn prose(seed: u32, paragraphs: usize) -> String {
    // Deterministic filler with enough structure for the line mode to bite.
    let words = [
        "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india",
        "juliett", "kilo", "lima",
    ];
    let mut state = seed;
    let mut out = String::new();
    for _ in 0..paragraphs {
        for _ in 0..12 {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            out.push_str(words[(state >> 16) as usize % words.len()]);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

fn bench_diff(c: &mut Criterion) {
    let old = prose(1, 120);
    let new = prose(2, 120);

    c.bench_function("diff_main/linemode", |b| {
        let rl = Redline::new();
        b.iter(|| rl.diff_main(black_box(&old), black_box(&new)).unwrap())
    });

    c.bench_function("diff_main/charmode", |b| {
        let mut rl = Redline::new();
        rl.set_checklines(false);
        b.iter(|| rl.diff_main(black_box(&old), black_box(&new)).unwrap())
    });
}

fn bench_patch(c: &mut Criterion) {
    let old = prose(1, 40);
    let new = prose(2, 40);
    let rl = Redline::new();
    let patches = rl.patch_make(PatchSource::Texts(&old, &new)).unwrap();

    c.bench_function("patch_apply", |b| {
        b.iter(|| rl.patch_apply(black_box(&patches), black_box(&old)).unwrap())
    });
}

criterion_group!(benches, bench_diff, bench_patch);
criterion_main!(benches);
