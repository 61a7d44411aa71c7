//! Benchmarks for the output limiter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::dsp::limiter::{Limiter, LimiterParams};

use crate::BLOCK_SIZES;

pub fn bench_limiter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/limiter");
    let cases = [
        ("mono", 1, LimiterParams::default()),
        ("stereo_linked", 2, LimiterParams::default()),
        ("stereo_unlinked", 2, LimiterParams::default().with_stereo_link(false)),
    ];

    for &size in BLOCK_SIZES {
        for (name, channels, params) in cases {
            // Hot enough that the gain is always moving.
            let source: Vec<f32> = (0..size * channels)
                .map(|i| 1.5 * (i as f32 * 0.031).sin())
                .collect();
            let mut buffer = source.clone();
            let mut limiter = Limiter::new(48_000.0, params);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&source);
                    limiter.process_interleaved(black_box(&mut buffer), channels);
                })
            });
        }
    }

    group.finish();
}
