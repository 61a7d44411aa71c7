//! Benchmarks for shaped phase curves.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::dsp::curve::{inv_t_from_u, shaped_t};

use crate::BLOCK_SIZES;

pub fn bench_curve(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/curve");

    for &size in BLOCK_SIZES {
        let step = 1.0 / size as f32;

        // Linear shortcut
        group.bench_with_input(BenchmarkId::new("linear", size), &size, |b, &n| {
            b.iter(|| (0..n).map(|i| shaped_t(i as f32 * step, black_box(0.0))).sum::<f32>())
        });

        // exp_m1 per call
        group.bench_with_input(BenchmarkId::new("shaped", size), &size, |b, &n| {
            b.iter(|| (0..n).map(|i| shaped_t(i as f32 * step, black_box(0.6))).sum::<f32>())
        });

        // ln_1p per call
        group.bench_with_input(BenchmarkId::new("inverse", size), &size, |b, &n| {
            b.iter(|| (0..n).map(|i| inv_t_from_u(i as f32 * step, black_box(-0.6))).sum::<f32>())
        });
    }

    group.finish();
}
