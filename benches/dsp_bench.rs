//! Benchmarks for DSP primitives and real-world scenarios.
//!
//! Run with: cargo bench
//!
//! Render-domain code has to finish well inside the audio deadline; the
//! control-domain allocator has to keep up with dense MIDI.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Low-level primitives (curve, envelope engine, limiter, oscillator bank)
//!   - scenarios/*  Full patches and allocator churn

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    // Low-level DSP primitives
    dsp::bench_curve,
    dsp::bench_envelope,
    dsp::bench_limiter,
    dsp::bench_oscillator,
    // Real-world scenarios
    scenarios::bench_voices,
    scenarios::bench_allocator,
);
criterion_main!(benches);
