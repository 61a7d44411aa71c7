//! Benchmarks for the per-voice oscillator bank.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::dsp::oscillator::{OscillatorBank, Waveform};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let waveforms = [
        ("sine", Waveform::Sine),       // sin() per sample
        ("sawtooth", Waveform::Saw),    // linear ramp
        ("square", Waveform::Square),   // branch per sample
        ("triangle", Waveform::Triangle),
    ];

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, waveform) in waveforms {
            let mut bank = OscillatorBank::new(waveform, 48_000.0, 261.625_56);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for sample in buffer.iter_mut() {
                        *sample = bank.next_sample(0, black_box(0.75));
                    }
                })
            });
        }

        // Eight voices at different pitches, as a chord would be rendered.
        let mut bank = OscillatorBank::new(Waveform::Saw, 48_000.0, 261.625_56);
        group.bench_with_input(BenchmarkId::new("saw_8_voices", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    let mut mix = 0.0;
                    for voice in 0..8 {
                        mix += bank.next_sample(voice, black_box(voice as f32 / 12.0));
                    }
                    *sample = mix;
                }
            })
        });
    }

    group.finish();
}
