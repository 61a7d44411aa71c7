//! Benchmarks for the multi-phase envelope engine.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rtrb::RingBuffer;
use saavy_modular::{
    dsp::envelope::{EnvelopeEngine, EnvelopeParams, EnvelopePhase},
    synth::message::EnvelopeNotification,
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    // Nothing reads completions here; once the queue fills they wait undelivered.
    let (mut notify, _notifications) = RingBuffer::<EnvelopeNotification>::new(64);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (shaped ramp, curve evaluated every sample)
        let mut env = EnvelopeEngine::new(SAMPLE_RATE, EnvelopeParams::adsr(10_000.0, 100.0, 0.7, 300.0));
        env.gate_on(0, 1);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.render(0, black_box(&mut buffer), &mut notify);
            })
        });

        // Sustain phase (holding, no curve math)
        let mut env = EnvelopeEngine::new(SAMPLE_RATE, EnvelopeParams::adsr(1.0, 1.0, 0.7, 300.0));
        env.gate_on(0, 1);
        let mut warmup = vec![0.0f32; 200];
        env.render(0, &mut warmup, &mut notify);
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                env.render(0, black_box(&mut buffer), &mut notify);
            })
        });

        // Sixteen-phase envelope with all voices looping through phases
        let phases: Vec<EnvelopePhase> = (0..16)
            .map(|i| EnvelopePhase::new((i % 2) as f32, 2.0, if i % 2 == 0 { 0.8 } else { -0.8 }))
            .collect();
        let mut env = EnvelopeEngine::new(SAMPLE_RATE, EnvelopeParams::new(&phases, true));
        for voice in 0..32 {
            env.gate_on(voice, 1);
        }
        group.bench_with_input(BenchmarkId::new("32_voices_16_phases", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    let mut mix = 0.0;
                    for voice in 0..32 {
                        mix += env.process(voice, &mut notify);
                    }
                    env.advance();
                    *sample = mix;
                }
            })
        });
    }

    group.finish();
}
