//! Benchmarks for complete patches rendered through `PolySynth`.
//!
//! Each patch is built with the runtime, a chord is played, and the render
//! loop is measured with every voice sounding.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::{
    dsp::{envelope::EnvelopeParams, oscillator::Waveform},
    graph::runtime::{PatchBuilder, PatchRuntime},
    io::midi::MidiEvent,
    EngineConfig,
};

use crate::BLOCK_SIZES;

fn builder(voices: usize) -> PatchBuilder {
    let config = EngineConfig::default().with_voice_count(voices);
    PatchRuntime::builder(config)
}

fn hold_chord(runtime: &mut PatchRuntime, keys: &[u8]) {
    for &key in keys {
        runtime.handle_midi(MidiEvent::NoteOn {
            channel: 1,
            key,
            velocity: 100,
        });
    }
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let chord: &[u8] = &[48, 55, 60, 64, 67, 71, 74, 79];

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === SIMPLE VOICE ===
        // saw → envelope, one note. Baseline cost of a voice.
        let (mut runtime, mut synth) = builder(8)
            .oscillator(Waveform::Saw)
            .envelope("amp", EnvelopeParams::adsr(10.0, 100.0, 0.6, 200.0))
            .build();
        hold_chord(&mut runtime, &chord[..1]);
        group.bench_with_input(BenchmarkId::new("single_voice", size), &size, |b, _| {
            b.iter(|| {
                synth.render_block(black_box(&mut buffer));
            })
        });

        // === CHORD ===
        // Eight voices through saw → envelope → tremolo
        let (mut runtime, mut synth) = builder(8)
            .oscillator(Waveform::Saw)
            .envelope("amp", EnvelopeParams::adsr(10.0, 100.0, 0.6, 200.0))
            .tremolo(Waveform::Sine, 5.0, 0.4)
            .build();
        hold_chord(&mut runtime, chord);
        group.bench_with_input(BenchmarkId::new("chord_8_voices", size), &size, |b, _| {
            b.iter(|| {
                synth.render_block(black_box(&mut buffer));
            })
        });

        // === FULL POOL ===
        // All 32 voices, two envelopes in series
        let keys: Vec<u8> = (36..68).collect();
        let (mut runtime, mut synth) = builder(32)
            .oscillator(Waveform::Triangle)
            .envelope("amp", EnvelopeParams::adsr(5.0, 50.0, 0.8, 100.0))
            .envelope("swell", EnvelopeParams::adsr(200.0, 1.0, 1.0, 100.0))
            .build();
        hold_chord(&mut runtime, &keys);
        group.bench_with_input(BenchmarkId::new("pool_32_voices", size), &size, |b, _| {
            b.iter(|| {
                synth.render_block(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
