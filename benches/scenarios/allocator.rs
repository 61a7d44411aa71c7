//! Benchmarks for control-domain voice allocation under MIDI churn.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::{
    dsp::{envelope::EnvelopeParams, oscillator::Waveform},
    graph::{events::NullSink, node::GraphId, runtime::PatchRuntime, PortAddress},
    io::midi::MidiEvent,
    synth::VoiceAllocator,
    EngineConfig,
};

pub fn bench_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/allocator");

    for voices in [8usize, 32] {
        // Bare allocator: every allocation past the pool size steals.
        let mut allocator =
            VoiceAllocator::new(voices, PortAddress::new(GraphId(0), "voices", "gate"), NullSink);
        group.bench_with_input(BenchmarkId::new("steal_cycle", voices), &voices, |b, &n| {
            b.iter(|| {
                for _ in 0..n * 2 {
                    let voice = allocator.allocate();
                    black_box(voice);
                }
            })
        });

        // Runtime: note on/off through the translator, envelope holds and routing.
        let config = EngineConfig::default().with_voice_count(voices);
        let (mut runtime, mut synth) = PatchRuntime::builder(config)
            .oscillator(Waveform::Saw)
            .envelope("amp", EnvelopeParams::adsr(5.0, 50.0, 0.7, 100.0))
            .build();
        // The render side drains the envelope queue so holds keep succeeding.
        let mut block = [0.0f32; 64];
        group.bench_with_input(BenchmarkId::new("midi_churn", voices), &voices, |b, _| {
            b.iter(|| {
                for key in 40..72u8 {
                    runtime.handle_midi(MidiEvent::NoteOn {
                        channel: 1,
                        key,
                        velocity: 100,
                    });
                    runtime.handle_midi(MidiEvent::NoteOff {
                        channel: 1,
                        key,
                        velocity: None,
                    });
                }
                synth.render_block(&mut block);
                runtime.poll();
                black_box(runtime.snapshot().busy_count())
            })
        });
    }

    group.finish();
}
