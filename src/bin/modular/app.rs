//! Modular - wires the patch runtime to an audio device and the terminal UI

use std::time::{Duration, Instant};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;

use saavy_modular::{
    dsp::{envelope::EnvelopeParams, limiter::LimiterParams, oscillator::Waveform},
    graph::runtime::PatchRuntime,
    synth::allocator::AllocationState,
    EngineConfig, MAX_BLOCK_SIZE, MAX_VOICES,
};

use super::score::Score;
use super::ui::{self, View};

/// UI refresh / control tick.
const FRAME: Duration = Duration::from_millis(16);

pub struct Modular {
    config: EngineConfig,
    score: Score,
}

impl Modular {
    pub fn new(config: EngineConfig, score: Score) -> Self {
        Self { config, score }
    }

    /// Open the default output device, start the stream and run the UI until quit.
    pub fn run(mut self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let stream_config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = stream_config.sample_rate().0 as f32;
        let channels = stream_config.channels() as usize;
        log::info!("output: {sample_rate} Hz, {channels} channels");

        let config = self.config.clone().with_sample_rate(sample_rate);
        let (mut runtime, mut synth) = PatchRuntime::builder(config)
            .oscillator(Waveform::Saw)
            .envelope("amp", EnvelopeParams::adsr(8.0, 300.0, 0.55, 700.0))
            .tremolo(Waveform::Sine, 5.0, 0.25)
            .gain(0.12)
            .limiter(LimiterParams::default())
            .build();

        let mut scratch = vec![0.0f32; MAX_BLOCK_SIZE];
        let stream = device
            .build_output_stream(
                &stream_config.into(),
                move |data: &mut [f32], _| {
                    for chunk in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
                        synth.render_interleaved(chunk, channels, &mut scratch);
                    }
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .wrap_err("failed to build output stream")?;
        stream.play().wrap_err("failed to start output stream")?;

        let mut terminal = ratatui::init();
        let result = self.ui_loop(&mut terminal, &mut runtime, sample_rate);
        ratatui::restore();
        drop(stream);
        result
    }

    fn ui_loop(
        &mut self,
        terminal: &mut DefaultTerminal,
        runtime: &mut PatchRuntime,
        sample_rate: f32,
    ) -> EyreResult<()> {
        let meters = runtime.meters();
        let started = Instant::now();
        let mut released = 0;

        loop {
            let elapsed = started.elapsed().as_secs_f64();
            for midi in self.score.due(elapsed) {
                runtime.handle_midi(midi);
            }
            released += runtime.poll();

            let snapshot = runtime.snapshot();
            let view = View {
                levels: meters.levels(snapshot.voices.len()),
                active: meters.active(),
                snapshot,
                sample_rate,
                progress: self.score.progress(elapsed),
                released,
            };
            terminal.draw(|frame| ui::render(frame, &view))?;

            if event::poll(FRAME)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('+') | KeyCode::Char('=') => {
                            let target = target_count(runtime) + 1;
                            runtime.request_resize(target.min(MAX_VOICES));
                        }
                        KeyCode::Char('-') => {
                            let target = target_count(runtime).saturating_sub(1);
                            runtime.request_resize(target.max(1));
                        }
                        KeyCode::Char('p') | KeyCode::Char('P') => runtime.panic(),
                        _ => {}
                    }
                }
            }
        }
    }
}

/// The voice count the allocator is heading towards.
fn target_count(runtime: &PatchRuntime) -> usize {
    match runtime.snapshot().allocation_state {
        AllocationState::Stable { voice_count } => voice_count,
        AllocationState::Shrinking { target_count, .. } => target_count,
    }
}
