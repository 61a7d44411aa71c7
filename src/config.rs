//! Engine configuration shared by the control and render domains.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MAX_VOICES;

/// Pitch CV 0.0 corresponds to C4.
pub const DEFAULT_REFERENCE_HZ: f32 = 261.625_56;

/// Settings for a [`PatchRuntime`](crate::graph::runtime::PatchRuntime) and
/// the [`PolySynth`](crate::synth::poly::PolySynth) it drives.
///
/// Built with `Default` plus chained `with_*` calls:
///
/// ```
/// use saavy_modular::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_sample_rate(44_100.0)
///     .with_voice_count(4)
///     .with_midi_channel(Some(1));
/// assert_eq!(config.voice_count, 4);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Initial polyphony. Clamped to `1..=MAX_VOICES`.
    pub voice_count: usize,
    /// Frequency produced by a pitch CV of 0.0.
    pub reference_hz: f32,
    pub bend_range_semitones: f32,
    /// MIDI channel (1-16) to listen on; `None` accepts every channel.
    pub midi_channel: Option<u8>,
    /// Capacity of each control/render ring buffer.
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            voice_count: 8,
            reference_hz: DEFAULT_REFERENCE_HZ,
            bend_range_semitones: 2.0,
            midi_channel: None,
            queue_capacity: 256,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_voice_count(mut self, voice_count: usize) -> Self {
        self.voice_count = voice_count;
        self
    }

    pub fn with_reference_hz(mut self, reference_hz: f32) -> Self {
        self.reference_hz = reference_hz;
        self
    }

    pub fn with_bend_range(mut self, semitones: f32) -> Self {
        self.bend_range_semitones = semitones;
        self
    }

    pub fn with_midi_channel(mut self, channel: Option<u8>) -> Self {
        self.midi_channel = channel;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Clamp every field into its usable range, logging what changed.
    pub fn sanitized(mut self) -> Self {
        let voices = self.voice_count.clamp(1, MAX_VOICES);
        if voices != self.voice_count {
            log::warn!(
                "voice_count {} out of range, clamped to {}",
                self.voice_count,
                voices
            );
            self.voice_count = voices;
        }

        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            log::warn!("invalid sample_rate {}, using 48000", self.sample_rate);
            self.sample_rate = 48_000.0;
        }

        if !self.reference_hz.is_finite() || self.reference_hz <= 0.0 {
            log::warn!("invalid reference_hz {}, using C4", self.reference_hz);
            self.reference_hz = DEFAULT_REFERENCE_HZ;
        }

        if !self.bend_range_semitones.is_finite() {
            self.bend_range_semitones = 2.0;
        }
        self.bend_range_semitones = self.bend_range_semitones.clamp(0.0, 48.0);

        if let Some(channel) = self.midi_channel {
            if !(1..=16).contains(&channel) {
                log::warn!("midi channel {channel} out of range, listening on all channels");
                self.midi_channel = None;
            }
        }

        self.queue_capacity = self.queue_capacity.max(MAX_VOICES * 2);
        self
    }
}
