//! Low Frequency Oscillator (LFO) generators.

use crate::{
    dsp::oscillator::{advance_phase, Waveform},
    MAX_VOICES,
};

/*
Low Frequency Oscillators
=========================

An LFO is the same phase-accumulator oscillator running at control rate
(~0.01 Hz to ~20 Hz). The render contract is identical to the audio
oscillators: fixed per-voice state, one step per sample, no allocation.

Vocabulary
----------

  bipolar     Output swings -1.0 to +1.0 (vibrato, pan).
  unipolar    Output stays 0.0 to 1.0 (tremolo depth, filter opening).
              unipolar = (bipolar + 1.0) / 2.0

  free-run    The phase keeps running regardless of notes.
  synced      `sync(voice)` on note-on restarts the cycle so every note gets
              the same modulation shape.

The rate is a fixed frequency rather than a pitch CV; LFOs ignore the
keyboard.
*/

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Convert unipolar signal (0.0 to 1.0) to bipolar (-1.0 to +1.0).
#[inline]
pub fn unipolar_to_bipolar(unipolar: f32) -> f32 {
    (unipolar * 2.0) - 1.0
}

/// Samples in one LFO cycle.
///
/// # Example
/// ```
/// use saavy_modular::dsp::lfo::samples_per_period;
/// assert_eq!(samples_per_period(5.0, 48000.0), 9600.0);
/// ```
#[inline]
pub fn samples_per_period(frequency_hz: f32, sample_rate: f32) -> f32 {
    sample_rate / frequency_hz
}

/// Control-rate oscillators, one per voice slot, sharing a rate.
pub struct LfoBank {
    waveform: Waveform,
    rate_hz: f32,
    sample_rate: f32,
    synced: bool,
    phases: [f32; MAX_VOICES],
}

impl LfoBank {
    pub fn new(waveform: Waveform, rate_hz: f32, sample_rate: f32) -> Self {
        Self {
            waveform,
            rate_hz: rate_hz.clamp(0.0, sample_rate * 0.5),
            sample_rate,
            synced: true,
            phases: [0.0; MAX_VOICES],
        }
    }

    /// Let every voice run without restarting on note-on.
    pub fn free_running(mut self) -> Self {
        self.synced = false;
        self
    }

    /// Next bipolar sample for `voice`.
    #[inline]
    pub fn next_sample(&mut self, voice: usize) -> f32 {
        let Some(phase) = self.phases.get_mut(voice) else {
            return 0.0;
        };
        let out = self.waveform.evaluate(*phase);
        *phase = advance_phase(*phase, self.rate_hz / self.sample_rate);
        out
    }

    /// Called on note-on; restarts the cycle when synced.
    pub fn sync(&mut self, voice: usize) {
        if !self.synced {
            return;
        }
        if let Some(phase) = self.phases.get_mut(voice) {
            *phase = 0.0;
        }
    }

    pub fn rate_hz(&self) -> f32 {
        self.rate_hz
    }

    pub fn set_rate_hz(&mut self, rate_hz: f32) {
        self.rate_hz = rate_hz.clamp(0.0, self.sample_rate * 0.5);
    }
}
