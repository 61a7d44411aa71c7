use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MAX_VOICES;

/*
Per-Voice Oscillators
=====================

Every voice gets its own phase accumulator. Each sample the accumulator
advances by `frequency / sample_rate` and wraps modulo 1, and the waveform
is evaluated in closed form from the phase:

    sine      sin(2π·φ)
    triangle  1 - 4·|φ - 0.5|        (peaks at φ = 0.5)
    square    +1 for φ < 0.5, else -1
    saw       2·φ - 1

Pitch CV
--------

Pitch arrives as a control voltage in volts/octave. CV 0.0 plays the
reference frequency and every +1.0 doubles it:

    frequency = reference_hz · 2^cv

A voice with no note carries INACTIVE_PITCH. Converting that with the
formula would give a sub-audio rumble, not silence, so the generator
checks for it explicitly and outputs 0.0.
*/

/// Pitch CV marking a voice with no note. Anything at or below is silent.
pub const INACTIVE_PITCH: f32 = -1_000.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Square,
    Saw,
}

impl Waveform {
    /// Evaluate the waveform at `phase` in `[0, 1)`. Output is bipolar.
    #[inline]
    pub fn evaluate(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * phase - 1.0,
        }
    }
}

/// Whether `cv` denotes an inactive voice.
#[inline]
pub fn is_inactive(cv: f32) -> bool {
    cv.is_nan() || cv <= INACTIVE_PITCH
}

/// Convert a volts/octave pitch CV into Hz.
#[inline]
pub fn pitch_to_frequency(cv: f32, reference_hz: f32) -> f32 {
    reference_hz * cv.exp2()
}

/// Pitch CV for a MIDI note, with C4 (60) at 0.0.
#[inline]
pub fn midi_note_to_pitch(note: u8) -> f32 {
    (note as f32 - 60.0) / 12.0
}

/// Advance a phase accumulator, wrapping into `[0, 1)`.
#[inline]
pub(crate) fn advance_phase(phase: f32, increment: f32) -> f32 {
    let next = phase + increment;
    let wrapped = next - next.floor();
    if wrapped.is_finite() {
        wrapped
    } else {
        0.0
    }
}

/// Audio-rate oscillators, one accumulator per voice slot.
pub struct OscillatorBank {
    waveform: Waveform,
    sample_rate: f32,
    reference_hz: f32,
    phases: [f32; MAX_VOICES],
}

impl OscillatorBank {
    pub fn new(waveform: Waveform, sample_rate: f32, reference_hz: f32) -> Self {
        Self {
            waveform,
            sample_rate,
            reference_hz,
            phases: [0.0; MAX_VOICES],
        }
    }

    /// Next sample for `voice` driven by a pitch CV.
    #[inline]
    pub fn next_sample(&mut self, voice: usize, pitch_cv: f32) -> f32 {
        if is_inactive(pitch_cv) {
            return 0.0;
        }
        let frequency = pitch_to_frequency(pitch_cv, self.reference_hz);
        self.next_sample_hz(voice, frequency)
    }

    /// Next sample for `voice` driven directly by a frequency in Hz.
    #[inline]
    pub fn next_sample_hz(&mut self, voice: usize, frequency: f32) -> f32 {
        let Some(phase) = self.phases.get_mut(voice) else {
            return 0.0;
        };
        let out = self.waveform.evaluate(*phase);
        *phase = advance_phase(*phase, frequency / self.sample_rate);
        out
    }

    /// Restart the voice's cycle from phase 0.
    pub fn reset(&mut self, voice: usize) {
        if let Some(phase) = self.phases.get_mut(voice) {
            *phase = 0.0;
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn phase(&self, voice: usize) -> f32 {
        self.phases.get(voice).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_sine() {
        let sample_rate = 48_000.0;
        let mut bank = OscillatorBank::new(Waveform::Sine, sample_rate, 440.0);

        let samples: Vec<f32> = (0..128).map(|_| bank.next_sample(0, 0.0)).collect();

        // sample n should be sin(2pi f n / sr)
        let n = 12;
        let expected = (TAU * 440.0 * n as f32 / sample_rate).sin();
        assert!(
            (samples[n] - expected).abs() < 1e-4,
            "expected {expected}, got {}",
            samples[n]
        );
    }

    #[test]
    fn one_volt_doubles_frequency() {
        assert!((pitch_to_frequency(0.0, 261.625_56) - 261.625_56).abs() < 1e-3);
        assert!((pitch_to_frequency(1.0, 440.0) - 880.0).abs() < 1e-3);
        assert!((pitch_to_frequency(-1.0, 440.0) - 220.0).abs() < 1e-3);
        assert!((midi_note_to_pitch(72) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn inactive_pitch_renders_silence() {
        let mut bank = OscillatorBank::new(Waveform::Square, 48_000.0, 261.6);
        for _ in 0..64 {
            assert_eq!(bank.next_sample(0, INACTIVE_PITCH), 0.0);
            assert_eq!(bank.next_sample(1, f32::NAN), 0.0);
        }
        assert_eq!(bank.phase(0), 0.0, "silent voices do not advance");
    }

    #[test]
    fn phase_wraps_into_unit_interval() {
        assert!((advance_phase(0.9, 0.25) - 0.15).abs() < 1e-6);
        assert!((advance_phase(0.1, -0.25) - 0.85).abs() < 1e-6);
        assert_eq!(advance_phase(0.0, f32::INFINITY), 0.0);
    }

    #[test]
    fn waveforms_hit_expected_points() {
        assert!((Waveform::Triangle.evaluate(0.5) - 1.0).abs() < 1e-6);
        assert!((Waveform::Triangle.evaluate(0.0) + 1.0).abs() < 1e-6);
        assert_eq!(Waveform::Square.evaluate(0.25), 1.0);
        assert_eq!(Waveform::Square.evaluate(0.75), -1.0);
        assert_eq!(Waveform::Saw.evaluate(0.0), -1.0);
        assert!(Waveform::Sine.evaluate(0.25) > 0.999);
    }

    #[test]
    fn voices_are_independent() {
        let mut bank = OscillatorBank::new(Waveform::Saw, 1_000.0, 100.0);
        for _ in 0..3 {
            bank.next_sample(0, 0.0);
        }
        assert!((bank.phase(0) - 0.3).abs() < 1e-6);
        assert_eq!(bank.phase(1), 0.0);

        bank.reset(0);
        assert_eq!(bank.phase(0), 0.0);
    }
}
