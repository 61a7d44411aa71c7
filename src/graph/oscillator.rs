use crate::dsp::oscillator::{is_inactive, OscillatorBank, Waveform};
use crate::graph::node::VoiceInputs;

/*
Voice Oscillator Node
=====================

Wraps an OscillatorBank so each voice slot tracks its own pitch CV.

Waveform Character
------------------

Sine:     Fundamental only. Smooth, hollow. Sub-bass, FM carriers.
Triangle: Odd harmonics falling off as 1/n². Soft leads, gentle pads.
Square:   Odd harmonics falling off as 1/n. Hollow, woody, chiptune.
Saw:      All harmonics falling off as 1/n. Bright, buzzy, brassy.

Detune
------

Detune is added to the pitch CV in cents (100 cents = 1 semitone =
1/12 volt), so two nodes with ±7 cents produce the classic thick unison.
An inactive voice stays silent whatever the detune.

Example usage:
  let osc = OscNode::new(Waveform::Saw, 48_000.0, 261.63).with_detune(7.0);
*/

pub struct OscNode {
    bank: OscillatorBank,
    /// Detune in cents (-100 to +100 typical).
    detune_cents: f32,
}

impl OscNode {
    pub fn new(waveform: Waveform, sample_rate: f32, reference_hz: f32) -> Self {
        Self {
            bank: OscillatorBank::new(waveform, sample_rate, reference_hz),
            detune_cents: 0.0,
        }
    }

    /// Set detune in cents. Clamped to ±2 semitones.
    pub fn with_detune(mut self, cents: f32) -> Self {
        self.detune_cents = cents.clamp(-200.0, 200.0);
        self
    }

    pub fn note_on(&mut self, voice: usize) {
        self.bank.reset(voice);
    }

    #[inline]
    pub fn process(&mut self, voice: usize, cv: &VoiceInputs) -> f32 {
        if is_inactive(cv.pitch) {
            return 0.0;
        }
        self.bank
            .next_sample(voice, cv.pitch + self.detune_cents / 1200.0)
    }

    pub fn waveform(&self) -> Waveform {
        self.bank.waveform()
    }
}
