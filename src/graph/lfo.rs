use crate::dsp::{
    lfo::{bipolar_to_unipolar, LfoBank},
    oscillator::Waveform,
};

/*
Tremolo LFO Node
================

Modulates each voice's amplitude with its own LFO:

    gain = 1.0 - depth · unipolar(lfo)

depth = 0 leaves the signal untouched; depth = 1 swings the gain between
1.0 and 0.0 once per LFO cycle. With sync enabled (the default) every note
starts at the top of the cycle.

Typical rates:
    0.5 - 2 Hz    Slow pulsing
    4 - 7 Hz      Classic tremolo
    > 10 Hz       Helicopter chop
*/

pub struct LfoNode {
    bank: LfoBank,
    depth: f32,
}

impl LfoNode {
    pub fn tremolo(waveform: Waveform, rate_hz: f32, depth: f32, sample_rate: f32) -> Self {
        Self {
            bank: LfoBank::new(waveform, rate_hz, sample_rate),
            depth: depth.clamp(0.0, 1.0),
        }
    }

    pub fn free_running(mut self) -> Self {
        self.bank = self.bank.free_running();
        self
    }

    pub fn note_on(&mut self, voice: usize) {
        self.bank.sync(voice);
    }

    #[inline]
    pub fn process(&mut self, voice: usize, input: f32) -> f32 {
        let lfo = bipolar_to_unipolar(self.bank.next_sample(voice));
        input * (1.0 - self.depth * lfo)
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }
}
