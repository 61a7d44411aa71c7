use std::sync::Arc;

use rtrb::Consumer;

use crate::{
    dsp::{limiter::Limiter, oscillator::INACTIVE_PITCH},
    graph::node::{Processor, VoiceInputs},
    synth::{
        message::{CvMessage, MessageReceiver},
        meter::VoiceMeters,
    },
    MAX_VOICES,
};

/*
Polyphonic Render Loop
======================

The render-domain half of a patch. It owns every per-voice processor and
never allocates: voice indices arrive already chosen by the control-side
allocator, so rendering a block is

    1. count the CV messages that are ready
    2. drain each processor's control queue
    3. apply the counted CV messages to the per-voice inputs
    4. for each sample, for each sounding voice:
           signal = chain[0] → chain[1] → … → chain[n]
           out   += signal · velocity · gain
       then tick every processor's sample clock
    5. run the output limiter, if any
    6. publish per-voice envelope levels to the meters

The control side queues envelope messages before the CV that belongs with
them. Counting CV first means every counted message already has its
envelope messages visible when step 2 runs.

Steals and panic
----------------

A stolen voice keeps playing its old note through the 5 ms force-release
fade. Its `NoteOn` is held back until the fade finishes, so the oscillator
neither jumps pitch nor resets phase under a sounding signal:

    ForceRelease ─┬─ fade 5 ms ──────────────┬─ Phase(0) from level 0
    NoteOn (CV) ──┴─ deferred ···············┴─ applied, phase reset

`Silence` waits the same way, so panic fades instead of cutting. A later
`NoteOn` or `Silence` for the same voice replaces the deferred one; pitch
bends update the deferred note.

A voice is sounding while any envelope in the chain is active for it. A
chain without envelopes falls back to the pitch CV: anything but
`INACTIVE_PITCH` sounds.
*/

pub struct PolySynth {
    rx: Consumer<CvMessage>,
    inputs: [VoiceInputs; MAX_VOICES],
    /// `NoteOn`/`Silence` waiting for a force-release fade to finish.
    deferred: [Option<CvMessage>; MAX_VOICES],
    chain: Vec<Processor>,
    gain: f32,
    limiter: Option<Limiter>,
    meters: Option<Arc<VoiceMeters>>,
    frame_counter: u64,
}

impl PolySynth {
    pub fn new(rx: Consumer<CvMessage>, chain: Vec<Processor>) -> Self {
        Self {
            rx,
            inputs: [VoiceInputs::default(); MAX_VOICES],
            deferred: [None; MAX_VOICES],
            chain,
            gain: 1.0,
            limiter: None,
            meters: None,
            frame_counter: 0,
        }
    }

    /// Output gain applied to the voice mix.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Limit the mixed output.
    pub fn with_limiter(mut self, limiter: Limiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_meters(mut self, meters: Arc<VoiceMeters>) -> Self {
        self.meters = Some(meters);
        self
    }

    pub fn render_block(&mut self, out: &mut [f32]) {
        let ready = self.rx.slots();
        for node in &mut self.chain {
            node.drain_messages();
        }
        for _ in 0..ready {
            let Some(msg) = MessageReceiver::pop(&mut self.rx) else {
                break;
            };
            self.apply_cv(msg);
        }
        for voice in 0..MAX_VOICES {
            self.settle_deferred(voice);
        }

        let mut sounding = [false; MAX_VOICES];
        for (voice, flag) in sounding.iter_mut().enumerate() {
            *flag = self.is_sounding(voice);
        }

        for sample in out.iter_mut() {
            let mut mix = 0.0;
            for voice in (0..MAX_VOICES).filter(|&v| sounding[v]) {
                if self.deferred[voice].is_some() {
                    self.settle_deferred(voice);
                }
                let inputs = self.inputs[voice];
                let mut signal = 0.0;
                for node in &mut self.chain {
                    signal = node.process(voice, signal, &inputs);
                }
                mix += signal * inputs.velocity;
            }
            for node in &mut self.chain {
                node.end_sample();
            }
            *sample = mix * self.gain;
        }

        if let Some(limiter) = &mut self.limiter {
            limiter.process_interleaved(out, 1);
        }

        self.frame_counter += out.len() as u64;
        self.publish_meters();
    }

    /// Render into every channel of an interleaved buffer.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize, scratch: &mut [f32]) {
        let channels = channels.max(1);
        let frames = (out.len() / channels).min(scratch.len());
        self.render_block(&mut scratch[..frames]);
        for (frame, sample) in out.chunks_mut(channels).zip(&scratch[..frames]) {
            frame.fill(*sample);
        }
    }

    pub fn inputs(&self, voice: usize) -> Option<&VoiceInputs> {
        self.inputs.get(voice)
    }

    /// The CV message waiting on `voice`, if its fade is still running.
    pub fn deferred(&self, voice: usize) -> Option<&CvMessage> {
        self.deferred.get(voice).and_then(Option::as_ref)
    }

    pub fn chain(&self) -> &[Processor] {
        &self.chain
    }

    pub fn limiter(&self) -> Option<&Limiter> {
        self.limiter.as_ref()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame_counter
    }

    pub fn is_sounding(&self, voice: usize) -> bool {
        let mut has_envelope = false;
        for node in &self.chain {
            match node.voice_active(voice) {
                Some(true) => return true,
                Some(false) => has_envelope = true,
                None => {}
            }
        }
        !has_envelope && self.inputs.get(voice).is_some_and(|i| i.pitch != INACTIVE_PITCH)
    }

    fn is_fading(&self, voice: usize) -> bool {
        self.chain.iter().any(|node| node.is_fading(voice))
    }

    fn apply_cv(&mut self, msg: CvMessage) {
        match msg {
            CvMessage::NoteOn { voice, .. } | CvMessage::Silence { voice } => {
                let slot = voice as usize;
                if slot >= MAX_VOICES {
                    return;
                }
                if self.is_fading(slot) {
                    self.deferred[slot] = Some(msg);
                } else {
                    self.deferred[slot] = None;
                    self.apply_voice_cv(msg);
                }
            }
            CvMessage::Pitch { voice, pitch } => match self.deferred.get_mut(voice as usize) {
                Some(Some(CvMessage::NoteOn { pitch: pending, .. })) => *pending = pitch,
                _ => {
                    if let Some(inputs) = self.inputs.get_mut(voice as usize) {
                        inputs.pitch = pitch;
                    }
                }
            },
            CvMessage::Pressure { voice, value } => {
                if let Some(inputs) = self.inputs.get_mut(voice as usize) {
                    inputs.pressure = value.clamp(0.0, 1.0);
                }
            }
            CvMessage::Limiter(params) => {
                if let Some(limiter) = &mut self.limiter {
                    limiter.set_params(params);
                }
            }
        }
    }

    /// Apply a deferred message once the voice's fade has finished.
    fn settle_deferred(&mut self, voice: usize) {
        if self.deferred[voice].is_none() || self.is_fading(voice) {
            return;
        }
        if let Some(msg) = self.deferred[voice].take() {
            self.apply_voice_cv(msg);
        }
    }

    fn apply_voice_cv(&mut self, msg: CvMessage) {
        match msg {
            CvMessage::NoteOn {
                voice,
                pitch,
                velocity,
            } => {
                let slot = voice as usize;
                let Some(inputs) = self.inputs.get_mut(slot) else {
                    return;
                };
                inputs.pitch = pitch;
                inputs.velocity = velocity.min(127) as f32 / 127.0;
                inputs.pressure = 0.0;
                for node in &mut self.chain {
                    node.note_on(slot);
                }
            }
            CvMessage::Silence { voice } => {
                if let Some(inputs) = self.inputs.get_mut(voice as usize) {
                    *inputs = VoiceInputs::default();
                }
            }
            _ => {}
        }
    }

    fn publish_meters(&self) {
        let Some(meters) = &self.meters else {
            return;
        };
        let mut active = 0;
        for voice in 0..MAX_VOICES {
            let level = self
                .chain
                .iter()
                .find_map(|node| node.envelope_level(voice))
                .unwrap_or(0.0);
            meters.store_level(voice, level);
            if self.is_sounding(voice) {
                active += 1;
            }
        }
        meters.store_active(active);
    }
}
