use crate::{
    dsp::curve::shaped_t,
    synth::message::{EnvelopeMessage, EnvelopeNotification, MessageSender},
    MAX_PHASES, MAX_VOICES,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Multi-Phase Envelope Engine
===========================

A generalization of the classic ADSR: an envelope is an ordered list of
phases, each ramping from wherever the previous phase ended to its own
target level over a fixed duration, with an adjustable curve.

Vocabulary
----------

  phase       One segment: target level, duration (ms), shape, hold flag.

  hold        A phase with `hold = true` stops at its target level and waits
              for the gate to go low. This is how "sustain" is expressed.
              The hold flag on the LAST phase is ignored: the final phase
              always runs to completion.

  release     The phase right after the last holding phase (or the last
              phase when nothing holds). Gate-off jumps straight here.

  voice slot  One of MAX_VOICES independent state machines. The engine is
              sized once at construction and never grows.

  force       An unconditional 5 ms linear fade to zero, used when a voice
  release     is stolen or on panic. Bounded time, no click.


Example: ADSR as phases
-----------------------

    Level
      1.0 ┐  ╱╲
          │ ╱  ╲_______ hold
      S   │╱           ╲
      0.0 └─────────────╲───→ Time
           [0]  [1]      [2]
          attack decay   release (release phase index = 2)

    phases = [ {1.0, A}, {S, D, hold}, {0.0, R} ]


The State Machine
-----------------

    Idle ──gate on──→ Phase(0)
    Phase(i) ──duration elapsed──→ Phase(i+1)     (start = target of i)
    Phase(i, hold) ──duration elapsed──→ Phase(i, holding)
    Phase(i) or holding ──gate off, i < release──→ Phase(release)
    Phase(last) ──duration elapsed──→ Idle        (notifies release complete)
    any ──force release──→ Fading ──5 ms──→ Idle

Gate-off at or after the release phase is ignored; the phase continues.
Gate-on while fading is latched and starts Phase(0) once the fade ends.
Gate-on on a voice that is still inside a phase restarts Phase(0) from the
current level, retrigger or not, so the output never jumps.

A release-complete notification that does not fit in the queue is kept on
the voice and retried by `flush_notifications` until it is delivered.


Per-Sample Evaluation
---------------------

Each voice remembers the sample clock at which its current phase started.
For elapsed samples `e` of a phase lasting `d` samples:

    level = start + (target - start) * shaped_t(e / d, shape)

At e = d the level equals `target`, which is exactly where the next phase
starts, so the output is continuous across every phase boundary. Durations
are clamped to at least one sample so `d` is never zero.

The engine keeps its own copy of start/target/duration/shape per voice, so
replacing the parameter list mid-note only affects phases entered later.
*/

/// Duration of the fade used by force release.
pub const FORCE_RELEASE_MS: f32 = 5.0;

const IDLE: i32 = -1;

/// One envelope segment.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvelopePhase {
    /// Level reached at the end of the phase (0.0 - 1.0).
    pub target_level: f32,
    pub duration_ms: f32,
    /// Curve control, see [`crate::dsp::curve`].
    pub shape: f32,
    pub hold: bool,
}

impl EnvelopePhase {
    pub fn new(target_level: f32, duration_ms: f32, shape: f32) -> Self {
        Self {
            target_level,
            duration_ms,
            shape,
            hold: false,
        }
    }

    /// Mark this phase as holding until gate-off.
    pub fn holding(mut self) -> Self {
        self.hold = true;
        self
    }

    fn sanitized(self) -> Self {
        let finite_or = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };
        Self {
            target_level: finite_or(self.target_level, 0.0).clamp(0.0, 1.0),
            duration_ms: finite_or(self.duration_ms, 0.0).max(0.0),
            shape: finite_or(self.shape, 0.0).clamp(-1.0, 1.0),
            hold: self.hold,
        }
    }
}

/// A complete envelope definition in a fixed-capacity, `Copy` container so it
/// can travel through a ring buffer without allocating.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    phases: [EnvelopePhase; MAX_PHASES],
    len: usize,
    retrigger: bool,
}

impl EnvelopeParams {
    /// Build params from a phase list. Values are clamped into range; phases
    /// beyond `MAX_PHASES` are dropped.
    pub fn new(phases: &[EnvelopePhase], retrigger: bool) -> Self {
        if phases.len() > MAX_PHASES {
            log::warn!(
                "envelope has {} phases, keeping the first {}",
                phases.len(),
                MAX_PHASES
            );
        }

        let mut params = Self {
            phases: [EnvelopePhase::default(); MAX_PHASES],
            len: phases.len().min(MAX_PHASES),
            retrigger,
        };
        for (slot, phase) in params.phases.iter_mut().zip(phases) {
            *slot = phase.sanitized();
        }
        params
    }

    /// Zero-length envelope. Every voice stays idle.
    pub fn empty() -> Self {
        Self::new(&[], true)
    }

    /// Classic attack/decay/sustain/release expressed as three phases.
    pub fn adsr(attack_ms: f32, decay_ms: f32, sustain: f32, release_ms: f32) -> Self {
        Self::new(
            &[
                EnvelopePhase::new(1.0, attack_ms, 0.0),
                EnvelopePhase::new(sustain, decay_ms, 0.0).holding(),
                EnvelopePhase::new(0.0, release_ms, 0.0),
            ],
            true,
        )
    }

    pub fn phases(&self) -> &[EnvelopePhase] {
        &self.phases[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn retrigger(&self) -> bool {
        self.retrigger
    }

    /// Index of the phase gate-off jumps to.
    ///
    /// The phase after the last holding phase (the last phase cannot hold),
    /// or the last phase when nothing holds. `None` for an empty envelope.
    pub fn release_phase_index(&self) -> Option<usize> {
        let last = self.len.checked_sub(1)?;
        let held = self.phases[..last].iter().rposition(|phase| phase.hold);
        Some(held.map_or(last, |i| i + 1))
    }

    /// Whether phase `index` stops and waits for gate-off.
    fn holds_at(&self, index: usize) -> bool {
        index + 1 < self.len && self.phases[index].hold
    }
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self::adsr(10.0, 100.0, 0.7, 300.0)
    }
}

/// Observable stage of a single voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Phase { index: usize, holding: bool },
    ForceRelease,
}

/// Per-voice runtime state. Only ever touched by the render domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceRuntimeState {
    /// Current phase, or -1 when idle.
    pub phase_index: i32,
    pub level: f32,
    pub phase_start_sample: u64,
    pub phase_duration_samples: u64,
    pub start_level: f32,
    pub target_level: f32,
    pub shape: f32,
    pub is_holding: bool,
    pub is_force_release: bool,
    /// Generation of the gate-on that started the current run.
    pub generation: u32,
    /// Gate-on received during a force-release fade.
    pub pending_gate: Option<u32>,
    /// Release-complete generation still waiting for room in the queue.
    pub undelivered: Option<u32>,
}

impl VoiceRuntimeState {
    const fn idle() -> Self {
        Self {
            phase_index: IDLE,
            level: 0.0,
            phase_start_sample: 0,
            phase_duration_samples: 1,
            start_level: 0.0,
            target_level: 0.0,
            shape: 0.0,
            is_holding: false,
            is_force_release: false,
            generation: 0,
            pending_gate: None,
            undelivered: None,
        }
    }

    fn is_idle(&self) -> bool {
        self.phase_index == IDLE && !self.is_force_release
    }

    fn enter_phase(&mut self, index: usize, phase: &EnvelopePhase, start: f32, now: u64, sr: f32) {
        self.phase_index = index as i32;
        self.phase_start_sample = now;
        self.phase_duration_samples = ms_to_samples(phase.duration_ms, sr);
        self.start_level = start;
        self.target_level = phase.target_level;
        self.shape = phase.shape;
        self.level = start;
        self.is_holding = false;
        self.is_force_release = false;
    }

    fn finish(&mut self, level: f32) {
        self.phase_index = IDLE;
        self.level = level;
        self.is_holding = false;
        self.is_force_release = false;
    }
}

#[inline]
fn ms_to_samples(ms: f32, sample_rate: f32) -> u64 {
    ((ms * sample_rate / 1000.0).round() as u64).max(1)
}

/// Fixed-size bank of multi-phase envelope state machines, one per voice slot.
pub struct EnvelopeEngine {
    sample_rate: f32,
    params: EnvelopeParams,
    release_phase: Option<usize>,
    voices: [VoiceRuntimeState; MAX_VOICES],
    /// Number of voices with an undelivered release-complete.
    undelivered: usize,
    /// Sample clock, advanced once per output sample.
    now: u64,
}

impl EnvelopeEngine {
    pub fn new(sample_rate: f32, params: EnvelopeParams) -> Self {
        Self {
            sample_rate,
            release_phase: params.release_phase_index(),
            params,
            voices: [VoiceRuntimeState::idle(); MAX_VOICES],
            undelivered: 0,
            now: 0,
        }
    }

    /// Apply one control message.
    pub fn apply(&mut self, msg: EnvelopeMessage) {
        match msg {
            EnvelopeMessage::Params(params) => self.set_params(params),
            EnvelopeMessage::Gate {
                voice,
                on: true,
                generation,
            } => self.gate_on(voice as usize, generation),
            EnvelopeMessage::Gate { voice, on: false, .. } => self.gate_off(voice as usize),
            EnvelopeMessage::ForceRelease { voice } => self.force_release(voice as usize),
            EnvelopeMessage::ReleaseAll => self.release_all(),
        }
    }

    /// Replace the phase list. Voices already inside a phase keep its cached
    /// values; voices past the end of the new list finish.
    pub fn set_params(&mut self, params: EnvelopeParams) {
        self.params = params;
        self.release_phase = params.release_phase_index();

        for state in self.voices.iter_mut() {
            if state.phase_index == IDLE || state.is_force_release {
                continue;
            }
            if params.is_empty() {
                state.finish(0.0);
                continue;
            }
            let index = state.phase_index as usize;
            if index >= params.len() {
                state.finish(state.level);
            } else if state.is_holding && !params.holds_at(index) {
                // Let the phase advance on the next sample.
                state.is_holding = false;
            }
        }
    }

    pub fn gate_on(&mut self, voice: usize, generation: u32) {
        let Some(state) = self.voices.get_mut(voice) else {
            return;
        };

        if state.is_force_release {
            state.pending_gate = Some(generation);
            return;
        }
        if self.params.is_empty() {
            return;
        }

        let start = if state.phase_index != IDLE || !self.params.retrigger {
            state.level
        } else {
            0.0
        };
        state.generation = generation;
        state.enter_phase(0, &self.params.phases[0], start, self.now, self.sample_rate);
    }

    pub fn gate_off(&mut self, voice: usize) {
        let Some(state) = self.voices.get_mut(voice) else {
            return;
        };

        if state.is_force_release {
            state.pending_gate = None;
            return;
        }
        if state.phase_index == IDLE {
            return;
        }
        let Some(release) = self.release_phase else {
            return;
        };

        let index = state.phase_index as usize;
        if state.is_holding || index < release {
            let start = state.level;
            state.enter_phase(
                release,
                &self.params.phases[release],
                start,
                self.now,
                self.sample_rate,
            );
        }
    }

    /// Fade the voice to zero over `FORCE_RELEASE_MS`, whatever it is doing.
    pub fn force_release(&mut self, voice: usize) {
        let now = self.now;
        let duration = ms_to_samples(FORCE_RELEASE_MS, self.sample_rate);
        let Some(state) = self.voices.get_mut(voice) else {
            return;
        };

        state.pending_gate = None;
        if state.is_force_release {
            return;
        }
        if state.phase_index == IDLE && state.level == 0.0 {
            return;
        }

        state.is_force_release = true;
        state.is_holding = false;
        state.phase_start_sample = now;
        state.phase_duration_samples = duration;
        state.start_level = state.level;
        state.target_level = 0.0;
        state.shape = 0.0;
    }

    /// Force-release every voice that is not already silent.
    pub fn release_all(&mut self) {
        for voice in 0..MAX_VOICES {
            self.force_release(voice);
        }
    }

    /// Evaluate one voice at the current sample clock.
    ///
    /// Call for every voice of interest, then [`advance`](Self::advance) once.
    #[inline]
    pub fn process<N>(&mut self, voice: usize, notify: &mut N) -> f32
    where
        N: MessageSender<EnvelopeNotification>,
    {
        let now = self.now;
        let sample_rate = self.sample_rate;
        let params = &self.params;
        let Some(state) = self.voices.get_mut(voice) else {
            return 0.0;
        };

        if state.is_force_release {
            let elapsed = now.saturating_sub(state.phase_start_sample);
            if elapsed < state.phase_duration_samples {
                let t = elapsed as f32 / state.phase_duration_samples as f32;
                state.level = state.start_level * (1.0 - t);
                return state.level;
            }

            state.finish(0.0);
            if let Some(generation) = state.pending_gate.take() {
                if !params.is_empty() {
                    state.generation = generation;
                    state.enter_phase(0, &params.phases[0], 0.0, now, sample_rate);
                }
            }
            return state.level;
        }

        if state.phase_index == IDLE || state.is_holding {
            return state.level;
        }

        let elapsed = now.saturating_sub(state.phase_start_sample);
        if elapsed < state.phase_duration_samples {
            let t = elapsed as f32 / state.phase_duration_samples as f32;
            state.level = state.start_level
                + (state.target_level - state.start_level) * shaped_t(t, state.shape);
            return state.level;
        }

        // Phase complete.
        state.level = state.target_level;
        let index = state.phase_index as usize;
        if index + 1 >= params.len() {
            state.finish(state.target_level);
            let generation = state.generation;
            let note = EnvelopeNotification::ReleaseComplete {
                voice: voice as u32,
                generation,
            };
            if notify.send(note).is_err() && state.undelivered.replace(generation).is_none() {
                self.undelivered += 1;
            }
        } else if params.holds_at(index) {
            state.is_holding = true;
        } else {
            let next = index + 1;
            let start = state.target_level;
            state.enter_phase(next, &params.phases[next], start, now, sample_rate);
        }
        state.level
    }

    /// Retry release-complete notifications the queue had no room for.
    ///
    /// Stops at the first one that still does not fit.
    pub fn flush_notifications<N>(&mut self, notify: &mut N)
    where
        N: MessageSender<EnvelopeNotification>,
    {
        if self.undelivered == 0 {
            return;
        }
        for (voice, state) in self.voices.iter_mut().enumerate() {
            let Some(generation) = state.undelivered else {
                continue;
            };
            let note = EnvelopeNotification::ReleaseComplete {
                voice: voice as u32,
                generation,
            };
            if notify.send(note).is_err() {
                return;
            }
            state.undelivered = None;
            self.undelivered -= 1;
        }
    }

    /// Voices whose release-complete is still waiting to be sent.
    pub fn undelivered_count(&self) -> usize {
        self.undelivered
    }

    /// Advance the sample clock by one sample.
    #[inline]
    pub fn advance(&mut self) {
        self.now += 1;
    }

    /// Render a single voice into `buffer`, advancing the clock per sample.
    ///
    /// Only meaningful when no other voice of this engine is being rendered.
    pub fn render<N>(&mut self, voice: usize, buffer: &mut [f32], notify: &mut N)
    where
        N: MessageSender<EnvelopeNotification>,
    {
        for sample in buffer.iter_mut() {
            *sample = self.process(voice, notify);
            self.advance();
        }
    }

    pub fn level(&self, voice: usize) -> f32 {
        self.voices.get(voice).map_or(0.0, |state| state.level)
    }

    pub fn stage(&self, voice: usize) -> EnvelopeStage {
        match self.voices.get(voice) {
            None => EnvelopeStage::Idle,
            Some(state) if state.is_force_release => EnvelopeStage::ForceRelease,
            Some(state) if state.phase_index == IDLE => EnvelopeStage::Idle,
            Some(state) => EnvelopeStage::Phase {
                index: state.phase_index as usize,
                holding: state.is_holding,
            },
        }
    }

    /// True while the voice is inside a phase or fading.
    pub fn is_active(&self, voice: usize) -> bool {
        self.voices.get(voice).is_some_and(|state| !state.is_idle())
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|state| !state.is_idle()).count()
    }

    pub fn state(&self, voice: usize) -> Option<&VoiceRuntimeState> {
        self.voices.get(voice)
    }

    pub fn params(&self) -> &EnvelopeParams {
        &self.params
    }

    pub fn release_phase_index(&self) -> Option<usize> {
        self.release_phase
    }
}
