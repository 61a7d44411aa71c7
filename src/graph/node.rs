use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::oscillator::INACTIVE_PITCH,
    graph::{envelope::EnvNode, lfo::LfoNode, oscillator::OscNode},
};

/// Identifies one patch graph inside the host.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GraphId(pub u32);

/// A port on a node: where events leave from or arrive at.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortAddress {
    pub graph: GraphId,
    pub node_id: String,
    pub port_id: String,
}

impl PortAddress {
    pub fn new(graph: GraphId, node_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            graph,
            node_id: node_id.into(),
            port_id: port_id.into(),
        }
    }

    /// The consumer id a node input at this address holds voices under.
    pub fn consumer_id(&self) -> ConsumerId {
        ConsumerId::new(&self.node_id, &self.port_id)
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.graph.0, self.node_id, self.port_id)
    }
}

/// Opaque name of a downstream processor port, formatted `node:port`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(String);

impl ConsumerId {
    pub fn new(node_id: &str, port_id: &str) -> Self {
        Self(format!("{node_id}:{port_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConsumerId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-voice control voltages as seen by processors in the render domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceInputs {
    /// Volts/octave, or `INACTIVE_PITCH`.
    pub pitch: f32,
    /// 0.0 - 1.0
    pub velocity: f32,
    /// 0.0 - 1.0
    pub pressure: f32,
}

impl Default for VoiceInputs {
    fn default() -> Self {
        Self {
            pitch: INACTIVE_PITCH,
            velocity: 0.0,
            pressure: 0.0,
        }
    }
}

/// Per-voice node behaviors as a closed set, dispatched with a single match
/// in the hot loop.
///
/// Each variant transforms the signal flowing down a voice chain:
/// - `Oscillator` replaces it with a waveform at the voice's pitch
/// - `Envelope` multiplies it by the envelope level
/// - `Lfo` multiplies it by a tremolo gain
pub enum Processor {
    Oscillator(OscNode),
    Envelope(EnvNode),
    Lfo(LfoNode),
}

impl Processor {
    /// Apply queued control messages. Called once at the top of each block.
    pub fn drain_messages(&mut self) {
        if let Processor::Envelope(env) = self {
            env.drain_messages();
        }
    }

    /// A new note started on `voice`.
    pub fn note_on(&mut self, voice: usize) {
        match self {
            Processor::Oscillator(osc) => osc.note_on(voice),
            Processor::Lfo(lfo) => lfo.note_on(voice),
            Processor::Envelope(_) => {}
        }
    }

    #[inline]
    pub fn process(&mut self, voice: usize, input: f32, cv: &VoiceInputs) -> f32 {
        match self {
            Processor::Oscillator(osc) => osc.process(voice, cv),
            Processor::Envelope(env) => input * env.process(voice),
            Processor::Lfo(lfo) => lfo.process(voice, input),
        }
    }

    /// Called once after every voice has been processed for a sample.
    #[inline]
    pub fn end_sample(&mut self) {
        if let Processor::Envelope(env) = self {
            env.advance();
        }
    }

    /// Envelopes report whether the voice still sounds; other nodes have no opinion.
    pub fn voice_active(&self, voice: usize) -> Option<bool> {
        match self {
            Processor::Envelope(env) => Some(env.is_active(voice)),
            _ => None,
        }
    }

    /// True while an envelope is running the force-release fade for `voice`.
    pub fn is_fading(&self, voice: usize) -> bool {
        match self {
            Processor::Envelope(env) => env.is_fading(voice),
            _ => false,
        }
    }

    pub fn envelope_level(&self, voice: usize) -> Option<f32> {
        match self {
            Processor::Envelope(env) => Some(env.level(voice)),
            _ => None,
        }
    }
}

impl From<OscNode> for Processor {
    fn from(node: OscNode) -> Self {
        Processor::Oscillator(node)
    }
}

impl From<EnvNode> for Processor {
    fn from(node: EnvNode) -> Self {
        Processor::Envelope(node)
    }
}

impl From<LfoNode> for Processor {
    fn from(node: LfoNode) -> Self {
        Processor::Lfo(node)
    }
}
