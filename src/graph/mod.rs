//! Per-voice processing nodes and the control-domain patch runtime.
//!
//! Nodes wrap the allocation-free primitives in `dsp` with the plumbing a
//! patch needs: per-voice note events, control queues into the render
//! domain, and handles that keep the voice allocator's holds in step with
//! what the render side is still playing.

/// Envelope node plus its control-side handle.
pub mod envelope;
/// Gate-port events and the sink trait the allocator dispatches through.
pub mod events;
/// Tremolo LFO node.
pub mod lfo;
/// Identifiers and the `Processor` sum type.
pub mod node;
/// Pitch-CV driven oscillator node.
pub mod oscillator;
/// Control-domain coordinator: MIDI in, allocator, envelope holds.
pub mod runtime;

pub use node::{ConsumerId, GraphId, PortAddress, Processor, VoiceInputs};
pub use runtime::{PatchBuilder, PatchRuntime};
