//! Low-level DSP primitives used by the graph nodes.
//!
//! These components are allocation-free and realtime-safe: every per-voice
//! structure is a fixed array sized to `MAX_VOICES`, so they can run inside
//! the audio callback without touching the heap.

/// Shaped phase curves and their inverse.
pub mod curve;
/// Multi-phase envelope state machines.
pub mod envelope;
/// Low frequency oscillators for per-voice modulation.
pub mod lfo;
/// Peak limiter for the mixed output.
pub mod limiter;
/// Pitch-CV driven waveform generators.
pub mod oscillator;

pub use envelope::EnvelopeStage;
