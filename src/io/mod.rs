//! External interfaces: the MIDI vocabulary and its translation into voices and CV.

pub mod converter;
pub mod midi;

pub use converter::{MidiOutcome, MidiToCv};
pub use midi::MidiEvent;
