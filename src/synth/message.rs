use std::collections::VecDeque;

use rtrb::{Consumer, Producer, PushError};

use crate::dsp::{envelope::EnvelopeParams, limiter::LimiterParams};

/// Control messages for an envelope node, applied at the top of a render block.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum EnvelopeMessage {
    /// Replace the phase list and retrigger flag.
    Params(EnvelopeParams),
    /// `generation` is echoed back in the matching release-complete notification.
    Gate { voice: u32, on: bool, generation: u32 },
    ForceRelease { voice: u32 },
    ReleaseAll,
}

/// Sent from the render domain back to the envelope's control-side handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EnvelopeNotification {
    ReleaseComplete { voice: u32, generation: u32 },
}

/// Render-loop control: per-voice control voltages written by the
/// MIDI-to-CV translator, plus output stage settings.
///
/// `NoteOn` and `Silence` wait while the voice is in a force-release fade.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CvMessage {
    /// New note on a voice: pitch in volts/octave, velocity 1-127.
    NoteOn { voice: u32, pitch: f32, velocity: u8 },
    /// Pitch change on a sounding voice (pitch bend).
    Pitch { voice: u32, pitch: f32 },
    /// Aftertouch, normalized to 0.0-1.0.
    Pressure { voice: u32, value: f32 },
    /// Mark the voice inactive; oscillators render silence.
    Silence { voice: u32 },
    /// New settings for the output limiter.
    Limiter(LimiterParams),
}

/// Non-blocking source of messages, drained at the start of a render block.
pub trait MessageReceiver<T> {
    fn pop(&mut self) -> Option<T>;
}

impl<T> MessageReceiver<T> for Consumer<T> {
    fn pop(&mut self) -> Option<T> {
        Consumer::pop(self).ok()
    }
}

impl<T> MessageReceiver<T> for VecDeque<T> {
    fn pop(&mut self) -> Option<T> {
        self.pop_front()
    }
}

/// Non-blocking message destination. Never blocks and never waits for space.
pub trait MessageSender<T> {
    fn send(&mut self, msg: T) -> Result<(), PushError<T>>;
}

impl<T> MessageSender<T> for Producer<T> {
    fn send(&mut self, msg: T) -> Result<(), PushError<T>> {
        self.push(msg)
    }
}

/// Unbounded sink used by tests and offline tooling.
impl<T> MessageSender<T> for Vec<T> {
    fn send(&mut self, msg: T) -> Result<(), PushError<T>> {
        self.push(msg);
        Ok(())
    }
}
