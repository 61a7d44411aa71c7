#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Canonical MIDI vocabulary handed to the control domain.
///
/// Channels are 1-16. Data values keep their MIDI ranges: keys, velocities
/// and controller values 0-127, pitch bend -8192..=8191.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: Option<u8> },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
    /// Channel aftertouch.
    Aftertouch { channel: u8, value: u8 },
    PolyAftertouch { channel: u8, key: u8, value: u8 },
}

/// CC 120: silence everything immediately.
pub const CC_ALL_SOUND_OFF: u8 = 120;
/// CC 123: release every held note.
pub const CC_ALL_NOTES_OFF: u8 = 123;

impl MidiEvent {
    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::Aftertouch { channel, .. }
            | MidiEvent::PolyAftertouch { channel, .. } => channel,
        }
    }

    /// Decode a raw channel-voice message. Running status is not supported.
    ///
    /// ```
    /// use saavy_modular::io::midi::MidiEvent;
    ///
    /// let event = MidiEvent::from_bytes(&[0x91, 60, 100]);
    /// assert_eq!(event, Some(MidiEvent::NoteOn { channel: 2, key: 60, velocity: 100 }));
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = (status & 0x0F) + 1;
        let data1 = data.first().map(|b| b & 0x7F);
        let data2 = data.get(1).map(|b| b & 0x7F);

        let event = match status & 0xF0 {
            0x80 => MidiEvent::NoteOff {
                channel,
                key: data1?,
                velocity: data2,
            },
            0x90 => MidiEvent::NoteOn {
                channel,
                key: data1?,
                velocity: data2?,
            },
            0xA0 => MidiEvent::PolyAftertouch {
                channel,
                key: data1?,
                value: data2?,
            },
            0xB0 => MidiEvent::ControlChange {
                channel,
                controller: data1?,
                value: data2?,
            },
            0xD0 => MidiEvent::Aftertouch {
                channel,
                value: data1?,
            },
            0xE0 => {
                let raw = (data1? as i16) | ((data2? as i16) << 7);
                MidiEvent::PitchBend {
                    channel,
                    value: raw - 8192,
                }
            }
            _ => return None,
        };
        Some(event)
    }
}
