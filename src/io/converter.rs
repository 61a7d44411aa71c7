use crate::{
    config::EngineConfig,
    dsp::oscillator::midi_note_to_pitch,
    graph::events::{EventSink, VoiceEvent},
    io::midi::{MidiEvent, CC_ALL_NOTES_OFF, CC_ALL_SOUND_OFF},
    synth::{
        allocator::VoiceAllocator,
        message::{CvMessage, MessageSender},
    },
    MAX_VOICES,
};

/// What the translator did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiOutcome {
    Handled,
    /// Wrong channel, unknown key or unsupported message.
    Ignored,
    /// CC 120: the owner should silence every voice immediately.
    AllSoundOff,
}

/// Translates MIDI events into voice allocations, gate events and pitch CV.
///
/// Owns the key → voice mapping. Gate transitions are announced through the
/// allocator's gate port so downstream consumers see them in order with any
/// force-release caused by stealing.
pub struct MidiToCv {
    channel: Option<u8>,
    bend_range_semitones: f32,
    /// (channel, key) currently sounding on each voice.
    voice_keys: [Option<(u8, u8)>; MAX_VOICES],
    /// Current bend per channel, in volts.
    bend: [f32; 16],
}

impl MidiToCv {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            channel: config.midi_channel,
            bend_range_semitones: config.bend_range_semitones,
            voice_keys: [None; MAX_VOICES],
            bend: [0.0; 16],
        }
    }

    pub fn handle<S, C>(
        &mut self,
        event: MidiEvent,
        allocator: &mut VoiceAllocator<S>,
        cv: &mut C,
    ) -> MidiOutcome
    where
        S: EventSink,
        C: MessageSender<CvMessage>,
    {
        if let Some(channel) = self.channel {
            if event.channel() != channel {
                log::trace!("ignoring {event:?} outside channel {channel}");
                return MidiOutcome::Ignored;
            }
        }

        match event {
            MidiEvent::NoteOn {
                channel,
                key,
                velocity: 0,
            } => self.note_off(channel, key, allocator),
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } => self.note_on(channel, key, velocity, allocator, cv),
            MidiEvent::NoteOff { channel, key, .. } => self.note_off(channel, key, allocator),
            MidiEvent::ControlChange {
                controller: CC_ALL_NOTES_OFF,
                ..
            } => {
                self.all_notes_off(allocator);
                MidiOutcome::Handled
            }
            MidiEvent::ControlChange {
                controller: CC_ALL_SOUND_OFF,
                ..
            } => MidiOutcome::AllSoundOff,
            MidiEvent::PitchBend { channel, value } => {
                let bend = value.clamp(-8192, 8191) as f32 / 8192.0 * self.bend_range_semitones / 12.0;
                self.bend[channel_slot(channel)] = bend;
                for (voice, key) in self.sounding_on(channel) {
                    send(
                        cv,
                        CvMessage::Pitch {
                            voice,
                            pitch: midi_note_to_pitch(key) + bend,
                        },
                    );
                }
                MidiOutcome::Handled
            }
            MidiEvent::Aftertouch { channel, value } => {
                let value = value.min(127) as f32 / 127.0;
                for (voice, _) in self.sounding_on(channel) {
                    send(cv, CvMessage::Pressure { voice, value });
                }
                MidiOutcome::Handled
            }
            MidiEvent::PolyAftertouch {
                channel,
                key,
                value,
            } => match self.voice_for(channel, key) {
                Some(voice) => {
                    let value = value.min(127) as f32 / 127.0;
                    send(cv, CvMessage::Pressure { voice, value });
                    MidiOutcome::Handled
                }
                None => MidiOutcome::Ignored,
            },
            MidiEvent::ControlChange { .. } => {
                log::trace!("ignoring {event:?}");
                MidiOutcome::Ignored
            }
        }
    }

    /// Release every sounding note.
    pub fn all_notes_off<S: EventSink>(&mut self, allocator: &mut VoiceAllocator<S>) {
        for voice in 0..MAX_VOICES {
            if self.voice_keys[voice].take().is_some() {
                release_voice(voice as u32, allocator);
            }
        }
    }

    /// Forget every mapping without announcing anything (after a panic).
    pub fn reset(&mut self) {
        self.voice_keys = [None; MAX_VOICES];
    }

    pub fn voice_for(&self, channel: u8, key: u8) -> Option<u32> {
        self.voice_keys
            .iter()
            .position(|mapped| *mapped == Some((channel, key)))
            .map(|voice| voice as u32)
    }

    pub fn sounding_count(&self) -> usize {
        self.voice_keys.iter().filter(|k| k.is_some()).count()
    }

    fn note_on<S, C>(
        &mut self,
        channel: u8,
        key: u8,
        velocity: u8,
        allocator: &mut VoiceAllocator<S>,
        cv: &mut C,
    ) -> MidiOutcome
    where
        S: EventSink,
        C: MessageSender<CvMessage>,
    {
        if self.voice_for(channel, key).is_some() {
            self.note_off(channel, key, allocator);
        }

        let Some(voice) = allocator.allocate() else {
            log::debug!("no voices available for key {key}");
            return MidiOutcome::Ignored;
        };

        // A stolen voice's previous key is overwritten here.
        self.voice_keys[voice as usize] = Some((channel, key));

        let velocity = velocity.min(127);
        send(
            cv,
            CvMessage::NoteOn {
                voice,
                pitch: midi_note_to_pitch(key) + self.bend[channel_slot(channel)],
                velocity,
            },
        );
        allocator.announce(VoiceEvent::Gate {
            voice,
            on: true,
            velocity,
        });
        MidiOutcome::Handled
    }

    fn note_off<S: EventSink>(
        &mut self,
        channel: u8,
        key: u8,
        allocator: &mut VoiceAllocator<S>,
    ) -> MidiOutcome {
        let Some(voice) = self.voice_for(channel, key) else {
            return MidiOutcome::Ignored;
        };
        self.voice_keys[voice as usize] = None;
        release_voice(voice, allocator);
        MidiOutcome::Handled
    }

    fn sounding_on(&self, channel: u8) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.voice_keys
            .iter()
            .enumerate()
            .filter_map(move |(voice, mapped)| match *mapped {
                Some((ch, key)) if ch == channel => Some((voice as u32, key)),
                _ => None,
            })
    }
}

fn release_voice<S: EventSink>(voice: u32, allocator: &mut VoiceAllocator<S>) {
    allocator.note_off(voice);
    allocator.announce(VoiceEvent::Gate {
        voice,
        on: false,
        velocity: 0,
    });
}

fn channel_slot(channel: u8) -> usize {
    (channel.clamp(1, 16) - 1) as usize
}

fn send<C: MessageSender<CvMessage>>(cv: &mut C, msg: CvMessage) {
    if cv.send(msg).is_err() {
        log::warn!("cv queue full, dropped {msg:?}");
    }
}
