//! Scripted MIDI for the demo: a looping chord progression with a little
//! pitch bend, written as timestamped events.

use saavy_modular::io::midi::MidiEvent;

/// Seconds each chord lasts.
const CHORD_LENGTH: f64 = 2.0;
/// Fraction of the chord the keys are held for; the rest is release tail.
const GATE_FRACTION: f64 = 0.7;

#[derive(Debug, Clone, Copy)]
pub struct ScoreEvent {
    /// Seconds from the start of the loop.
    pub at: f64,
    pub event: MidiEvent,
}

/// A looping list of events sorted by time.
pub struct Score {
    events: Vec<ScoreEvent>,
    length: f64,
    cursor: usize,
    loop_start: f64,
}

impl Score {
    pub fn new(mut events: Vec<ScoreEvent>, length: f64) -> Self {
        events.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self {
            events,
            length: length.max(f64::EPSILON),
            cursor: 0,
            loop_start: 0.0,
        }
    }

    /// Events due up to `elapsed` seconds since playback started.
    pub fn due(&mut self, elapsed: f64) -> Vec<MidiEvent> {
        let mut due = Vec::new();
        loop {
            let local = elapsed - self.loop_start;
            while let Some(next) = self.events.get(self.cursor) {
                if next.at > local {
                    break;
                }
                due.push(next.event);
                self.cursor += 1;
            }
            if local < self.length {
                return due;
            }
            self.cursor = 0;
            self.loop_start += self.length;
        }
    }

    /// Position inside the current loop, 0.0 - 1.0.
    pub fn progress(&self, elapsed: f64) -> f64 {
        ((elapsed - self.loop_start) / self.length).clamp(0.0, 1.0)
    }

    pub fn length(&self) -> f64 {
        self.length
    }
}

/// Cmaj7 → Am7 → Fmaj7 → G7, with a bend on the last chord.
pub fn demo() -> Score {
    let chords: [&[u8]; 4] = [
        &[48, 60, 64, 67, 71],
        &[45, 57, 60, 64, 67],
        &[41, 57, 60, 65, 69],
        &[43, 55, 59, 62, 65],
    ];

    let mut events = Vec::new();
    for (i, chord) in chords.iter().enumerate() {
        let start = i as f64 * CHORD_LENGTH;
        let end = start + CHORD_LENGTH * GATE_FRACTION;
        for (n, &key) in chord.iter().enumerate() {
            // Slight strum.
            let at = start + n as f64 * 0.02;
            events.push(ScoreEvent {
                at,
                event: MidiEvent::NoteOn {
                    channel: 1,
                    key,
                    velocity: 90 - n as u8 * 6,
                },
            });
            events.push(ScoreEvent {
                at: end,
                event: MidiEvent::NoteOff {
                    channel: 1,
                    key,
                    velocity: None,
                },
            });
        }
    }

    let bend_start = 3.0 * CHORD_LENGTH + 0.3;
    for step in 0..=10 {
        let value = (step as f64 / 10.0 * 4096.0) as i16;
        events.push(ScoreEvent {
            at: bend_start + step as f64 * 0.05,
            event: MidiEvent::PitchBend { channel: 1, value },
        });
    }
    events.push(ScoreEvent {
        at: 4.0 * CHORD_LENGTH - 0.05,
        event: MidiEvent::PitchBend {
            channel: 1,
            value: 0,
        },
    });

    Score::new(events, chords.len() as f64 * CHORD_LENGTH)
}
