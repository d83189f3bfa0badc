//! Raw MIDI byte decoding.
//!
//! The capture collaborator hands us the raw bytes of one message; this
//! module turns them into a typed [`MidiMessage`] and, for the subset the
//! engine consumes, into a [`NoteEvent`]. Decoding rules:
//!
//! - status ≥ `0xF8` (real-time: clock, start, stop, active sensing) is
//!   skipped; these are single-byte messages interleaved anywhere;
//! - `0x90` with velocity 0 is reinterpreted as a note-off (the MIDI
//!   running-status convention many keyboards use);
//! - pitch bend is 14-bit little-endian, centered by subtracting 8192 to
//!   the range −8192..=8191.

use crate::io::events::NoteEvent;

/// A decoded channel-voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    PolyAftertouch { channel: u8, note: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    PitchBend { channel: u8, value: i16 },
}

/// Decode one MIDI message from raw bytes. Returns `None` for real-time
/// bytes, truncated messages, or unknown status values.
pub fn decode(bytes: &[u8]) -> Option<MidiMessage> {
    let &status = bytes.first()?;

    // Single-byte real-time messages are skipped by default.
    if status >= 0xF8 {
        return None;
    }

    let channel = status & 0x0F;
    match status & 0xF0 {
        0x80 => Some(MidiMessage::NoteOff {
            channel,
            note: *bytes.get(1)?,
            velocity: *bytes.get(2)?,
        }),
        0x90 => {
            let note = *bytes.get(1)?;
            let velocity = *bytes.get(2)?;
            if velocity == 0 {
                // Running-status convention: NoteOn with velocity 0 is a
                // note-off.
                Some(MidiMessage::NoteOff {
                    channel,
                    note,
                    velocity,
                })
            } else {
                Some(MidiMessage::NoteOn {
                    channel,
                    note,
                    velocity,
                })
            }
        }
        0xA0 => Some(MidiMessage::PolyAftertouch {
            channel,
            note: *bytes.get(1)?,
            pressure: *bytes.get(2)?,
        }),
        0xB0 => Some(MidiMessage::ControlChange {
            channel,
            controller: *bytes.get(1)?,
            value: *bytes.get(2)?,
        }),
        0xC0 => Some(MidiMessage::ProgramChange {
            channel,
            program: *bytes.get(1)?,
        }),
        0xD0 => Some(MidiMessage::ChannelPressure {
            channel,
            pressure: *bytes.get(1)?,
        }),
        0xE0 => {
            let lsb = *bytes.get(1)? as i16;
            let msb = *bytes.get(2)? as i16;
            Some(MidiMessage::PitchBend {
                channel,
                value: ((msb << 7) | lsb) - 8192,
            })
        }
        _ => None,
    }
}

impl MidiMessage {
    /// The engine-facing note event, for the message kinds that carry one.
    pub fn to_note_event(self) -> Option<NoteEvent> {
        match self {
            MidiMessage::NoteOn { note, velocity, .. } => Some(NoteEvent::note_on(note, velocity)),
            MidiMessage::NoteOff { note, .. } => Some(NoteEvent::note_off(note)),
            _ => None,
        }
    }

    /// Pitch bend normalized to [-1, 1].
    pub fn bend_normalized(self) -> Option<f32> {
        match self {
            MidiMessage::PitchBend { value, .. } => Some(value as f32 / 8192.0),
            _ => None,
        }
    }
}
