//! Event payloads carried from the input thread to the audio thread.
//!
//! Both types are small `Copy` values so the queue never touches the heap.
//! Parameter values travel normalized to [0, 1]; the engine's binding
//! table denormalizes them into each parameter's real range.

/// Kind discriminant for [`NoteEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEventKind {
    NoteOff,
    NoteOn,
}

/// A note-on or note-off. A `note` of 0 is treated as invalid and ignored
/// by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub kind: NoteEventKind,
    pub note: u8,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn note_on(note: u8, velocity: u8) -> Self {
        Self {
            kind: NoteEventKind::NoteOn,
            note,
            velocity,
        }
    }

    pub fn note_off(note: u8) -> Self {
        Self {
            kind: NoteEventKind::NoteOff,
            note,
            velocity: 0,
        }
    }
}

/// A normalized parameter change. `id` is the raw wire value of a
/// [`ParamId`](crate::synth::params::ParamId); unknown ids are ignored by
/// the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamEvent {
    pub id: u8,
    pub value: f32,
}

impl ParamEvent {
    pub fn new(id: u8, value: f32) -> Self {
        Self { id, value }
    }
}
