// Purpose: external interfaces. Event types, the lock-free queues that
// carry them onto the audio thread, raw MIDI decoding, and the computer
// keyboard note mapping.

pub mod events;
pub mod keys;
pub mod midi;
pub mod queue;
