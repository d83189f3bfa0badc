//! Polyphonic wavetable synthesizer core.
//!
//! `polywave` turns a stream of note and parameter events into blocks of
//! floating-point audio. The crate is organized in three layers:
//!
//! - [`dsp`]: allocation-free signal-processing primitives: fixed-point
//!   phase math, mipmapped wavetables, noise, the ADSR envelope, and the
//!   filter cores. These have no knowledge of voices or threads.
//! - [`synth`]: the engine itself: wavetable oscillators, per-voice filter banks,
//!   the modulation matrix, the voice pool, parameter bindings, and the
//!   block processor that the audio callback drives.
//! - [`io`]: the seams to the outside world: event types, the lock-free
//!   SPSC queues that carry them onto the audio thread, raw MIDI decoding,
//!   and the computer-keyboard note mapping.
//!
//! The audio thread contract is strict: [`Engine::process_block`] never
//! allocates, never blocks, never logs, and never fails. Everything it
//! touches is sized at startup; the only cross-thread traffic is the pair
//! of SPSC queues handed out by [`Engine::new`].
//!
//! ```
//! use polywave::dsp::wavetable::WavetableBank;
//! use polywave::io::events::NoteEvent;
//! use polywave::Engine;
//!
//! let (mut engine, mut handles) = Engine::new(48_000.0);
//! engine.load_bank(WavetableBank::saw("saw").unwrap()).unwrap();
//! engine.osc1.set_bank(engine.bank("saw"));
//!
//! handles.notes.push(NoteEvent::note_on(69, 100));
//!
//! let mut left = [0.0f32; 256];
//! let mut right = [0.0f32; 256];
//! engine.process_block(&mut [&mut left[..], &mut right[..]]);
//! ```

pub mod dsp;
pub mod error;
pub mod io;
pub mod synth;

pub use error::SynthError;
pub use synth::engine::{Engine, EngineHandles};

/// Fixed size of the voice pool. Voices are created at engine
/// initialization and never destroyed before teardown.
pub const MAX_VOICES: usize = 8;

/// Largest block the engine will render in one call. The scratch buffer is
/// sized to this at startup; callers with bigger driver buffers split them.
pub const MAX_BLOCK_SIZE: usize = 512;

/// Sample rate assumed when none is supplied.
pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;
