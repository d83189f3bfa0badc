//! Low-level DSP primitives used by the synth layer.
//!
//! Everything here is allocation-free and realtime-safe: plain math on
//! plain data, no I/O, no locks. The synth layer owns the per-voice
//! bookkeeping and calls down into these for the actual signal processing.

/// ADSR envelope parameters and per-voice state machine.
pub mod envelope;
/// State-variable and ladder filter cores.
pub mod filter;
/// Pitch, gain, and fast-approximation math helpers.
pub mod math;
/// White and pink noise generation.
pub mod noise;
/// 32-bit fixed-point phase and interpolated table reads.
pub mod phase;
/// Mipmapped wavetable frames, banks, and the bank registry.
pub mod wavetable;
