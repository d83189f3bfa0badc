//! 32-bit fixed-point phase and interpolated table reads.

/*
Fixed-Point Phase
=================

Oscillator phase is a 32-bit unsigned integer covering exactly one table
cycle:

    bits 31..21   table index   (11 bits → 2048 entries)
    bits 20..0    fraction      (21 bits → interpolation weight)

Why fixed point instead of a float phase?

  - Wrapping is free. `phase + increment` overflows a u32 exactly when the
    waveform wraps, so there is no `rem_euclid` or branch in the hot loop.
  - The index and fraction fall out of shifts and masks, never a floor().
  - Phase never loses precision as it grows: a float phase accumulates
    rounding error over minutes of playback, a u32 is exact modulo 2^32.

The same wrap gives us FM for free: a phase *offset* is just another u32
added on before the read. Negative displacements arrive as two's-complement
values and wrap backwards correctly.

Conversions happen at note-on (or block rate), not per sample, and go
through f64 so the 32-bit result keeps full precision:

    fixed_increment = (increment / TABLE_SIZE) * 2^32
*/

/// Entries per wavetable. Must stay a power of two: every table read relies
/// on `& TABLE_MASK` instead of a bounds check.
pub const TABLE_SIZE: usize = 2048;

/// Mip levels per wavetable frame. Covers ~11 octaves; MIDI 0–127 spans
/// about 10.5.
pub const MAX_MIP_LEVELS: usize = 11;

/// Bits of fraction below the table index: `32 - log2(TABLE_SIZE)`.
pub const PHASE_SHIFT: u32 = 21;

/// Mask wrapping a table index into `0..TABLE_SIZE`.
pub const TABLE_MASK: u32 = TABLE_SIZE as u32 - 1;

/// Mask selecting the fractional phase bits.
pub const FRAC_MASK: u32 = (1 << PHASE_SHIFT) - 1;

/// Scale turning masked fraction bits into `[0, 1)`.
pub const FRAC_SCALE: f32 = 1.0 / (1u32 << PHASE_SHIFT) as f32;

/// Convert a phase increment in table positions per sample to fixed-point
/// phase units per sample.
#[inline]
pub fn to_fixed_phase_inc(increment: f32) -> u32 {
    (increment as f64 / TABLE_SIZE as f64 * 4_294_967_296.0) as u32
}

/// Convert a signed offset in whole cycles (e.g. an FM displacement of
/// ±0.25 of the waveform) to a wrapping fixed-point offset. Negative input
/// becomes the two's-complement equivalent, so adding the result to a phase
/// moves it backwards.
#[inline]
pub fn to_fixed_phase_offset(cycles: f32) -> u32 {
    (cycles as f64 * 4_294_967_296.0) as i64 as u32
}

/// Read a table at a fixed-point phase with linear interpolation.
///
/// Branch-free: the neighbor index wraps through `TABLE_MASK`, so no bounds
/// check is needed and none is emitted.
#[inline]
pub fn read_table(table: &[f32; TABLE_SIZE], phase: u32) -> f32 {
    let ia = (phase >> PHASE_SHIFT) as usize;
    let ib = (((phase >> PHASE_SHIFT) + 1) & TABLE_MASK) as usize;
    let frac = (phase & FRAC_MASK) as f32 * FRAC_SCALE;

    table[ia] + frac * (table[ib] - table[ia])
}
