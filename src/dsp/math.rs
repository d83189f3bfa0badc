//! Pitch, gain, and fast-approximation helpers.
//!
//! Two tiers live here. The accurate conversions (`midi_note_to_freq`,
//! `note_name_to_midi`, the dB helpers) run at note-on or setup rate and
//! use `std` float math. The `fast_*` approximations run inside the
//! per-sample loop where an exact `exp2`/`log2` would dominate the voice
//! cost; both are good to ~1e-4 relative error, far below audibility.

/// Frequency of A4, the reference for all MIDI pitch math.
pub const A4_FREQ: f32 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI: i32 = 69;

/// Convert a MIDI note number to a frequency in Hz (equal temperament).
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    semitones_to_freq(note as i32 - A4_MIDI)
}

/// Frequency of the note `semitones` away from A4.
#[inline]
pub fn semitones_to_freq(semitones: i32) -> f32 {
    A4_FREQ * 2.0_f32.powf(semitones as f32 / 12.0)
}

/// Fast `2^x` approximation.
///
/// Fourth-order polynomial on the fractional part, then the integer part is
/// added straight into the float exponent bits. Exact at integer inputs,
/// ~1e-4 relative error elsewhere. Used for per-sample pitch and cutoff
/// modulation where the argument is a small semitone/octave offset.
#[inline]
pub fn fast_exp2(x: f32) -> f32 {
    let xi = x.floor();
    let xf = x - xi;

    let p = 1.0
        + xf * (0.693_147_2 + xf * (0.240_226_5 + xf * (0.055_504_1 + xf * 0.009_618_1)));

    f32::from_bits((p.to_bits() as i32 + ((xi as i32) << 23)) as u32)
}

/// Fast `log2(x)` approximation for positive finite `x`.
///
/// Reads the float's exponent directly from its bit pattern; the mantissa
/// contributes a linear remainder. Worst-case error is ~0.06, plenty for
/// mip selection, where an error of 0.06 shifts a crossfade weight by 6%
/// between two tables that already overlap in content.
#[inline]
pub fn fast_log2(x: f32) -> f32 {
    (x.to_bits() as f32) * (1.0 / (1 << 23) as f32) - 126.942_695
}

/// Convert a semitone offset to a frequency ratio via [`fast_exp2`].
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    fast_exp2(semitones / 12.0)
}

/// Convert decibels to a linear gain factor.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear gain factor to decibels. Non-positive input maps to
/// `f32::MIN` (effectively silence).
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return f32::MIN;
    }
    20.0 * linear.log10()
}

/// Parse a note name like `"C4"`, `"F#3"`, or `"Bb5"` into a MIDI note
/// number. Returns `None` for anything malformed or outside 0..=127.
///
/// Octave numbering follows the MIDI convention where C4 = 60.
pub fn note_name_to_midi(name: &str) -> Option<u8> {
    let mut chars = name.chars();

    let letter = chars.next()?.to_ascii_uppercase();
    let base = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut rest: &str = chars.as_str();
    let mut semitone: i32 = base;
    if let Some(stripped) = rest.strip_prefix('#') {
        semitone += 1;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('b') {
        semitone -= 1;
        rest = stripped;
    }

    let octave: i32 = rest.parse().ok()?;
    if !(0..=9).contains(&octave) {
        return None;
    }

    let midi = (octave + 1) * 12 + semitone;
    u8::try_from(midi).ok().filter(|&n| n <= 127)
}
