//! Per-voice wavetable oscillator with dual-mip, dual-frame interpolation.

/*
Reading One Sample
==================

Each oscillator read blends four table lookups:

                 mip A          mip B
    frame A      fAmA ────┐     fAmB ────┐
                          ├─ sA          ├─ sB ──→ lerp(sA, sB, mip frac)
    frame B      fBmA ────┘     fBmB ────┘

  - The *mip* axis tracks pitch: `select_mip_level` turns the current phase
    increment into a continuous level (`log2(increment)`), and the
    fractional part crossfades adjacent mips so pitch sweeps never click at
    level boundaries. Two reads per mip × two mips costs the same as cubic
    interpolation at a single mip, but stays correct under per-sample pitch
    modulation.
  - The *frame* axis is the scan position: [0, 1] mapped onto the bank's
    frames, blending adjacent frames for wavetable morphing. Single-frame
    banks skip this axis entirely.

FM arrives as a fixed-point phase displacement added to the voice's phase
before the read. The u32 add wraps; negative displacements arrive as
two's-complement values and wrap backwards (see `dsp::phase`).

The oscillator is a structure of arrays: configuration is engine-wide,
while phase and increment are per-voice slots indexed by voice id. Voices
own nothing.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::dsp::math::{self, fast_log2};
use crate::dsp::phase::{self, MAX_MIP_LEVELS, TABLE_SIZE};
use crate::dsp::wavetable::WavetableBank;
use crate::MAX_VOICES;

/// Which oscillator's output feeds this oscillator's phase-modulation
/// input. Sources are read in processing order (osc1 → osc2 → osc3 → sub):
/// a source earlier in the chain contributes its current sample, a source
/// at or after the reader contributes its previous one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FmSource {
    #[default]
    None,
    Osc1,
    Osc2,
    Osc3,
    Sub,
}

/// Everything configurable about one oscillator slot. Applied wholesale
/// via [`WavetableOscillator::update_config`] or field-by-field through
/// parameter bindings.
#[derive(Clone)]
pub struct OscConfig {
    pub bank: Option<Arc<WavetableBank>>,
    pub scan_position: f32,
    pub mix_level: f32,
    pub fm_depth: f32,
    pub fm_source: FmSource,
    pub octave_offset: i8,
    pub detune_cents: f32,
    pub enabled: bool,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            bank: None,
            scan_position: 0.0,
            mix_level: 1.0,
            fm_depth: 0.0,
            fm_source: FmSource::None,
            octave_offset: 0,
            detune_cents: 0.0,
            enabled: true,
        }
    }
}

/// One oscillator slot: engine-wide settings plus per-voice hot state.
pub struct WavetableOscillator {
    // Per-voice hot data (SoA)
    phases: [u32; MAX_VOICES],
    phase_increments: [f32; MAX_VOICES],
    // Pre-mix sample from the voice's most recent read; this is what FM
    // taps, so a mixed-out oscillator can still act as a modulator.
    raw_outputs: [f32; MAX_VOICES],

    // Settings shared by all voices of this slot
    pub bank: Option<Arc<WavetableBank>>,
    pub scan_position: f32,
    pub mix_level: f32,
    pub fm_depth: f32,
    pub fm_source: FmSource,
    pub octave_offset: i8,
    pub detune_cents: f32,
    pub enabled: bool,
}

impl WavetableOscillator {
    pub fn new() -> Self {
        Self {
            phases: [0; MAX_VOICES],
            phase_increments: [0.0; MAX_VOICES],
            raw_outputs: [0.0; MAX_VOICES],
            bank: None,
            scan_position: 0.0,
            mix_level: 1.0,
            fm_depth: 0.0,
            fm_source: FmSource::None,
            octave_offset: 0,
            detune_cents: 0.0,
            enabled: true,
        }
    }

    pub fn update_config(&mut self, config: &OscConfig) {
        self.bank = config.bank.clone();
        self.scan_position = config.scan_position;
        self.mix_level = config.mix_level;
        self.fm_depth = config.fm_depth;
        self.fm_source = config.fm_source;
        self.octave_offset = config.octave_offset;
        self.detune_cents = config.detune_cents;
        self.enabled = config.enabled;
    }

    pub fn set_bank(&mut self, bank: Option<Arc<WavetableBank>>) {
        self.bank = bank;
    }

    /// Reset a voice slot for a fresh note: phase to zero, increment from
    /// the note frequency with this slot's octave and detune applied.
    pub fn init_voice(&mut self, voice: usize, midi_note: u8, sample_rate: f32) {
        let offset_octaves = self.octave_offset as f32 + self.detune_cents / 1200.0;
        let freq = math::midi_note_to_freq(midi_note) * 2.0_f32.powf(offset_octaves);

        self.phases[voice] = 0;
        self.phase_increments[voice] = TABLE_SIZE as f32 * freq / sample_rate;
        self.raw_outputs[voice] = 0.0;
    }

    /// Base phase increment (table positions per sample) for a voice.
    #[inline]
    pub fn phase_increment(&self, voice: usize) -> f32 {
        self.phase_increments[voice]
    }

    /// Read one sample and advance the voice's phase.
    ///
    /// `pitch_ratio` scales the stored increment (pitch bend + pitch
    /// modulation, already converted from semitones), `scan_offset` is
    /// added to the configured scan position, `fm_phase_offset` is the
    /// fixed-point FM displacement. Disabled oscillators return 0 without
    /// advancing phase.
    #[inline]
    pub fn next_sample(
        &mut self,
        voice: usize,
        pitch_ratio: f32,
        scan_offset: f32,
        fm_phase_offset: u32,
    ) -> f32 {
        if !self.enabled {
            self.raw_outputs[voice] = 0.0;
            return 0.0;
        }
        let Some(bank) = &self.bank else {
            self.raw_outputs[voice] = 0.0;
            return 0.0;
        };

        let increment = self.phase_increments[voice] * pitch_ratio;
        let mip = select_mip_level(increment);
        let scan = (self.scan_position + scan_offset).clamp(0.0, 1.0);

        let sample = read_blended(bank, self.phases[voice].wrapping_add(fm_phase_offset), mip, scan);

        self.phases[voice] = self.phases[voice].wrapping_add(phase::to_fixed_phase_inc(increment));
        self.raw_outputs[voice] = sample;

        sample * self.mix_level
    }

    /// Pre-mix sample from the voice's most recent read, for FM sources.
    #[inline]
    pub fn raw_output(&self, voice: usize) -> f32 {
        self.raw_outputs[voice]
    }
}

impl Default for WavetableOscillator {
    fn default() -> Self {
        Self::new()
    }
}

/// Continuous mip level for a phase increment: integer part selects mip A,
/// the fraction blends toward mip A + 1. One octave up doubles the
/// increment and adds exactly one level.
///
/// Clamped to `MAX_MIP_LEVELS - 2` so the blend partner never runs off the
/// end of the mip array.
#[inline]
pub fn select_mip_level(phase_increment: f32) -> f32 {
    if phase_increment <= 1.0 {
        return 0.0;
    }
    fast_log2(phase_increment).clamp(0.0, (MAX_MIP_LEVELS - 2) as f32)
}

/// Four-point bilinear table read: (frame A/B) × (mip A/B).
#[inline]
fn read_blended(bank: &WavetableBank, phase: u32, mip: f32, scan: f32) -> f32 {
    let mip_a = mip as usize;
    let mip_b = mip_a + 1;
    let mip_frac = mip - mip_a as f32;

    let frame_count = bank.frame_count();

    // Single-frame fast path: no frame axis to blend.
    if frame_count == 1 {
        let frame = bank.frame(0);
        let sa = phase::read_table(frame.mip(mip_a), phase);
        let sb = phase::read_table(frame.mip(mip_b), phase);
        return sa + mip_frac * (sb - sa);
    }

    let scan_f = scan * (frame_count - 1) as f32;
    let frame_a = (scan_f as usize).min(frame_count - 2);
    let frame_b = frame_a + 1;
    let frame_frac = scan_f - frame_a as f32;

    let fa = bank.frame(frame_a);
    let fb = bank.frame(frame_b);

    let fa_ma = phase::read_table(fa.mip(mip_a), phase);
    let fb_ma = phase::read_table(fb.mip(mip_a), phase);
    let fa_mb = phase::read_table(fa.mip(mip_b), phase);
    let fb_mb = phase::read_table(fb.mip(mip_b), phase);

    let sa = fa_ma + frame_frac * (fb_ma - fa_ma); // frame lerp at mip A
    let sb = fa_mb + frame_frac * (fb_mb - fa_mb); // frame lerp at mip B
    sa + mip_frac * (sb - sa) // mip lerp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_osc() -> WavetableOscillator {
        let mut osc = WavetableOscillator::new();
        osc.set_bank(Some(Arc::new(WavetableBank::sine("sine").unwrap())));
        osc
    }

    #[test]
    fn config_applies_wholesale() {
        let mut osc = WavetableOscillator::new();
        osc.update_config(&OscConfig {
            bank: Some(Arc::new(WavetableBank::sine("sine").unwrap())),
            scan_position: 0.25,
            mix_level: 0.5,
            fm_source: FmSource::Osc2,
            octave_offset: -1,
            detune_cents: 12.0,
            ..OscConfig::default()
        });

        assert!(osc.bank.is_some());
        assert_eq!(osc.scan_position, 0.25);
        assert_eq!(osc.mix_level, 0.5);
        assert_eq!(osc.fm_source, FmSource::Osc2);
        assert_eq!(osc.octave_offset, -1);
        assert!(osc.enabled, "config defaults leave the slot enabled");
    }

    #[test]
    fn note_on_sets_expected_increment() {
        let mut osc = sine_osc();
        osc.init_voice(0, 69, 48_000.0);
        let expected = 2048.0 * 440.0 / 48_000.0;
        assert!((osc.phase_increment(0) - expected).abs() < 1e-3);
    }

    #[test]
    fn octave_offset_doubles_increment() {
        let mut osc = sine_osc();
        osc.init_voice(0, 69, 48_000.0);
        let base = osc.phase_increment(0);

        osc.octave_offset = 1;
        osc.init_voice(1, 69, 48_000.0);
        assert!((osc.phase_increment(1) / base - 2.0).abs() < 1e-4);
    }

    #[test]
    fn detune_cents_shift_increment() {
        let mut osc = sine_osc();
        osc.init_voice(0, 69, 48_000.0);
        let base = osc.phase_increment(0);

        osc.detune_cents = 1200.0;
        osc.init_voice(1, 69, 48_000.0);
        assert!((osc.phase_increment(1) / base - 2.0).abs() < 1e-4);
    }

    #[test]
    fn disabled_returns_zero_and_holds_phase() {
        let mut osc = sine_osc();
        osc.init_voice(0, 69, 48_000.0);
        osc.enabled = false;

        let before = osc.phases[0];
        for _ in 0..16 {
            assert_eq!(osc.next_sample(0, 1.0, 0.0, 0), 0.0);
        }
        assert_eq!(osc.phases[0], before, "disabled oscillator must not advance");
    }

    #[test]
    fn missing_bank_is_silent() {
        let mut osc = WavetableOscillator::new();
        osc.init_voice(0, 69, 48_000.0);
        assert_eq!(osc.next_sample(0, 1.0, 0.0, 0), 0.0);
    }

    #[test]
    fn renders_a_sine_at_note_frequency() {
        let sr = 48_000.0;
        let mut osc = sine_osc();
        osc.mix_level = 1.0;
        osc.init_voice(0, 69, sr);

        for i in 0..4096 {
            let expected = (std::f32::consts::TAU * 440.0 * i as f32 / sr).sin();
            let got = osc.next_sample(0, 1.0, 0.0, 0);
            assert!(
                (got - expected).abs() < 0.01,
                "sample {i}: got {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn mip_selection_tracks_octaves() {
        assert_eq!(select_mip_level(0.5), 0.0);
        assert_eq!(select_mip_level(1.0), 0.0);

        let at_16 = select_mip_level(16.0);
        assert!((at_16 - 4.0).abs() < 0.1, "log2(16) ≈ 4, got {at_16}");

        let doubled = select_mip_level(32.0);
        assert!((doubled - at_16 - 1.0).abs() < 0.01, "octave up = one level up");

        // Never exceeds the last valid blend pair.
        assert!(select_mip_level(1e9) <= (MAX_MIP_LEVELS - 2) as f32);
    }

    #[test]
    fn fm_offset_shifts_the_read_position() {
        let mut osc = sine_osc();
        osc.init_voice(0, 69, 48_000.0);

        // Quarter-cycle displacement turns sin into cos at phase 0.
        let offset = phase::to_fixed_phase_offset(0.25);
        let shifted = osc.next_sample(0, 1.0, 0.0, offset);
        assert!((shifted - 1.0).abs() < 1e-3, "expected cos(0) = 1, got {shifted}");
    }

    #[test]
    fn scan_position_morphs_between_frames() {
        let mut bank = WavetableBank::new(2, "two").unwrap();
        bank.frame_mut(0).fill_from_harmonics(&[1.0]);
        bank.frame_mut(1).fill_from_harmonics(&[0.0, 1.0]); // octave partial

        let mut osc = WavetableOscillator::new();
        osc.set_bank(Some(Arc::new(bank)));
        osc.init_voice(0, 60, 48_000.0);

        // Mid-scan at phase 1/8 cycle: average of sin(π/4) and sin(π/2).
        osc.scan_position = 0.5;
        let offset = phase::to_fixed_phase_offset(0.125);
        let got = osc.next_sample(0, 1.0, 0.0, offset);
        let expected = 0.5 * (std::f32::consts::FRAC_PI_4.sin() + 1.0);
        assert!((got - expected).abs() < 1e-3, "got {got}, expected {expected}");
    }

    #[test]
    fn mix_level_scales_output() {
        let mut osc = sine_osc();
        osc.mix_level = 0.5;
        osc.init_voice(0, 69, 48_000.0);

        let offset = phase::to_fixed_phase_offset(0.25);
        let got = osc.next_sample(0, 1.0, 0.0, offset);
        assert!((got - 0.5).abs() < 1e-3);
    }
}
