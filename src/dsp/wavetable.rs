//! Mipmapped wavetable frames, banks, and the bank registry.

/*
Wavetables and Mipmaps
======================

A wavetable frame is one single-cycle waveform stored at 11 "mip" levels.
Level 0 carries the full harmonic content; each level above it has the top
octave of harmonics removed:

    level 0   harmonics up to table Nyquist (1024)
    level 1   harmonics up to 512
    level 2   harmonics up to 256
    ...
    level 10  fundamental only

Why? Reading a full-band table at high pitch aliases: harmonics that land
above the output Nyquist fold back down as inharmonic junk. Playing one
octave higher doubles the phase increment, so the oscillator picks the mip
whose content still fits; `mip = log2(phase_increment)` tracks pitch
exactly. The fractional part crossfades two adjacent mips so sweeps don't
click at level boundaries.

A bank is an ordered sequence of frames plus a display name. Multi-frame
banks morph: the oscillator's scan position selects (and blends between)
adjacent frames. Banks are built once on the setup thread and immutable
afterwards, so the audio thread reads them without synchronization:
publication is causal through the `Arc` handed to the oscillator config.

Frames are generated by additive resynthesis: a harmonic amplitude list is
summed into sines per mip, dropping every partial the mip's band no longer
admits. This is how the classic shapes (saw, square, triangle) get their
band-limited tables too; the per-sample loop never needs polynomial
correction tricks because the tables are clean by construction.
*/

use std::sync::Arc;

use crate::dsp::phase::{MAX_MIP_LEVELS, TABLE_SIZE};
use crate::error::SynthError;

/// Most frames a single bank may hold.
pub const MAX_FRAMES: usize = 256;

/// Longest allowed display name, in bytes.
pub const MAX_BANK_NAME_LEN: usize = 64;

/// Most banks the registry will accept.
pub const MAX_REGISTRY_BANKS: usize = 32;

/// One single-cycle waveform at every mip level.
#[derive(Debug)]
pub struct WavetableFrame {
    mips: Box<[[f32; TABLE_SIZE]; MAX_MIP_LEVELS]>,
}

impl WavetableFrame {
    fn silent() -> Self {
        Self {
            mips: Box::new([[0.0; TABLE_SIZE]; MAX_MIP_LEVELS]),
        }
    }

    /// Table for one mip level.
    #[inline]
    pub fn mip(&self, level: usize) -> &[f32; TABLE_SIZE] {
        &self.mips[level]
    }

    /// Fill every mip of this frame from a harmonic amplitude list.
    ///
    /// `harmonics[n]` is the amplitude of partial `n + 1`. Each mip level
    /// keeps only the partials inside its band limit (`table Nyquist /
    /// 2^level`), so the frame is alias-free by construction at every
    /// level. The top level keeps just the fundamental.
    pub fn fill_from_harmonics(&mut self, harmonics: &[f32]) {
        for level in 0..MAX_MIP_LEVELS {
            let band_limit = (TABLE_SIZE / 2) >> level;
            let table = &mut self.mips[level];
            table.fill(0.0);

            for (n, &amp) in harmonics.iter().enumerate() {
                let partial = n + 1;
                if partial > band_limit || amp == 0.0 {
                    continue;
                }
                let w = std::f64::consts::TAU * partial as f64 / TABLE_SIZE as f64;
                for (k, sample) in table.iter_mut().enumerate() {
                    *sample += amp * ((w * k as f64).sin() as f32);
                }
            }
        }
    }
}

/// An ordered sequence of frames with a display name.
///
/// Contents are written once at construction and read-only during audio
/// processing. Oscillators hold an `Arc` to the bank; the frame storage is
/// released when the last handle drops.
#[derive(Debug)]
pub struct WavetableBank {
    frames: Vec<WavetableFrame>,
    name: String,
}

impl WavetableBank {
    /// Create a bank of `frame_count` silent frames.
    ///
    /// Fails when `frame_count` is 0 or above [`MAX_FRAMES`], or the name
    /// exceeds [`MAX_BANK_NAME_LEN`] bytes.
    pub fn new(frame_count: usize, name: &str) -> Result<Self, SynthError> {
        if frame_count == 0 || frame_count > MAX_FRAMES {
            return Err(SynthError::InvalidFrameCount(frame_count));
        }
        if name.len() > MAX_BANK_NAME_LEN {
            return Err(SynthError::BankNameTooLong(name.to_string()));
        }

        let frames = (0..frame_count).map(|_| WavetableFrame::silent()).collect();
        Ok(Self {
            frames,
            name: name.to_string(),
        })
    }

    /// Single-frame pure sine bank.
    pub fn sine(name: &str) -> Result<Self, SynthError> {
        let mut bank = Self::new(1, name)?;
        bank.frames[0].fill_from_harmonics(&[1.0]);
        Ok(bank)
    }

    /// Single-frame sawtooth bank: every harmonic at `1/n`.
    pub fn saw(name: &str) -> Result<Self, SynthError> {
        let mut bank = Self::new(1, name)?;
        bank.frames[0].fill_from_harmonics(&saw_harmonics());
        Ok(bank)
    }

    /// Single-frame square bank: odd harmonics at `1/n`.
    pub fn square(name: &str) -> Result<Self, SynthError> {
        let mut bank = Self::new(1, name)?;
        bank.frames[0].fill_from_harmonics(&square_harmonics());
        Ok(bank)
    }

    /// Single-frame triangle bank: odd harmonics at `1/n²`, alternating sign.
    pub fn triangle(name: &str) -> Result<Self, SynthError> {
        let mut bank = Self::new(1, name)?;
        bank.frames[0].fill_from_harmonics(&triangle_harmonics());
        Ok(bank)
    }

    /// Four-frame morph bank: sine → triangle → square → saw. Handy for
    /// exercising scan-position modulation.
    pub fn morph(name: &str) -> Result<Self, SynthError> {
        let mut bank = Self::new(4, name)?;
        bank.frames[0].fill_from_harmonics(&[1.0]);
        bank.frames[1].fill_from_harmonics(&triangle_harmonics());
        bank.frames[2].fill_from_harmonics(&square_harmonics());
        bank.frames[3].fill_from_harmonics(&saw_harmonics());
        Ok(bank)
    }

    /// Display name used for registry lookups.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of frames in the bank (1..=256).
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn frame(&self, index: usize) -> &WavetableFrame {
        &self.frames[index]
    }

    /// Mutable frame access for setup-time population.
    pub fn frame_mut(&mut self, index: usize) -> &mut WavetableFrame {
        &mut self.frames[index]
    }
}

fn saw_harmonics() -> Vec<f32> {
    // 2/π normalization puts the fundamental near unit amplitude.
    (1..=(TABLE_SIZE / 2))
        .map(|n| (2.0 / std::f32::consts::PI) / n as f32)
        .collect()
}

fn square_harmonics() -> Vec<f32> {
    (1..=(TABLE_SIZE / 2))
        .map(|n| {
            if n % 2 == 1 {
                (4.0 / std::f32::consts::PI) / n as f32
            } else {
                0.0
            }
        })
        .collect()
}

fn triangle_harmonics() -> Vec<f32> {
    (1..=(TABLE_SIZE / 2))
        .map(|n| {
            if n % 2 == 1 {
                let sign = if n % 4 == 1 { 1.0 } else { -1.0 };
                sign * (8.0 / (std::f32::consts::PI * std::f32::consts::PI))
                    / (n * n) as f32
            } else {
                0.0
            }
        })
        .collect()
}

/// Engine-owned bank table: append-only during setup, read-only lookups
/// afterwards.
#[derive(Default)]
pub struct BankRegistry {
    banks: Vec<Arc<WavetableBank>>,
}

impl BankRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bank. Fails once [`MAX_REGISTRY_BANKS`] banks are held.
    pub fn register(&mut self, bank: Arc<WavetableBank>) -> Result<(), SynthError> {
        if self.banks.len() >= MAX_REGISTRY_BANKS {
            return Err(SynthError::RegistryFull);
        }
        tracing::debug!(name = bank.name(), frames = bank.frame_count(), "registered wavetable bank");
        self.banks.push(bank);
        Ok(())
    }

    /// Case-sensitive lookup by display name.
    pub fn get(&self, name: &str) -> Option<Arc<WavetableBank>> {
        self.banks.iter().find(|b| b.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::phase::read_table;

    #[test]
    fn frame_count_bounds_enforced() {
        assert_eq!(
            WavetableBank::new(0, "empty").unwrap_err(),
            SynthError::InvalidFrameCount(0)
        );
        assert_eq!(
            WavetableBank::new(257, "huge").unwrap_err(),
            SynthError::InvalidFrameCount(257)
        );
        assert!(WavetableBank::new(256, "max").is_ok());
    }

    #[test]
    fn long_names_rejected() {
        let name = "x".repeat(65);
        assert!(matches!(
            WavetableBank::new(1, &name),
            Err(SynthError::BankNameTooLong(_))
        ));
        let ok = "y".repeat(64);
        assert!(WavetableBank::new(1, &ok).is_ok());
    }

    #[test]
    fn sine_table_matches_closed_form() {
        let bank = WavetableBank::sine("sine").unwrap();
        let table = bank.frame(0).mip(0);
        for k in (0..TABLE_SIZE).step_by(97) {
            let expected = (std::f64::consts::TAU * k as f64 / TABLE_SIZE as f64).sin() as f32;
            assert!(
                (table[k] - expected).abs() < 1e-5,
                "sine[{k}] = {}, expected {expected}",
                table[k]
            );
        }
    }

    #[test]
    fn sine_is_identical_across_mips() {
        // A lone fundamental survives every band limit.
        let bank = WavetableBank::sine("sine").unwrap();
        for level in 1..MAX_MIP_LEVELS {
            for k in (0..TABLE_SIZE).step_by(211) {
                assert!(
                    (bank.frame(0).mip(level)[k] - bank.frame(0).mip(0)[k]).abs() < 1e-6,
                    "mip {level} diverges at {k}"
                );
            }
        }
    }

    #[test]
    fn top_mip_is_fundamental_only() {
        let bank = WavetableBank::saw("saw").unwrap();
        let top = bank.frame(0).mip(MAX_MIP_LEVELS - 1);

        // A lone sine partial: peak is the fundamental's amplitude and the
        // shape matches a pure sine of it.
        let amp = 2.0 / std::f32::consts::PI;
        for k in (0..TABLE_SIZE).step_by(127) {
            let expected = amp * (std::f64::consts::TAU * k as f64 / TABLE_SIZE as f64).sin() as f32;
            assert!(
                (top[k] - expected).abs() < 1e-4,
                "top mip diverges from a pure fundamental at {k}"
            );
        }
    }

    #[test]
    fn mip_levels_lose_high_harmonics() {
        let bank = WavetableBank::saw("saw").unwrap();
        // Higher mips have progressively less energy (fewer partials).
        let energy = |level: usize| -> f32 {
            bank.frame(0).mip(level).iter().map(|s| s * s).sum()
        };
        let e0 = energy(0);
        let e4 = energy(4);
        let e8 = energy(8);
        assert!(e0 > e4 && e4 > e8, "energies not decreasing: {e0} {e4} {e8}");
    }

    #[test]
    fn tables_read_through_fixed_point_phase() {
        let bank = WavetableBank::sine("sine").unwrap();
        // Phase 1/4 cycle into the table = sin(π/2) = 1.
        let value = read_table(bank.frame(0).mip(0), 0x4000_0000);
        assert!((value - 1.0).abs() < 1e-4);
    }

    #[test]
    fn registry_capacity_and_lookup() {
        let mut registry = BankRegistry::new();
        for i in 0..MAX_REGISTRY_BANKS {
            let bank = WavetableBank::new(1, &format!("bank{i}")).unwrap();
            registry.register(Arc::new(bank)).unwrap();
        }
        assert_eq!(
            registry.register(Arc::new(WavetableBank::new(1, "overflow").unwrap())),
            Err(SynthError::RegistryFull)
        );

        assert!(registry.get("bank7").is_some());
        assert!(registry.get("Bank7").is_none(), "lookup is case-sensitive");
        assert!(registry.get("missing").is_none());
    }
}
