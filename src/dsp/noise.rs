//! White and pink noise generation.
//!
//! White noise comes from an xorshift32 PRNG owned by the oscillator (one
//! per engine, never a process-wide seed, so two engines don't correlate).
//! Pink noise filters the same source through Paul Kellet's 3-stage IIR
//! approximation, which tracks the ideal -3 dB/octave slope within a
//! fraction of a dB across the audible band.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default xorshift32 seed. Any non-zero value works; zero is a fixed
/// point of the generator and is remapped in `new`.
pub const DEFAULT_NOISE_SEED: u32 = 2_463_534_242;

/// Spectral shape of the noise source.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseType {
    /// Flat spectrum.
    White,
    /// -3 dB/octave via the Kellet approximation.
    Pink,
}

/// Noise source mixed alongside the wavetable oscillators.
pub struct NoiseOscillator {
    pub mix_level: f32,
    pub noise_type: NoiseType,
    pub enabled: bool,

    seed: u32,

    // Kellet pink filter state
    b0: f32,
    b1: f32,
    b2: f32,
}

impl NoiseOscillator {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_NOISE_SEED)
    }

    pub fn with_seed(seed: u32) -> Self {
        Self {
            mix_level: 0.0,
            noise_type: NoiseType::White,
            enabled: false,
            seed: if seed == 0 { DEFAULT_NOISE_SEED } else { seed },
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
        }
    }

    #[inline]
    fn next_white(&mut self) -> f32 {
        let mut x = self.seed;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed = x;

        // Reinterpret as signed and scale by 1/2^31 → [-1, 1).
        (x as i32) as f32 * 4.656_613e-10
    }

    /// Produce one sample scaled by `mix_level`. Disabled → 0.
    #[inline]
    pub fn process(&mut self) -> f32 {
        if !self.enabled {
            return 0.0;
        }

        let white = self.next_white();

        if self.noise_type == NoiseType::White {
            return white * self.mix_level;
        }

        // Paul Kellet pink noise approximation (economy 3-stage version).
        self.b0 = 0.99886 * self.b0 + white * 0.055_517_9;
        self.b1 = 0.99332 * self.b1 + white * 0.075_075_9;
        self.b2 = 0.96900 * self.b2 + white * 0.153_852_0;
        let pink = (self.b0 + self.b1 + self.b2 + white * 0.5362) * 0.11;

        pink * self.mix_level
    }
}

impl Default for NoiseOscillator {
    fn default() -> Self {
        Self::new()
    }
}
