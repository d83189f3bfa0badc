//! Free-running low-frequency oscillators used as modulation sources.
//!
//! LFO output is consumed at block rate: the matrix samples each LFO once
//! at the start of a block and the per-destination step interpolation
//! smooths the value across the block's samples. That keeps the per-sample
//! loop free of LFO math while staying artifact-free for control-rate
//! frequencies; a 20 Hz LFO moves less than 1% of a cycle across a
//! 512-sample block at 48 kHz.
//!
//! Phase is normalized to [0, 1) and free-running: it is never reset at
//! note-on, so each note catches the LFO wherever it happens to be.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoShape {
    #[default]
    Sine,
    Triangle,
    Saw,
    Square,
}

pub struct Lfo {
    pub shape: LfoShape,
    pub rate_hz: f32,
    phase: f32, // normalized [0, 1)
}

impl Lfo {
    pub fn new(shape: LfoShape, rate_hz: f32) -> Self {
        Self {
            shape,
            rate_hz,
            phase: 0.0,
        }
    }

    /// Bipolar output at the current phase.
    #[inline]
    pub fn value(&self) -> f32 {
        let phi = self.phase;
        match self.shape {
            LfoShape::Sine => (std::f32::consts::TAU * phi).sin(),
            LfoShape::Triangle => {
                let saw = 2.0 * phi - 1.0;
                2.0 * saw.abs() - 1.0
            }
            LfoShape::Saw => 2.0 * phi - 1.0,
            LfoShape::Square => {
                if phi < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// Advance the phase by one block of `frames` samples.
    pub fn advance_block(&mut self, frames: usize, sample_rate: f32) {
        let delta = self.rate_hz * frames as f32 / sample_rate;
        self.phase = (self.phase + delta).rem_euclid(1.0);
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(LfoShape::Sine, 1.0)
    }
}
