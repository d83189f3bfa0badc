//! Modulation matrix: fixed routes from sources to destinations with
//! per-block interpolation.

/*
The matrix is evaluated in two phases:

  BLOCK RATE   `begin_block` sums every route into a per-destination,
               per-voice target value, then derives a per-sample step:

                   step = (current - previous) / frames

  SAMPLE RATE  `value(dest, voice, i)` is just `previous + step·i`: one
               multiply-add, no route iteration, no branching.

At the block boundary the interpolated value lands exactly on the target
(`previous + step·frames = current`), and `previous` rolls over for the
next block, so destination values are continuous across block edges no
matter how fast the sources move.

Routes live in a fixed array with swap-remove semantics: removal order is
unspecified, capacity is MAX_MOD_ROUTES, and a full matrix rejects new
routes rather than evicting.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MAX_VOICES;

/// Most simultaneous routes the matrix holds.
pub const MAX_MOD_ROUTES: usize = 16;

/// Modulation sources. Closed set: every value the matrix can read is
/// listed here.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModSrc {
    #[default]
    NoSrc,
    Lfo1,
    Lfo2,
    /// Amplitude envelope output.
    Env1,
    /// Modulation envelope output.
    Env2,
    ModWheel,
    Velocity,
    KeyTrack,
    Aftertouch,
}

/// Number of [`ModSrc`] variants.
pub const SRC_COUNT: usize = 9;

/// Modulation destinations. Closed set; `COUNT` sizes the value tables.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModDest {
    #[default]
    NoDest,
    /// Semitone offset per oscillator.
    Osc1Pitch,
    Osc2Pitch,
    Osc3Pitch,
    SubPitch,
    /// Octave offset applied to the filter cutoff.
    FilterCutoff,
    /// Additive resonance offset.
    FilterResonance,
    /// Additive amplitude offset (1 + value, clamped at zero).
    AmpLevel,
    /// Additive FM depth per oscillator.
    Osc1Fm,
    Osc2Fm,
    Osc3Fm,
    /// Additive scan-position offset shared by all oscillators.
    ScanPosition,
}

impl ModDest {
    /// Number of destinations, including `NoDest`.
    pub const COUNT: usize = 12;
}

/// One edge in the matrix.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default)]
pub struct ModRoute {
    pub src: ModSrc,
    pub dest: ModDest,
    pub amount: f32,
}

/// Per-voice source values for one block, filled by the engine before
/// `begin_block`.
pub struct ModSourceValues {
    values: [[f32; MAX_VOICES]; SRC_COUNT],
}

impl ModSourceValues {
    pub fn new() -> Self {
        Self {
            values: [[0.0; MAX_VOICES]; SRC_COUNT],
        }
    }

    #[inline]
    pub fn set(&mut self, src: ModSrc, voice: usize, value: f32) {
        self.values[src as usize][voice] = value;
    }

    #[inline]
    pub fn get(&self, src: ModSrc, voice: usize) -> f32 {
        // NoSrc always reads as silence no matter what was stored.
        if src == ModSrc::NoSrc {
            return 0.0;
        }
        self.values[src as usize][voice]
    }
}

impl Default for ModSourceValues {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ModMatrix {
    routes: [ModRoute; MAX_MOD_ROUTES],
    count: usize,

    // Per destination × voice interpolation state.
    previous: [[f32; MAX_VOICES]; ModDest::COUNT],
    current: [[f32; MAX_VOICES]; ModDest::COUNT],
    step: [[f32; MAX_VOICES]; ModDest::COUNT],
}

impl ModMatrix {
    pub fn new() -> Self {
        Self {
            routes: [ModRoute::default(); MAX_MOD_ROUTES],
            count: 0,
            previous: [[0.0; MAX_VOICES]; ModDest::COUNT],
            current: [[0.0; MAX_VOICES]; ModDest::COUNT],
            step: [[0.0; MAX_VOICES]; ModDest::COUNT],
        }
    }

    /// Add a route. Returns `false` when the matrix is full.
    pub fn add_route(&mut self, src: ModSrc, dest: ModDest, amount: f32) -> bool {
        if self.count >= MAX_MOD_ROUTES {
            return false;
        }
        self.routes[self.count] = ModRoute { src, dest, amount };
        self.count += 1;
        true
    }

    /// Remove a route by index, swapping the last route into its slot.
    pub fn remove_route(&mut self, index: usize) -> bool {
        if index >= self.count {
            return false;
        }
        self.count -= 1;
        self.routes[index] = self.routes[self.count];
        self.routes[self.count] = ModRoute::default();
        true
    }

    pub fn clear_routes(&mut self) {
        self.routes = [ModRoute::default(); MAX_MOD_ROUTES];
        self.count = 0;
    }

    pub fn route_count(&self) -> usize {
        self.count
    }

    pub fn routes(&self) -> &[ModRoute] {
        &self.routes[..self.count]
    }

    /// Roll the interpolation state into a new block: the previous block's
    /// targets become the starting points, fresh targets are summed from
    /// the routes, and per-sample steps are derived.
    pub fn begin_block(&mut self, sources: &ModSourceValues, frames: usize) {
        let inv_frames = 1.0 / frames.max(1) as f32;

        self.previous = self.current;

        for dest in self.current.iter_mut() {
            dest.fill(0.0);
        }
        for route in &self.routes[..self.count] {
            if route.dest == ModDest::NoDest {
                continue;
            }
            let dest = route.dest as usize;
            for voice in 0..MAX_VOICES {
                self.current[dest][voice] += route.amount * sources.get(route.src, voice);
            }
        }

        for dest in 0..ModDest::COUNT {
            for voice in 0..MAX_VOICES {
                self.step[dest][voice] =
                    (self.current[dest][voice] - self.previous[dest][voice]) * inv_frames;
            }
        }
    }

    /// Interpolated destination value at frame `i` of the current block.
    #[inline]
    pub fn value(&self, dest: ModDest, voice: usize, frame: usize) -> f32 {
        let d = dest as usize;
        self.previous[d][voice] + self.step[d][voice] * frame as f32
    }
}

impl Default for ModMatrix {
    fn default() -> Self {
        Self::new()
    }
}
