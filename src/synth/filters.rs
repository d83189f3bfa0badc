//! Per-voice filter banks with cached coefficients and modulation support.
//!
//! The cores in [`crate::dsp::filter`] are pure math; this module owns what
//! the engine needs around them: one state record per voice, coefficients
//! cached cold and recomputed only when a parameter actually changes, and
//! the per-sample modulated path. Modulation never touches the cache: a
//! modulated sample computes local coefficients when the modulated cutoff
//! or resonance drifts more than 0.001 from the cached values, so an idle
//! mod route costs one comparison, not a `sin` per sample.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::filter::{
    self, ladder_coeff, process_ladder, process_ladder_nonlinear, process_svf, svf_coeffs,
    LadderState, SvfState,
};
use crate::MAX_VOICES;

/// Which SVF response reaches the output.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SvfMode {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

/// Per-frame modulated filter values, already denormalized. `None` takes
/// the cached fast path.
#[derive(Debug, Clone, Copy)]
pub struct FilterMod {
    pub cutoff_hz: f32,
    pub resonance: f32,
}

/// Threshold below which a modulated value reuses the cached coefficients.
const MOD_EPSILON: f32 = 0.001;

/// State-variable filter bank: one state per voice, shared settings.
pub struct SvFilterBank {
    states: [SvfState; MAX_VOICES],
    coeffs: filter::SvfCoeffs,

    pub mode: SvfMode,
    pub cutoff: f32,
    pub resonance: f32,
    pub enabled: bool,
}

impl SvFilterBank {
    pub fn new(sample_rate: f32) -> Self {
        let mut bank = Self {
            states: [SvfState::default(); MAX_VOICES],
            coeffs: filter::SvfCoeffs::default(),
            mode: SvfMode::Lowpass,
            cutoff: 1_000.0,
            resonance: 0.0,
            enabled: false,
        };
        bank.update_coefficients(sample_rate);
        bank
    }

    /// Recompute the cached coefficient pair. Call after `cutoff` or
    /// `resonance` change (parameter events), never per sample.
    pub fn update_coefficients(&mut self, sample_rate: f32) {
        self.coeffs = svf_coeffs(self.cutoff, self.resonance, sample_rate);
    }

    /// Clear one voice's integrator state at note-on.
    pub fn init_voice(&mut self, voice: usize) {
        self.states[voice] = SvfState::default();
    }

    /// Filter one sample. Disabled banks pass the input through.
    #[inline]
    pub fn process(
        &mut self,
        voice: usize,
        input: f32,
        modulation: Option<FilterMod>,
        sample_rate: f32,
    ) -> f32 {
        if !self.enabled {
            return input;
        }

        let coeffs = match modulation {
            Some(m)
                if (self.cutoff - m.cutoff_hz).abs() > MOD_EPSILON
                    || (self.resonance - m.resonance).abs() > MOD_EPSILON =>
            {
                svf_coeffs(m.cutoff_hz, m.resonance, sample_rate)
            }
            _ => self.coeffs,
        };

        let out = process_svf(&mut self.states[voice], input, &coeffs);
        match self.mode {
            SvfMode::Lowpass => out.lp,
            SvfMode::Highpass => out.hp,
            SvfMode::Bandpass => out.bp,
            SvfMode::Notch => out.lp + out.hp,
        }
    }
}

/// Moog-style ladder bank: 4-pole state per voice, shared settings.
/// Resonance maps [0, 1] onto the topology's [0, 4] feedback range; drive
/// above 1.001 switches in the saturated path.
pub struct LadderFilterBank {
    states: [LadderState; MAX_VOICES],
    coeff: f32,

    pub cutoff: f32,
    pub resonance: f32,
    pub drive: f32,
    pub enabled: bool,
}

impl LadderFilterBank {
    pub fn new(sample_rate: f32) -> Self {
        let mut bank = Self {
            states: [LadderState::default(); MAX_VOICES],
            coeff: 0.0,
            cutoff: 1_000.0,
            resonance: 0.3,
            drive: 1.0,
            enabled: false,
        };
        bank.update_coefficients(sample_rate);
        bank
    }

    pub fn update_coefficients(&mut self, sample_rate: f32) {
        self.coeff = ladder_coeff(self.cutoff, sample_rate);
    }

    pub fn init_voice(&mut self, voice: usize) {
        self.states[voice] = LadderState::default();
    }

    #[inline]
    pub fn process(
        &mut self,
        voice: usize,
        input: f32,
        modulation: Option<FilterMod>,
        sample_rate: f32,
    ) -> f32 {
        if !self.enabled {
            return input;
        }

        let (coeff, resonance) = match modulation {
            Some(m) => {
                let coeff = if (self.cutoff - m.cutoff_hz).abs() > MOD_EPSILON {
                    ladder_coeff(m.cutoff_hz, sample_rate)
                } else {
                    self.coeff
                };
                (coeff, m.resonance.clamp(0.0, 1.0) * 4.0)
            }
            None => (self.coeff, self.resonance * 4.0),
        };

        let state = &mut self.states[voice];
        if self.drive > 1.001 {
            process_ladder_nonlinear(state, input, coeff, resonance, self.drive)
        } else {
            process_ladder(state, input, coeff, resonance)
        }
    }
}
