//! ADSR envelope: shared parameters plus a per-voice state machine.

/*
Level
  1.0 ┐     ╱╲________
      │    ╱  ╲       ╲
  0.7 │   ╱    ╲_______╲___
      │  ╱              ╲  ╲
  0.0 └─╱────────────────╲──╲─→ Time
      Attack Decay Sustain Release

Parameters are engine-wide (one sound design shared by every voice); the
mutable state is a small per-voice record, so the voice pool stores an
array of `AdsrState` and the engine stores one `AdsrParams`.

Stage math, in samples:

  Attack   amplitude = t / attack_samples            → Decay at t = attack
  Decay    amplitude = 1 - progress·(1 - sustain)    → Sustain at t = decay
  Sustain  amplitude = sustain                        until note-off
  Release  amplitude = start·(1 - progress)          → Idle at t = release

note_off() snapshots the amplitude at the moment of release, so a release
that begins mid-attack ramps down from wherever the attack got to, with no
jump to the sustain level first.

A zero-length stage completes immediately: with attack = decay = 0 the
very first sample after note-on already sits at the sustain level, and
with release = 0 the first sample after note-off is silent.
*/

use crate::error::SynthError;

/// Envelope stage. `Idle` doubles as "voice finished"; the pool frees a
/// voice when its amplitude envelope reaches `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeStage {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Engine-wide envelope timing, in milliseconds plus a sustain level.
///
/// Setters validate instead of panicking; the audio thread never calls
/// them directly (parameter events arrive pre-clamped to [0, 1] and are
/// denormalized into the documented ranges).
#[derive(Debug, Clone)]
pub struct AdsrParams {
    attack_ms: f32,
    decay_ms: f32,
    sustain_level: f32,
    release_ms: f32,

    attack_samples: u32,
    decay_samples: u32,
    release_samples: u32,

    sample_rate: f32,
}

impl AdsrParams {
    pub fn new(sample_rate: f32) -> Self {
        let mut params = Self {
            attack_ms: 10.0,
            decay_ms: 100.0,
            sustain_level: 0.7,
            release_ms: 200.0,
            attack_samples: 0,
            decay_samples: 0,
            release_samples: 0,
            sample_rate,
        };
        params.recompute_sample_counts();
        params
    }

    pub fn set_attack_ms(&mut self, ms: f32) -> Result<(), SynthError> {
        validate_time_ms("attack", ms)?;
        self.attack_ms = ms;
        self.attack_samples = self.ms_to_samples(ms);
        Ok(())
    }

    pub fn set_decay_ms(&mut self, ms: f32) -> Result<(), SynthError> {
        validate_time_ms("decay", ms)?;
        self.decay_ms = ms;
        self.decay_samples = self.ms_to_samples(ms);
        Ok(())
    }

    pub fn set_release_ms(&mut self, ms: f32) -> Result<(), SynthError> {
        validate_time_ms("release", ms)?;
        self.release_ms = ms;
        self.release_samples = self.ms_to_samples(ms);
        Ok(())
    }

    pub fn set_sustain_level(&mut self, level: f32) -> Result<(), SynthError> {
        if !(0.0..=1.0).contains(&level) {
            return Err(SynthError::InvalidParamValue {
                param: "sustain",
                value: level,
                expected: "0.0..=1.0",
            });
        }
        self.sustain_level = level;
        Ok(())
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recompute_sample_counts();
    }

    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    pub fn decay_ms(&self) -> f32 {
        self.decay_ms
    }

    pub fn sustain_level(&self) -> f32 {
        self.sustain_level
    }

    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    fn recompute_sample_counts(&mut self) {
        self.attack_samples = self.ms_to_samples(self.attack_ms);
        self.decay_samples = self.ms_to_samples(self.decay_ms);
        self.release_samples = self.ms_to_samples(self.release_ms);
    }

    fn ms_to_samples(&self, ms: f32) -> u32 {
        (ms * self.sample_rate / 1000.0).round() as u32
    }
}

fn validate_time_ms(param: &'static str, ms: f32) -> Result<(), SynthError> {
    if ms.is_finite() && ms >= 0.0 {
        Ok(())
    } else {
        Err(SynthError::InvalidParamValue {
            param,
            value: ms,
            expected: ">= 0 ms",
        })
    }
}

/// Per-voice envelope state: stage, progress, and the two amplitudes the
/// stage formulas need.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdsrState {
    stage: EnvelopeStage,
    samples_in_stage: u32,
    current_level: f32,
    release_start_level: f32,
}

impl AdsrState {
    /// Restart the envelope from the top of the attack stage.
    pub fn note_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
        self.samples_in_stage = 0;
    }

    /// Begin the release stage from the current amplitude.
    pub fn note_off(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        self.release_start_level = self.current_level;
        self.stage = EnvelopeStage::Release;
        self.samples_in_stage = 0;
    }

    /// Advance one sample and return the amplitude for it.
    pub fn next_sample(&mut self, params: &AdsrParams) -> f32 {
        // Zero-length stages complete before producing any output.
        loop {
            match self.stage {
                EnvelopeStage::Attack if params.attack_samples == 0 => {
                    self.stage = EnvelopeStage::Decay;
                    self.samples_in_stage = 0;
                }
                EnvelopeStage::Decay if params.decay_samples == 0 => {
                    self.stage = EnvelopeStage::Sustain;
                    self.samples_in_stage = 0;
                }
                EnvelopeStage::Release if params.release_samples == 0 => {
                    self.stage = EnvelopeStage::Idle;
                    self.samples_in_stage = 0;
                }
                _ => break,
            }
        }

        let amplitude = match self.stage {
            EnvelopeStage::Idle => 0.0,
            EnvelopeStage::Attack => {
                self.samples_in_stage as f32 / params.attack_samples as f32
            }
            EnvelopeStage::Decay => {
                let progress = self.samples_in_stage as f32 / params.decay_samples as f32;
                1.0 - progress * (1.0 - params.sustain_level)
            }
            EnvelopeStage::Sustain => params.sustain_level,
            EnvelopeStage::Release => {
                let progress = self.samples_in_stage as f32 / params.release_samples as f32;
                self.release_start_level * (1.0 - progress)
            }
        };
        self.current_level = amplitude;

        match self.stage {
            EnvelopeStage::Attack => {
                self.samples_in_stage += 1;
                if self.samples_in_stage >= params.attack_samples {
                    self.stage = EnvelopeStage::Decay;
                    self.samples_in_stage = 0;
                }
            }
            EnvelopeStage::Decay => {
                self.samples_in_stage += 1;
                if self.samples_in_stage >= params.decay_samples {
                    self.stage = EnvelopeStage::Sustain;
                    self.samples_in_stage = 0;
                }
            }
            EnvelopeStage::Release => {
                self.samples_in_stage += 1;
                if self.samples_in_stage >= params.release_samples {
                    self.stage = EnvelopeStage::Idle;
                    self.samples_in_stage = 0;
                }
            }
            EnvelopeStage::Idle | EnvelopeStage::Sustain => {}
        }

        amplitude
    }

    /// Amplitude of the most recent sample.
    #[inline]
    pub fn level(&self) -> f32 {
        self.current_level
    }

    #[inline]
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// The envelope has fully released (or never started).
    #[inline]
    pub fn is_done(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }

    /// Hard reset to silence, bypassing the release stage. Used when a
    /// voice is stolen.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
