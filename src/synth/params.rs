//! Parameter identifiers and their binding metadata.
//!
//! Parameter events travel the queue as `(raw id, normalized value)`; this
//! module is the static table that gives each id a typed destination. Each
//! [`ParamId`] carries a [`ParamSpec`] (range plus storage kind), and the
//! engine denormalizes with
//!
//! ```text
//! field = min + normalized · (max − min)
//! ```
//!
//! before writing the typed field (see `Engine::set_param`). Unknown raw
//! ids decode to `None` and are ignored, so a stale controller mapping can
//! never corrupt engine state.

/// How a parameter's denormalized value is stored in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    /// Rounded and stored in an `i8` (octave offsets).
    Int8,
    /// `>= 0.5` reads as true.
    Bool,
    /// Rounded index into a closed enum (noise type, filter mode, LFO
    /// shape).
    Choice,
}

/// Range and storage for one parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub min: f32,
    pub max: f32,
    pub kind: ParamKind,
}

impl ParamSpec {
    const fn float(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            kind: ParamKind::Float,
        }
    }

    const fn int8(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            kind: ParamKind::Int8,
        }
    }

    const fn boolean() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            kind: ParamKind::Bool,
        }
    }

    const fn choice(count: usize) -> Self {
        Self {
            min: 0.0,
            max: (count - 1) as f32,
            kind: ParamKind::Choice,
        }
    }

    /// Denormalize a wire value. Input outside [0, 1] is clamped first.
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let v = normalized.clamp(0.0, 1.0);
        self.min + v * (self.max - self.min)
    }
}

/// Every engine parameter reachable over the event queue.
///
/// Discriminants are the wire format; they are stable and sequential so
/// `from_raw` is a table lookup.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamId {
    Osc1Scan = 0,
    Osc1Mix,
    Osc1Detune,
    Osc1Octave,
    Osc1FmDepth,
    Osc1Enabled,

    Osc2Scan,
    Osc2Mix,
    Osc2Detune,
    Osc2Octave,
    Osc2FmDepth,
    Osc2Enabled,

    Osc3Scan,
    Osc3Mix,
    Osc3Detune,
    Osc3Octave,
    Osc3FmDepth,
    Osc3Enabled,

    SubScan,
    SubMix,
    SubDetune,
    SubOctave,
    SubEnabled,

    NoiseMix,
    NoiseType,
    NoiseEnabled,

    AmpAttack,
    AmpDecay,
    AmpSustain,
    AmpRelease,

    ModAttack,
    ModDecay,
    ModSustain,
    ModRelease,

    SvfCutoff,
    SvfResonance,
    SvfMode,
    SvfEnabled,

    LadderCutoff,
    LadderResonance,
    LadderDrive,
    LadderEnabled,

    Lfo1Rate,
    Lfo1Shape,
    Lfo2Rate,
    Lfo2Shape,

    ModWheel,
    Aftertouch,
    PitchBend,

    MasterGain,
}

/// All parameters in wire order.
pub const ALL_PARAMS: [ParamId; 50] = [
    ParamId::Osc1Scan,
    ParamId::Osc1Mix,
    ParamId::Osc1Detune,
    ParamId::Osc1Octave,
    ParamId::Osc1FmDepth,
    ParamId::Osc1Enabled,
    ParamId::Osc2Scan,
    ParamId::Osc2Mix,
    ParamId::Osc2Detune,
    ParamId::Osc2Octave,
    ParamId::Osc2FmDepth,
    ParamId::Osc2Enabled,
    ParamId::Osc3Scan,
    ParamId::Osc3Mix,
    ParamId::Osc3Detune,
    ParamId::Osc3Octave,
    ParamId::Osc3FmDepth,
    ParamId::Osc3Enabled,
    ParamId::SubScan,
    ParamId::SubMix,
    ParamId::SubDetune,
    ParamId::SubOctave,
    ParamId::SubEnabled,
    ParamId::NoiseMix,
    ParamId::NoiseType,
    ParamId::NoiseEnabled,
    ParamId::AmpAttack,
    ParamId::AmpDecay,
    ParamId::AmpSustain,
    ParamId::AmpRelease,
    ParamId::ModAttack,
    ParamId::ModDecay,
    ParamId::ModSustain,
    ParamId::ModRelease,
    ParamId::SvfCutoff,
    ParamId::SvfResonance,
    ParamId::SvfMode,
    ParamId::SvfEnabled,
    ParamId::LadderCutoff,
    ParamId::LadderResonance,
    ParamId::LadderDrive,
    ParamId::LadderEnabled,
    ParamId::Lfo1Rate,
    ParamId::Lfo1Shape,
    ParamId::Lfo2Rate,
    ParamId::Lfo2Shape,
    ParamId::ModWheel,
    ParamId::Aftertouch,
    ParamId::PitchBend,
    ParamId::MasterGain,
];

impl ParamId {
    /// Decode a wire id. Unknown ids are `None` (and ignored upstream).
    pub fn from_raw(raw: u8) -> Option<Self> {
        ALL_PARAMS.get(raw as usize).copied()
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Range and storage metadata for this parameter.
    pub fn spec(self) -> ParamSpec {
        use ParamId::*;
        match self {
            Osc1Scan | Osc2Scan | Osc3Scan | SubScan => ParamSpec::float(0.0, 1.0),
            Osc1Mix | Osc2Mix | Osc3Mix | SubMix | NoiseMix => ParamSpec::float(0.0, 1.0),
            Osc1Detune | Osc2Detune | Osc3Detune | SubDetune => ParamSpec::float(-100.0, 100.0),
            Osc1Octave | Osc2Octave | Osc3Octave | SubOctave => ParamSpec::int8(-3.0, 3.0),
            Osc1FmDepth | Osc2FmDepth | Osc3FmDepth => ParamSpec::float(0.0, 1.0),
            Osc1Enabled | Osc2Enabled | Osc3Enabled | SubEnabled | NoiseEnabled
            | SvfEnabled | LadderEnabled => ParamSpec::boolean(),

            NoiseType => ParamSpec::choice(2),

            AmpAttack | AmpDecay | AmpRelease | ModAttack | ModDecay | ModRelease => {
                ParamSpec::float(0.0, 5_000.0)
            }
            AmpSustain | ModSustain => ParamSpec::float(0.0, 1.0),

            SvfCutoff | LadderCutoff => ParamSpec::float(20.0, 20_000.0),
            SvfResonance | LadderResonance => ParamSpec::float(0.0, 1.0),
            SvfMode => ParamSpec::choice(4),
            LadderDrive => ParamSpec::float(1.0, 10.0),

            Lfo1Rate | Lfo2Rate => ParamSpec::float(0.01, 20.0),
            Lfo1Shape | Lfo2Shape => ParamSpec::choice(4),

            ModWheel | Aftertouch => ParamSpec::float(0.0, 1.0),
            // Centered: normalized 0.5 is no bend, full range ±2 semitones.
            PitchBend => ParamSpec::float(-2.0, 2.0),

            MasterGain => ParamSpec::float(0.0, 1.0),
        }
    }
}
