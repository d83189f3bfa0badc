//! Setup-time error type.
//!
//! Everything here is reported synchronously on the setup thread. The audio
//! thread never constructs or propagates these: realtime code recovers
//! locally (silence, bypass, clamp) instead of failing.

/// Errors surfaced by setup-path APIs (bank construction, registry
/// population, parameter validation).
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SynthError {
    /// A wavetable bank was requested with zero frames or more than
    /// [`MAX_FRAMES`](crate::dsp::wavetable::MAX_FRAMES).
    #[error("invalid wavetable frame count {0} (expected 1..=256)")]
    InvalidFrameCount(usize),

    /// A bank name exceeded the fixed name length.
    #[error("bank name `{0}` exceeds 64 bytes")]
    BankNameTooLong(String),

    /// The bank registry already holds its maximum of 32 banks.
    #[error("bank registry is full")]
    RegistryFull,

    /// A parameter setter received a value outside its documented range.
    #[error("invalid value {value} for {param} (expected {expected})")]
    InvalidParamValue {
        param: &'static str,
        value: f32,
        expected: &'static str,
    },
}
