//! Error types for pitch estimation
//!
//! Per-buffer failures (`EstimateError`) are recoverable and mean "no estimate
//! for this buffer". Configuration failures (`ConfigError`) are reported once,
//! before capture starts.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error("Channel data unavailable in audio buffer")]
    InputUnavailable,

    #[error("Frame of {len} samples is too short to search for a peak")]
    DegenerateFrame { len: usize },

    #[error("Frame length {len} is not a power of two")]
    NonPowerOfTwoLength { len: usize },

    #[error("Expected a frame of {expected} samples, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Buffer sample rate {actual} Hz does not match session rate {expected} Hz")]
    SampleRateMismatch { expected: f32, actual: f32 },

    #[error("Invalid sample rate: {rate} Hz")]
    InvalidSampleRate { rate: f32 },

    #[error("Frame contains a non-finite sample at index {index}")]
    NonFiniteInput { index: usize },

    #[error("Spectrum peak is NaN")]
    NonFiniteSpectrum,

    #[error("FFT processing failed: {0}")]
    Transform(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Frame size {0} is not a power of two")]
    NonPowerOfTwoFrameSize(usize),

    #[error("Frame size {0} is too small (minimum is 2)")]
    FrameSizeTooSmall(usize),

    #[error("Sample rate must be finite and positive (got {0} Hz)")]
    InvalidSampleRate(f32),

    #[error("Ring buffer capacity must be non-zero")]
    ZeroRingCapacity,
}
