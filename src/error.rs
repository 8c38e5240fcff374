//! Error types for pitch parsing, chunk decoding and container framing

use thiserror::Error;

/// Pitch conversion, parsing and detection errors
#[derive(Debug, Error)]
pub enum PitchError {
    /// Text matched none of the pitch notations
    #[error("Invalid pitch spec: {0:?}")]
    InvalidPitchSpec(String),

    /// Frequency outside the logarithm domain
    #[error("Frequency must be positive, got {0}")]
    Domain(f64),

    /// Note number cannot be expressed as a device pitch pair
    #[error("Note {0} is outside the device pitch range")]
    OutOfRange(f64),

    /// Detected pitch queried before detection ran
    #[error("Pitch has not been detected yet")]
    DetectionPrecondition,

    /// Estimator produced no usable frame
    #[error("No pitch detected in signal")]
    NoPitchDetected,

    /// Invalid sample rate
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// FFT error
    #[error("FFT error: {0}")]
    Fft(String),
}

/// `smpl` chunk codec errors
#[derive(Debug, Error)]
pub enum SmplError {
    #[error("smpl chunk too short: {len} bytes, need at least {expected}")]
    TruncatedRecord { len: usize, expected: usize },
}

/// RIFF container errors
#[derive(Debug, Error)]
pub enum RiffError {
    #[error("File too small to be a valid RIFF file ({0} bytes)")]
    TooSmall(usize),

    #[error("Not a RIFF file (missing RIFF header)")]
    NotRiff,

    #[error("Not a WAVE file (missing WAVE format)")]
    NotWave,

    #[error("Chunk {id:?} at offset {offset} runs past the end of the file")]
    TruncatedChunk { id: String, offset: usize },

    #[error("RIFF header declares {declared} bytes but the file holds {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("{0} bytes do not fit a RIFF size field")]
    TooLarge(usize),
}
