//! Error types.

use thiserror::Error;

/// Error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration rejected at construction time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Overlap must be strictly shorter than the analysis frame.
    #[error("Overlap length {overlap} must be smaller than frame length {frame}")]
    OverlapTooLarge { overlap: usize, frame: usize },

    /// FIR table longer than the filter supports.
    #[error("FIR tap count {taps} exceeds maximum of {max}")]
    TooManyTaps { taps: usize, max: usize },

    /// Sample format the processor cannot handle.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Speed factor outside the supported range.
    #[error("Speed factor {0} outside supported range 0.5..=2.0")]
    InvalidSpeed(f64),
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
