//! Error handling for the brainwave engine
//!
//! One taxonomy for the whole workspace: filter design failures are fatal
//! at construction time, everything else is recoverable at the call site.

use std::fmt;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type for all engine operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineError {
    /// Bad filter parameters (cutoff >= Nyquist, inverted band edges, ...).
    /// Fatal to pipeline construction and never retried.
    InvalidDesign {
        /// Description of the design error
        reason: String,
    },

    /// Fewer analyzable points than the operation needs.
    /// Recoverable: reported as a structured result, not a panic.
    InsufficientData {
        /// Minimum number of points required
        required: usize,
        /// Number of points actually available
        actual: usize,
    },

    /// Recording file missing required channel columns or holding
    /// unparseable sample values
    MalformedInput {
        /// Description of what was wrong with the input
        reason: String,
    },

    /// Incoming chunk carries a different channel count than the pipeline
    /// was built for
    ChannelCountMismatch {
        /// Channel count the pipeline expects
        expected: usize,
        /// Channel count the chunk actually carries
        actual: usize,
    },

    /// Invalid engine configuration
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
    },

    /// Signal source or recorder runtime failure
    StreamError {
        /// Description of the stream failure
        reason: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidDesign { reason } => {
                write!(f, "Invalid filter design: {}", reason)
            }
            EngineError::InsufficientData { required, actual } => {
                write!(
                    f,
                    "Insufficient data: {} points available, {} required",
                    actual, required
                )
            }
            EngineError::MalformedInput { reason } => {
                write!(f, "Malformed input: {}", reason)
            }
            EngineError::ChannelCountMismatch { expected, actual } => {
                write!(
                    f,
                    "Channel count mismatch: expected {}, got {}",
                    expected, actual
                )
            }
            EngineError::InvalidConfiguration { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            EngineError::StreamError { reason } => {
                write!(f, "Stream error: {}", reason)
            }
        }
    }
}

impl std::error::Error for EngineError {}
