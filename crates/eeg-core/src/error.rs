//! Error handling for the EEG pipeline types
//!
//! Configuration and validation failures raised by the core types. I/O,
//! storage and transport errors live with the service that owns them.

use core::fmt;

/// Result type alias for core operations
pub type EegResult<T> = Result<T, EegError>;

/// Error type for core validation and configuration failures
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EegError {
    /// Invalid signal configuration
    InvalidSignalConfig {
        /// Description of the configuration error
        reason: &'static str,
    },

    /// Invalid sampling rate
    InvalidSamplingRate {
        /// Provided sampling rate
        rate: f64,
        /// Valid range description
        valid_range: &'static str,
    },

    /// Block size cannot be used for spectral analysis
    InvalidBlockSize {
        /// Requested block size
        size: usize,
        /// Smallest usable block size
        min: usize,
    },

    /// A block did not have the configured length
    BlockLengthMismatch {
        /// Configured block size
        expected: usize,
        /// Length actually received
        actual: usize,
    },

    /// Band power value is negative or not finite
    InvalidBandPower {
        /// Band that carried the bad value
        band: &'static str,
        /// The offending value
        value: f64,
    },

    /// Unknown ingestion mode name
    UnknownIngestMode {
        /// The name that failed to parse
        name: String,
    },
}

impl fmt::Display for EegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EegError::InvalidSignalConfig { reason } => {
                write!(f, "Invalid signal configuration: {}", reason)
            }
            EegError::InvalidSamplingRate { rate, valid_range } => {
                write!(f, "Invalid sampling rate: {}Hz, valid range: {}", rate, valid_range)
            }
            EegError::InvalidBlockSize { size, min } => {
                write!(f, "Invalid block size: {} samples, minimum is {}", size, min)
            }
            EegError::BlockLengthMismatch { expected, actual } => {
                write!(f, "Block length mismatch: expected {} samples, got {}",
                       expected, actual)
            }
            EegError::InvalidBandPower { band, value } => {
                write!(f, "Invalid {} band power: {}", band, value)
            }
            EegError::UnknownIngestMode { name } => {
                write!(f, "Unknown ingest mode '{}', expected 'samples' or 'bands'", name)
            }
        }
    }
}

impl std::error::Error for EegError {}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($reason:literal) => {
        $crate::error::EegError::InvalidSignalConfig {
            reason: $reason
        }
    };
}
