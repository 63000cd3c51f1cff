//! Error handling for the tremor analysis toolkit
//!
//! All failures here are deterministic numerical or structural errors,
//! never transient faults, so no variant carries retry semantics.

use core::fmt;

/// Result type alias for tremor toolkit operations
pub type TremorResult<T> = Result<T, TremorError>;

/// Error type covering the decomposition engine and its stores
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TremorError {
    /// Filter cutoff at or above the Nyquist frequency
    InvalidCutoff {
        /// Requested cutoff in Hz
        cutoff_hz: f64,
        /// Nyquist frequency (0.5 * fs) in Hz
        nyquist_hz: f64,
    },

    /// Signal too short for stable zero-phase filtering
    SignalTooShort {
        /// Actual signal length in samples
        len: usize,
        /// Minimum length required by the edge padding
        min_len: usize,
    },

    /// Source file lacks a required column
    MissingColumns {
        /// File the column was expected in
        file: String,
        /// Column (or alias group) that could not be resolved
        column: String,
    },

    /// Recording or processed file does not exist
    FileNotFound {
        /// Path that was looked up
        path: String,
    },

    /// Requested feature is not present in the processed file
    FeatureNotFound {
        /// File that was searched
        file: String,
        /// Feature that was requested
        feature: String,
    },

    /// Stop or consume requested with nothing streaming
    NoActiveSession,

    /// A required parameter was not provided at the interface boundary
    MissingParameter {
        /// Name of the missing parameter
        name: String,
    },

    /// Filter or pipeline produced NaN/Inf output
    NonFiniteOutput {
        /// Pipeline stage that produced the value
        stage: &'static str,
    },

    /// Estimated sampling rate is not usable
    InvalidSamplingRate {
        /// Estimated rate in Hz
        fs: f64,
    },

    /// Requested time window does not fit the recording
    InvalidTimeRange {
        /// Window start in seconds
        start: f64,
        /// Window end in seconds
        end: f64,
        /// Recording duration in seconds
        duration: f64,
    },

    /// Underlying I/O failure
    Io {
        /// What was being read or written
        context: String,
    },

    /// File exists but its contents cannot be parsed
    Malformed {
        /// Offending file
        file: String,
        /// Parse failure description
        reason: String,
    },
}

impl fmt::Display for TremorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TremorError::InvalidCutoff { cutoff_hz, nyquist_hz } => {
                write!(f, "Invalid cutoff: {}Hz must be below Nyquist {}Hz",
                       cutoff_hz, nyquist_hz)
            }
            TremorError::SignalTooShort { len, min_len } => {
                write!(f, "Signal too short for zero-phase filtering: {} samples, need more than {}",
                       len, min_len)
            }
            TremorError::MissingColumns { file, column } => {
                write!(f, "Missing required column '{}' in {}", column, file)
            }
            TremorError::FileNotFound { path } => {
                write!(f, "File not found: {}", path)
            }
            TremorError::FeatureNotFound { file, feature } => {
                write!(f, "Feature '{}' not found in {}", feature, file)
            }
            TremorError::NoActiveSession => {
                write!(f, "No active live session")
            }
            TremorError::MissingParameter { name } => {
                write!(f, "Missing required parameter '{}'", name)
            }
            TremorError::NonFiniteOutput { stage } => {
                write!(f, "Non-finite output produced at stage '{}'", stage)
            }
            TremorError::InvalidSamplingRate { fs } => {
                write!(f, "Invalid sampling rate estimate: {}Hz", fs)
            }
            TremorError::InvalidTimeRange { start, end, duration } => {
                write!(f, "Invalid time range [{:.3}, {:.3})s for recording of {:.3}s",
                       start, end, duration)
            }
            TremorError::Io { context } => {
                write!(f, "I/O error: {}", context)
            }
            TremorError::Malformed { file, reason } => {
                write!(f, "Malformed file {}: {}", file, reason)
            }
        }
    }
}

impl std::error::Error for TremorError {}

impl From<std::io::Error> for TremorError {
    fn from(err: std::io::Error) -> Self {
        TremorError::Io {
            context: err.to_string(),
        }
    }
}

impl From<csv::Error> for TremorError {
    fn from(err: csv::Error) -> Self {
        TremorError::Io {
            context: err.to_string(),
        }
    }
}
