//! Error types for the FFA search engine

use std::fmt;

/// Errors that can occur while preparing data for, or running, a period search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Invalid input parameters (empty data, zero window, base period too long, ...)
    InvalidInput(String),

    /// Inconsistent search configuration (period not a multiple of the scale factor, ...)
    ConfigurationError(String),

    /// A fold needs more storage than the buffer's padded capacity provides
    CapacityExceeded {
        /// Number of elements the fold requires
        required: usize,
        /// Physical length of the buffer being folded
        available: usize,
    },

    /// Numerical error (non-finite samples, etc.)
    NumericalError(String),

    /// Malformed time-series encoding
    DecodingError(String),

    /// I/O failure while reading or writing a stream
    IoError(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            SearchError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            SearchError::CapacityExceeded { required, available } => write!(
                f,
                "Capacity exceeded: fold needs {} elements but buffer holds {}",
                required, available
            ),
            SearchError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            SearchError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            SearchError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::IoError(err.to_string())
    }
}
