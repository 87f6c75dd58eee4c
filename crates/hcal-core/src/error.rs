//! Error types for timing calibration
//!
//! Provides a unified error type for all hcal crates.

use thiserror::Error;

/// Core error type for calibration operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input record does not have the shape the reducer relies on
    #[error("Data shape error in {context}: expected {expected}, got {actual}")]
    DataShape {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Channel outside the valid detector range
    #[error("Unknown channel: ieta {ieta}, iphi {iphi}, depth {depth}")]
    UnknownChannel { ieta: i32, iphi: i32, depth: i32 },

    /// Lookup of a distribution that was never booked
    #[error("Unknown distribution: {0}")]
    UnknownDistribution(String),

    /// Aggregation stage requested before its prerequisite
    #[error("Phase order violation: requires {required}, accumulator is {current}")]
    PhaseOrder { required: String, current: String },

    /// Malformed line in a text input
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for a sample sequence of the wrong length
    pub fn data_shape(context: &str, expected: usize, actual: usize) -> Self {
        Self::DataShape {
            context: context.to_string(),
            expected,
            actual,
        }
    }

    /// Create an error for an out-of-range channel
    pub fn unknown_channel(ieta: i32, iphi: i32, depth: i32) -> Self {
        Self::UnknownChannel { ieta, iphi, depth }
    }

    /// Create an error for a malformed input line
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::InvalidInput(format!("{context} contains NaN or infinite values"))
    }

    /// Whether this error means the input contract was broken and the run must stop
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DataShape { .. } | Self::UnknownChannel { .. } | Self::UnknownDistribution(_)
        )
    }
}
