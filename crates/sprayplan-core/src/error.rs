//! Error handling for SprayPlan
//!
//! One error type covers every layer of the planner:
//! - Configuration errors (bed, grid, shape, spray and path parameters)
//! - Empty regions (masks without selectable cells)
//! - Optimization errors (every stride candidate failed)
//! - I/O and serialization errors raised by the settings/persistence layer
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for SprayPlan
///
/// Configuration problems are unrecoverable without correcting the input.
/// The optimizer catches per-candidate failures locally; everything else
/// propagates to the caller unchanged.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid bed, grid, shape, spray or path parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A mask has no selectable cells
    #[error("Mask '{mask}' has no selectable cells")]
    EmptyRegion {
        /// The name of the empty mask.
        mask: String,
    },

    /// Every stride candidate failed
    #[error("All {attempted} stride candidates failed; last failure: {source}")]
    Optimization {
        /// Number of candidates that were attempted.
        attempted: usize,
        /// The last underlying failure.
        source: Box<Error>,
    },

    /// The sweep was cancelled before any candidate was evaluated
    #[error("Stride sweep cancelled before any candidate was evaluated")]
    Cancelled,

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML serialization/deserialization error
    #[error("TOML error: {0}")]
    Toml(String),
}

impl Error {
    /// Create a configuration error from a message
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create an empty-region error for the named mask
    pub fn empty_region(mask: impl Into<String>) -> Self {
        Error::EmptyRegion { mask: mask.into() }
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if this is an empty-region error
    pub fn is_empty_region(&self) -> bool {
        matches!(self, Error::EmptyRegion { .. })
    }

    /// Check if this is an optimization error
    pub fn is_optimization(&self) -> bool {
        matches!(self, Error::Optimization { .. })
    }

    /// Check if this error came from file or serialization handling
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Serialization(_) | Error::Toml(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

/// Reject non-finite or non-positive values with a configuration error.
pub fn ensure_positive(name: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::configuration(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )));
    }
    Ok(value)
}

/// Reject non-finite values with a configuration error.
pub fn ensure_finite(name: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(Error::configuration(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }
    Ok(value)
}
