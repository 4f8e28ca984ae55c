//! Error types for the AlignRank library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`AlignRankError`] enum.
//!
//! Only two kinds of failure are expected during normal query preparation:
//! malformed scorer or filter parameters ([`AlignRankError::InvalidConfig`])
//! and malformed wire-encoded statistics ([`AlignRankError::CorruptStatistics`]).
//! A document that lacks a frequency or norm attribute is not an error; the
//! scorer simply contributes nothing for it.
//!
//! # Examples
//!
//! ```
//! use alignrank::error::{AlignRankError, Result};
//!
//! fn parse_threshold(value: f32) -> Result<f32> {
//!     if value <= 0.0 || value > 1.0 {
//!         return Err(AlignRankError::invalid_config("threshold must be in (0, 1]"));
//!     }
//!     Ok(value)
//! }
//!
//! assert!(parse_threshold(0.5).is_ok());
//! assert!(parse_threshold(1.5).is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for AlignRank operations.
#[derive(Error, Debug)]
pub enum AlignRankError {
    /// I/O errors (reading or writing persisted statistics, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed scorer or filter parameters, reported at construction time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Wire-encoded statistics that could not be decoded exactly.
    #[error("Corrupt statistics: {0}")]
    CorruptStatistics(String),

    /// Index-related errors (missing fields, bad postings, etc.)
    #[error("Index error: {0}")]
    Index(String),

    /// Query-related errors
    #[error("Query error: {0}")]
    Query(String),

    /// Analysis-related errors (tokenization)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with AlignRankError.
pub type Result<T> = std::result::Result<T, AlignRankError>;

impl AlignRankError {
    /// Create a new invalid configuration error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        AlignRankError::InvalidConfig(msg.into())
    }

    /// Create a new corrupt statistics error.
    pub fn corrupt_statistics<S: Into<String>>(msg: S) -> Self {
        AlignRankError::CorruptStatistics(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        AlignRankError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        AlignRankError::Query(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        AlignRankError::Analysis(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        AlignRankError::Other(msg.into())
    }

    /// Whether this error was raised while constructing a scorer or filter.
    pub fn is_config_error(&self) -> bool {
        matches!(self, AlignRankError::InvalidConfig(_) | AlignRankError::Json(_))
    }
}
