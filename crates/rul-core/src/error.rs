//! Error types for rul-core.
//!
//! This module defines the central error type [`RulError`] used throughout
//! the crate, along with the [`RulResult<T>`] type alias and the
//! [`ErrorClass`] used by the response layer to decide what a client sees.
//!
//! # Examples
//!
//! ```rust
//! use rul_core::{ErrorClass, RulError};
//!
//! let error = RulError::ShapeMismatch {
//!     expected: 24,
//!     actual: 21,
//! };
//!
//! assert_eq!(error.class(), ErrorClass::Validation);
//! assert!(error.to_string().contains("24"));
//! ```

use thiserror::Error;

/// How an error propagates to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Client fault, detected before any inference work. The message is
    /// safe to show to the caller.
    Validation,
    /// Server fault. Callers get a generic message, details stay in the log.
    Infrastructure,
    /// Logged and swallowed; never fails a request.
    NonFatal,
}

/// Top-level error type for rul-core operations.
#[derive(Debug, Error)]
pub enum RulError {
    /// A connection could not be acquired from the store pool.
    ///
    /// # When This Occurs
    ///
    /// - Database unreachable or refusing connections
    /// - Bad credentials in `DB_USER` / `DB_PASSWORD`
    /// - Pool exhausted past its wait timeout
    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    /// The evaluation query failed after a connection was acquired.
    #[error("Query error: {0}")]
    Query(String),

    /// A single stored row could not be decoded into an `EvaluationRecord`.
    ///
    /// The row is dropped and the rest of the result set is still served.
    #[error("Malformed stored record '{model}': {message}")]
    MalformedStoredRecord {
        /// Model name of the offending row (`<unnamed>` if that is what failed)
        model: String,
        /// What failed to decode
        message: String,
    },

    /// The multipart request carried no `file` part.
    #[error("No file uploaded")]
    NoFileUploaded,

    /// The uploaded bytes are not a feature document.
    ///
    /// # When This Occurs
    ///
    /// - Missing `data` / `features` fields
    /// - Non-numeric or non-finite entries
    /// - Ragged rows or an empty matrix
    #[error("Unparsable upload: {0}")]
    UnparsableUpload(String),

    /// Row width disagrees with the declared or expected feature count.
    #[error("Shape mismatch: expected {expected} features per row, got {actual}")]
    ShapeMismatch {
        /// Width that was required
        expected: usize,
        /// Width that was provided
        actual: usize,
    },

    /// Inference requested while the artifact is not in the `Ready` state.
    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    /// Tensor conversion or the forward pass failed.
    #[error("Inference failure: {0}")]
    InferenceFailure(String),

    /// A transient upload could not be removed. Logged only.
    #[error("Failed to remove transient file {path}: {message}")]
    FileCleanup {
        /// Path that was left behind
        path: String,
        /// Underlying I/O error
        message: String,
    },

    /// The model artifact could not be loaded at boot.
    #[error("Artifact load error: {0}")]
    ArtifactLoad(String),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Filesystem failure outside of cleanup (persisting uploads, exports).
    #[error("I/O error: {0}")]
    Io(String),
}

impl RulError {
    /// Classify this error for propagation.
    pub fn class(&self) -> ErrorClass {
        match self {
            RulError::NoFileUploaded
            | RulError::UnparsableUpload(_)
            | RulError::ShapeMismatch { .. } => ErrorClass::Validation,
            RulError::MalformedStoredRecord { .. } | RulError::FileCleanup { .. } => {
                ErrorClass::NonFatal
            }
            RulError::DatabaseConnection(_)
            | RulError::Query(_)
            | RulError::ModelNotLoaded(_)
            | RulError::InferenceFailure(_)
            | RulError::ArtifactLoad(_)
            | RulError::ConfigError(_)
            | RulError::Io(_) => ErrorClass::Infrastructure,
        }
    }

    /// Shorthand for `self.class() == ErrorClass::Validation`.
    pub fn is_validation(&self) -> bool {
        self.class() == ErrorClass::Validation
    }

    pub(crate) fn malformed(model: impl Into<String>, message: impl Into<String>) -> Self {
        RulError::MalformedStoredRecord {
            model: model.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RulError {
    fn from(err: std::io::Error) -> Self {
        RulError::Io(err.to_string())
    }
}

impl From<config::ConfigError> for RulError {
    fn from(err: config::ConfigError) -> Self {
        RulError::ConfigError(err.to_string())
    }
}

impl From<candle_core::Error> for RulError {
    fn from(err: candle_core::Error) -> Self {
        RulError::InferenceFailure(err.to_string())
    }
}

/// Result type alias for rul-core operations.
pub type RulResult<T> = Result<T, RulError>;
