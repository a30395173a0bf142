//! Error types module
//!
//! This module provides the core error types used throughout the Lexia
//! pipeline. All errors are unified under the `AppError` enum, which covers
//! the intake taxonomy (duplicate uploads, extraction failures, store
//! unavailability, commit races, bad verdicts) alongside the ambient
//! storage/validation/internal variants.
//!
//! The `TransientStore` variant wraps `sqlx::Error` behind the `sqlx`
//! feature. With `default-features = false` the variant carries a plain
//! message instead.

use std::io;

use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like duplicate submissions
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error reporting - defines how an error should be presented.
/// This trait allows errors to self-describe their handling characteristics
/// so transports (chat reply, CLI output) never match on variants directly.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "DUPLICATE_UPLOAD")
    fn error_code(&self) -> &'static str;

    /// Whether the caller may retry the same submission
    fn is_retryable(&self) -> bool;

    /// Operator-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The record store already holds a record for this fingerprint.
    /// Non-fatal: the existing record is referenced and no work was done.
    #[error("duplicate upload: record {record_id} already exists")]
    DuplicateUpload { record_id: Uuid },

    /// Both extraction tiers failed or were unconfigured. Fatal for the
    /// upload; nothing was committed.
    #[error("no extraction possible: {0}")]
    ExtractionUnavailable(String),

    /// The record store could not be reached during a dedupe check or a
    /// commit write. The pipeline took no partial action; retryable.
    #[cfg(feature = "sqlx")]
    #[error("record store unavailable: {0}")]
    TransientStore(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("record store unavailable: {0}")]
    TransientStore(String),

    /// Lost the fingerprint-uniqueness race at commit time. The winning
    /// record, when known, is referenced so the caller can treat this as
    /// a duplicate after the fact.
    #[error("commit conflict on fingerprint {fingerprint}")]
    CommitConflict { fingerprint: String },

    /// The confirmation transport supplied an unrecognized verdict.
    /// Rejected with no state change.
    #[error("invalid verdict: {0}")]
    InvalidVerdict(String),

    #[error("review session not in a resolvable state: {0}")]
    InvalidReviewState(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("object store error: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::TransientStore(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<crate::validation::ValidationError> for AppError {
    fn from(err: crate::validation::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Static metadata for each variant: (error_code, retryable, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, LogLevel) {
    match err {
        AppError::DuplicateUpload { .. } => ("DUPLICATE_UPLOAD", false, LogLevel::Debug),
        AppError::ExtractionUnavailable(_) => ("EXTRACTION_UNAVAILABLE", false, LogLevel::Warn),
        AppError::TransientStore(_) => ("TRANSIENT_STORE", true, LogLevel::Error),
        AppError::CommitConflict { .. } => ("COMMIT_CONFLICT", false, LogLevel::Warn),
        AppError::InvalidVerdict(_) => ("INVALID_VERDICT", false, LogLevel::Debug),
        AppError::InvalidReviewState(_) => ("INVALID_REVIEW_STATE", false, LogLevel::Debug),
        AppError::Validation(_) => ("VALIDATION_FAILED", false, LogLevel::Debug),
        AppError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        AppError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Debug),
        AppError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Debug),
        AppError::Internal(_) => ("INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name for structured logging
    pub fn error_type(&self) -> &str {
        match self {
            AppError::DuplicateUpload { .. } => "DuplicateUpload",
            AppError::ExtractionUnavailable(_) => "ExtractionUnavailable",
            AppError::TransientStore(_) => "TransientStore",
            AppError::CommitConflict { .. } => "CommitConflict",
            AppError::InvalidVerdict(_) => "InvalidVerdict",
            AppError::InvalidReviewState(_) => "InvalidReviewState",
            AppError::Validation(_) => "Validation",
            AppError::Storage(_) => "Storage",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_retryable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            AppError::DuplicateUpload { record_id } => {
                format!("This document was already ingested (record {})", record_id)
            }
            AppError::ExtractionUnavailable(_) => {
                "Could not extract any text from this document".to_string()
            }
            AppError::TransientStore(_) => {
                "The record store is temporarily unavailable; resubmit later".to_string()
            }
            AppError::CommitConflict { .. } => {
                "This document was committed by a concurrent submission".to_string()
            }
            AppError::InvalidVerdict(ref msg) => msg.clone(),
            AppError::InvalidReviewState(ref msg) => msg.clone(),
            AppError::Validation(ref msg) => msg.clone(),
            AppError::Storage(_) => "Failed to store the document artifact".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal pipeline error".to_string(),
            AppError::InternalWithSource { .. } => "Internal pipeline error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_duplicate_upload() {
        let record_id = Uuid::new_v4();
        let err = AppError::DuplicateUpload { record_id };
        assert_eq!(err.error_code(), "DUPLICATE_UPLOAD");
        assert!(!err.is_retryable());
        assert!(err.client_message().contains(&record_id.to_string()));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_transient_store() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::TransientStore("pool closed".to_string());
        assert_eq!(err.error_code(), "TRANSIENT_STORE");
        assert!(err.is_retryable());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_extraction_unavailable() {
        let err = AppError::ExtractionUnavailable("both tiers failed".to_string());
        assert_eq!(err.error_code(), "EXTRACTION_UNAVAILABLE");
        assert!(!err.is_retryable());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_invalid_verdict() {
        let err = AppError::InvalidVerdict("unknown verdict 'maybe'".to_string());
        assert_eq!(err.error_code(), "INVALID_VERDICT");
        assert!(!err.is_retryable());
        assert_eq!(err.client_message(), "unknown verdict 'maybe'");
    }

    #[test]
    fn test_commit_conflict_names_fingerprint() {
        let err = AppError::CommitConflict {
            fingerprint: "abc123".to_string(),
        };
        assert!(err.to_string().contains("abc123"));
        assert_eq!(err.error_type(), "CommitConflict");
    }
}
