//! Lexia Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! upload validation shared across all Lexia components: the content
//! fingerprint, extraction results, score sets, document records, and the
//! review verdict vocabulary.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use fingerprint::ContentFingerprint;
pub use storage_types::StorageBackend;
pub use validation::{UploadValidator, ValidationError};
