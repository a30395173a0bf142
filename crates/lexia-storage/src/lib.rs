//! Lexia Storage Library
//!
//! This crate provides the object-store abstraction and implementations for
//! Lexia. It includes the Storage trait and backends for S3-compatible
//! stores and the local filesystem.
//!
//! # Artifact key layout
//!
//! Two logical prefixes, shared by all backends:
//!
//! - **Originals**: `originals/{fingerprint}.{ext}` where `ext` is derived
//!   from the upload's declared content type
//! - **Thumbnails**: `thumbnails/{fingerprint}.jpg`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is
//! centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{original_key, thumbnail_key};
pub use lexia_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
