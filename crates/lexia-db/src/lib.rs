//! Lexia database layer.
//!
//! Repositories over the record store (Postgres via sqlx). Queries are
//! dynamic (no `DATABASE_URL` required at build time). All dedupe and
//! exactly-once-commit coordination is pushed to the store's uniqueness
//! constraints rather than in-process locking; see `schema.sql` for the
//! logical schema.

pub mod documents;
pub mod pool;
pub mod reviews;
pub mod traits;

pub use documents::DocumentRepository;
pub use pool::{apply_schema, connect};
pub use reviews::ReviewRepository;
pub use traits::{DocumentStore, ReviewStore};

/// Logical schema for the record store. Idempotent; applied at startup by
/// [`pool::apply_schema`] or out of band with `psql -f`.
pub const SCHEMA_SQL: &str = include_str!("schema.sql");
