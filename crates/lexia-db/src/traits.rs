//! Repository traits consumed by the pipeline.
//!
//! The pipeline depends on these seams rather than concrete sqlx
//! repositories so that review and commit logic can be tested without a
//! database.

use async_trait::async_trait;
use uuid::Uuid;

use lexia_core::models::{DocumentRecord, ExtractionResult, ReviewSession, ReviewStatus, ScoreSet};
use lexia_core::{AppError, ContentFingerprint};

/// Access to the durable documents table.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether a record already exists for this fingerprint. A store
    /// failure here is a `TransientStore` error: the pipeline fails closed
    /// rather than risk double-ingestion.
    async fn exists(&self, fingerprint: &ContentFingerprint) -> Result<bool, AppError>;

    /// Fetch the record for a fingerprint, if committed.
    async fn get_by_fingerprint(
        &self,
        fingerprint: &ContentFingerprint,
    ) -> Result<Option<DocumentRecord>, AppError>;

    /// Insert a new record. The fingerprint uniqueness constraint
    /// arbitrates commit races; losing the race yields
    /// `AppError::CommitConflict`.
    async fn insert(&self, record: &DocumentRecord) -> Result<(), AppError>;

    /// Replace the record for a fingerprint (explicit reprocess). Inserts
    /// when no prior record exists.
    async fn supersede(&self, record: &DocumentRecord) -> Result<(), AppError>;
}

/// Access to persisted review sessions.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Persist a new pending-review session.
    async fn create(&self, session: &ReviewSession) -> Result<(), AppError>;

    /// Fetch a session by its upload correlation id.
    async fn get(&self, upload_id: Uuid) -> Result<Option<ReviewSession>, AppError>;

    /// Replace the proposed fields and scores after an operator edit.
    async fn update_proposal(
        &self,
        upload_id: Uuid,
        proposed: &ExtractionResult,
        scores: &ScoreSet,
        human_edited: bool,
        manual_fields_supplied: bool,
    ) -> Result<(), AppError>;

    /// Move a session to a new status.
    async fn set_status(&self, upload_id: Uuid, status: ReviewStatus) -> Result<(), AppError>;

    /// List sessions awaiting a verdict, oldest first.
    async fn list_pending(&self, limit: i64) -> Result<Vec<ReviewSession>, AppError>;
}
