//! Commit manager: artifacts to the object store, record to the record
//! store, atomically from the caller's perspective.

use std::sync::Arc;

use uuid::Uuid;

use lexia_core::models::{ArtifactLocators, DocumentRecord, Provenance, ReviewSession};
use lexia_core::AppError;
use lexia_db::DocumentStore;
use lexia_storage::{keys, Storage};

use crate::thumbnail::render_thumbnail;

/// Persists an accepted proposal.
///
/// Write order is object store first, record store second: an orphaned
/// artifact from a failed record write is harmless and reclaimable by
/// fingerprint, whereas a record without its artifact would be a broken
/// reference. The fingerprint uniqueness constraint arbitrates concurrent
/// commits; the loser is reported a duplicate with a reference to the
/// winning record.
#[derive(Clone)]
pub struct CommitManager {
    storage: Arc<dyn Storage>,
    documents: Arc<dyn DocumentStore>,
    thumbnail_max_dim: u32,
    rule_table_version: String,
}

impl CommitManager {
    pub fn new(
        storage: Arc<dyn Storage>,
        documents: Arc<dyn DocumentStore>,
        thumbnail_max_dim: u32,
        rule_table_version: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            documents,
            thumbnail_max_dim,
            rule_table_version: rule_table_version.into(),
        }
    }

    /// Build the record and write artifacts for a session.
    async fn write_artifacts_and_build(
        &self,
        session: &ReviewSession,
    ) -> Result<DocumentRecord, AppError> {
        let fingerprint = &session.fingerprint;

        let original_key = keys::original_key(fingerprint, &session.content_type);
        let original_url = self
            .storage
            .put(
                &original_key,
                &session.content_type,
                session.original_bytes.clone(),
            )
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let (thumbnail_key, thumbnail_url) =
            match render_thumbnail(&session.original_bytes, self.thumbnail_max_dim) {
                Some(thumb) => {
                    let key = keys::thumbnail_key(fingerprint);
                    let url = self
                        .storage
                        .put(&key, "image/jpeg", thumb)
                        .await
                        .map_err(|e| AppError::Storage(e.to_string()))?;
                    (Some(key), Some(url))
                }
                None => {
                    tracing::debug!(
                        fingerprint = fingerprint.short(),
                        content_type = %session.content_type,
                        "Upload not rasterizable; committing without thumbnail"
                    );
                    (None, None)
                }
            };

        Ok(DocumentRecord {
            id: Uuid::new_v4(),
            fingerprint: fingerprint.clone(),
            extraction: session.proposed.clone(),
            scores: session.scores,
            artifacts: ArtifactLocators {
                backend: self.storage.backend_type(),
                original_key,
                original_url,
                thumbnail_key,
                thumbnail_url,
            },
            provenance: Provenance {
                tier: session.proposed.tier,
                human_edited: session.human_edited,
                rule_table_version: self.rule_table_version.clone(),
            },
            created_at: chrono::Utc::now(),
        })
    }

    /// Commit an accepted session. A lost fingerprint race surfaces as
    /// `DuplicateUpload` referencing the winning record.
    pub async fn commit(&self, session: &ReviewSession) -> Result<DocumentRecord, AppError> {
        let record = self.write_artifacts_and_build(session).await?;

        match self.documents.insert(&record).await {
            Ok(()) => {
                tracing::info!(
                    record_id = %record.id,
                    fingerprint = record.fingerprint.short(),
                    tier = %record.provenance.tier,
                    human_edited = record.provenance.human_edited,
                    "Document record committed"
                );
                Ok(record)
            }
            Err(AppError::CommitConflict { .. }) => {
                // The artifact just written is orphaned but harmless; it is
                // keyed by fingerprint and the winner wrote the same bytes.
                match self.documents.get_by_fingerprint(&record.fingerprint).await? {
                    Some(existing) => Err(AppError::DuplicateUpload {
                        record_id: existing.id,
                    }),
                    None => Err(AppError::CommitConflict {
                        fingerprint: record.fingerprint.to_string(),
                    }),
                }
            }
            Err(e) => {
                tracing::warn!(
                    fingerprint = record.fingerprint.short(),
                    error = %e,
                    "Record write failed after artifact upload; artifact orphaned"
                );
                Err(e)
            }
        }
    }

    /// Commit a reprocessing run, replacing any prior record for the
    /// fingerprint.
    pub async fn commit_superseding(
        &self,
        session: &ReviewSession,
    ) -> Result<DocumentRecord, AppError> {
        let record = self.write_artifacts_and_build(session).await?;
        self.documents.supersede(&record).await?;

        tracing::info!(
            record_id = %record.id,
            fingerprint = record.fingerprint.short(),
            rule_table_version = %record.provenance.rule_table_version,
            "Document record superseded by reprocess"
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{accepted_session_parts, pipeline_fixture, png_upload_bytes};
    use lexia_core::models::{ReviewStatus, ScoreSet};
    use lexia_core::ContentFingerprint;

    fn session_from_parts(
        fingerprint: ContentFingerprint,
        extraction: lexia_core::models::ExtractionResult,
        scores: ScoreSet,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ReviewSession {
        let now = chrono::Utc::now();
        ReviewSession {
            upload_id: Uuid::new_v4(),
            fingerprint,
            manual_fields_supplied: true,
            proposed: extraction,
            scores,
            status: ReviewStatus::PendingReview,
            content_type: content_type.to_string(),
            submitted_by: "operator-1".to_string(),
            human_edited: false,
            original_bytes: bytes,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_commit_writes_original_and_thumbnail() {
        let fx = pipeline_fixture().await;
        let bytes = png_upload_bytes();
        let fingerprint = ContentFingerprint::of(&bytes);
        let (_, _, extraction, scores) = accepted_session_parts(&fx, 0.9).await;
        let session =
            session_from_parts(fingerprint.clone(), extraction, scores, bytes, "image/png");

        let record = fx.commit_manager().commit(&session).await.unwrap();

        assert_eq!(record.artifacts.original_key, format!("originals/{}.png", fingerprint));
        assert!(record.artifacts.thumbnail_key.is_some());
        assert!(record.thumbnail_url().is_some());
        assert_eq!(record.provenance.rule_table_version, fx.scorer.rule_table_version());
        assert!(fx.storage_has(&record.artifacts.original_key));
        assert!(fx.storage_has(record.artifacts.thumbnail_key.as_ref().unwrap()));
    }

    #[tokio::test]
    async fn test_pdf_commits_without_thumbnail() {
        let fx = pipeline_fixture().await;
        let bytes = b"%PDF-1.7 fake pdf body".to_vec();
        let fingerprint = ContentFingerprint::of(&bytes);
        let (_, _, extraction, scores) = accepted_session_parts(&fx, 0.9).await;
        let session = session_from_parts(
            fingerprint,
            extraction,
            scores,
            bytes,
            "application/pdf",
        );

        let record = fx.commit_manager().commit(&session).await.unwrap();
        assert!(record.artifacts.thumbnail_key.is_none());
        assert!(record.thumbnail_url().is_none());
        assert!(record.artifacts.original_key.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_second_commit_for_same_fingerprint_is_duplicate() {
        let fx = pipeline_fixture().await;
        let bytes = png_upload_bytes();
        let fingerprint = ContentFingerprint::of(&bytes);
        let (_, _, extraction, scores) = accepted_session_parts(&fx, 0.9).await;

        let first = session_from_parts(
            fingerprint.clone(),
            extraction.clone(),
            scores,
            bytes.clone(),
            "image/png",
        );
        let second = session_from_parts(fingerprint, extraction, scores, bytes, "image/png");

        let winner = fx.commit_manager().commit(&first).await.unwrap();
        let err = fx.commit_manager().commit(&second).await.unwrap_err();
        match err {
            AppError::DuplicateUpload { record_id } => assert_eq!(record_id, winner.id),
            other => panic!("expected DuplicateUpload, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_supersede_replaces_record() {
        let fx = pipeline_fixture().await;
        let bytes = png_upload_bytes();
        let fingerprint = ContentFingerprint::of(&bytes);
        let (_, _, extraction, scores) = accepted_session_parts(&fx, 0.9).await;

        let first = session_from_parts(
            fingerprint.clone(),
            extraction.clone(),
            scores,
            bytes.clone(),
            "image/png",
        );
        fx.commit_manager().commit(&first).await.unwrap();

        let mut updated = extraction.clone();
        updated.set_title("Reprocessed title");
        let second = session_from_parts(
            fingerprint.clone(),
            updated,
            scores,
            bytes,
            "image/png",
        );
        fx.commit_manager()
            .commit_superseding(&second)
            .await
            .unwrap();

        let stored = fx.documents.get(&fingerprint).unwrap();
        assert_eq!(stored.extraction.title, "Reprocessed title");
    }
}
