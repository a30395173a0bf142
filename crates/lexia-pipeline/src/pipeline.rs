//! The intake pipeline: validate → dedupe → extract → score → propose.

use std::sync::Arc;

use lexia_core::models::{DocumentRecord, RawUpload, ReviewSession};
use lexia_core::{AppError, ContentFingerprint, UploadValidator};
use lexia_db::DocumentStore;
use lexia_extract::TieredExtractor;
use lexia_storage::Storage;

use crate::commit::CommitManager;
use crate::review::ReviewService;
use crate::scorer::Scorer;

/// What an upload resolved to.
#[derive(Debug)]
pub enum IntakeOutcome {
    /// These bytes were already ingested; nothing was extracted, scored,
    /// stored, or proposed.
    Duplicate(DocumentRecord),
    /// A proposed record awaits a human verdict, correlated by
    /// `session.upload_id`.
    PendingReview(ReviewSession),
}

/// One pipeline invocation per upload; invocations share no in-process
/// state. The record store's uniqueness constraints are the only
/// cross-invocation coordination.
pub struct IntakePipeline {
    validator: UploadValidator,
    documents: Arc<dyn DocumentStore>,
    extractor: TieredExtractor,
    scorer: Arc<Scorer>,
    reviews: Arc<ReviewService>,
    storage: Arc<dyn Storage>,
    commit: CommitManager,
}

impl IntakePipeline {
    pub fn new(
        validator: UploadValidator,
        documents: Arc<dyn DocumentStore>,
        extractor: TieredExtractor,
        scorer: Arc<Scorer>,
        reviews: Arc<ReviewService>,
        storage: Arc<dyn Storage>,
        commit: CommitManager,
    ) -> Self {
        Self {
            validator,
            documents,
            extractor,
            scorer,
            reviews,
            storage,
            commit,
        }
    }

    /// Ingest a raw upload up to the human-confirmation suspension point.
    ///
    /// The dedupe gate runs before any expensive work and fails closed: if
    /// the record store cannot be reached, the upload aborts with a
    /// retryable error rather than risking double ingestion.
    pub async fn ingest(&self, upload: RawUpload) -> Result<IntakeOutcome, AppError> {
        self.validator.validate(&upload)?;

        let fingerprint = ContentFingerprint::of(&upload.bytes);

        tracing::debug!(
            fingerprint = fingerprint.short(),
            size_bytes = upload.size(),
            submitted_by = %upload.submitted_by,
            "Upload fingerprinted"
        );

        // Dedupe gate. Errors propagate (fail closed).
        if let Some(existing) = self.documents.get_by_fingerprint(&fingerprint).await? {
            tracing::info!(
                fingerprint = fingerprint.short(),
                record_id = %existing.id,
                "Duplicate upload short-circuited"
            );
            return Ok(IntakeOutcome::Duplicate(existing));
        }

        let extraction = self
            .extractor
            .extract(&upload.bytes)
            .await
            .map_err(|e| AppError::ExtractionUnavailable(e.to_string()))?;

        let scores = self.scorer.score(&extraction);

        let session = self
            .reviews
            .propose(&upload, fingerprint, extraction, scores)
            .await?;

        Ok(IntakeOutcome::PendingReview(session))
    }

    /// Explicit reprocess: re-run extraction and scoring over the stored
    /// original bytes and supersede the prior record by fingerprint.
    ///
    /// Rule-table changes never rescore committed records implicitly; this
    /// is the only path that refreshes an accepted record's scores.
    pub async fn reprocess(
        &self,
        fingerprint: &ContentFingerprint,
    ) -> Result<DocumentRecord, AppError> {
        let existing = self
            .documents
            .get_by_fingerprint(fingerprint)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("no record for fingerprint {}", fingerprint.short()))
            })?;

        let bytes = self
            .storage
            .get(&existing.artifacts.original_key)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let extraction = self
            .extractor
            .extract(&bytes)
            .await
            .map_err(|e| AppError::ExtractionUnavailable(e.to_string()))?;
        let scores = self.scorer.score(&extraction);

        let now = chrono::Utc::now();
        let session = ReviewSession {
            upload_id: uuid::Uuid::new_v4(),
            fingerprint: fingerprint.clone(),
            manual_fields_supplied: true,
            proposed: extraction,
            scores,
            status: lexia_core::models::ReviewStatus::Accepted,
            content_type: content_type_for(&existing),
            submitted_by: "reprocess".to_string(),
            human_edited: false,
            original_bytes: bytes,
            created_at: now,
            updated_at: now,
        };

        self.commit.commit_superseding(&session).await
    }
}

/// Recover the declared content type from the stored artifact key
/// extension; the original declaration is not persisted separately.
fn content_type_for(record: &DocumentRecord) -> String {
    let ext = record
        .artifacts
        .original_key
        .rsplit('.')
        .next()
        .unwrap_or("bin");
    match ext {
        "jpg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "tif" => "image/tiff",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::ReviewOutcome;
    use crate::test_support::{pipeline_fixture, png_upload_bytes, Fixture};
    use lexia_core::models::{DocumentKind, ExtractionTier, Verdict};
    use lexia_extract::{VisionConfig, VisionExtractor};
    use std::time::Duration;

    const POLICE_REPORT_JSON: &str = r#"{
        "document_type": "police_report",
        "date": "2024-08-04",
        "title": "Incident Report - 4th Ave Collision",
        "summary": "Two-vehicle collision report. Officer noted minor injuries.",
        "full_text": "INCIDENT REPORT 2024-CR-00123 assault complaint ...",
        "people": ["J. Alvarez"],
        "organizations": ["Metro Police Department"],
        "case_numbers": ["2024-CR-00123"],
        "confidence": 0.95
    }"#;

    fn envelope(inner: &str) -> String {
        serde_json::json!({
            "content": [{ "type": "text", "text": inner }]
        })
        .to_string()
    }

    fn vision_for(server: &mockito::ServerGuard) -> VisionExtractor {
        let mut config = VisionConfig::new("sk-test-key");
        config.base_url = Some(server.url());
        config.timeout = Duration::from_secs(5);
        VisionExtractor::new(config).unwrap()
    }

    fn validator() -> UploadValidator {
        UploadValidator::new(
            10 * 1024 * 1024,
            vec!["jpg".to_string(), "png".to_string(), "pdf".to_string()],
            vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "application/pdf".to_string(),
            ],
        )
    }

    fn pipeline_with(fx: &Fixture, vision: Option<VisionExtractor>) -> IntakePipeline {
        IntakePipeline::new(
            validator(),
            fx.documents.clone(),
            TieredExtractor::new(None, vision, 0),
            fx.scorer.clone(),
            fx.review_service.clone(),
            fx.storage.clone(),
            fx.commit_manager(),
        )
    }

    fn upload() -> RawUpload {
        RawUpload::new(png_upload_bytes(), "image/png", "operator-1").with_filename("report.png")
    }

    #[tokio::test]
    async fn test_police_report_accept_scenario() {
        let fx = pipeline_fixture().await;
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope(POLICE_REPORT_JSON))
            .expect(1)
            .create_async()
            .await;

        let pipeline = pipeline_with(&fx, Some(vision_for(&server)));

        let outcome = pipeline.ingest(upload()).await.unwrap();
        let session = match outcome {
            IntakeOutcome::PendingReview(session) => session,
            other => panic!("expected PendingReview, got {:?}", other),
        };
        assert_eq!(session.proposed.kind, DocumentKind::PoliceReport);
        assert!(session.proposed.date.is_known());
        assert!(session.scores.is_in_range());
        assert!(session.scores.relevancy > 0);
        // Nothing durable yet.
        assert_eq!(fx.documents.len(), 0);
        assert!(fx.storage_is_empty());

        // Operator accepts.
        let resolved = fx
            .review_service
            .resolve(session.upload_id, Verdict::Accept, None)
            .await
            .unwrap();
        let record = match resolved {
            ReviewOutcome::Accepted(record) => record,
            other => panic!("expected Accepted, got {:?}", other),
        };
        assert_eq!(record.provenance.tier, ExtractionTier::Tier2Vision);
        assert!(!record.provenance.human_edited);
        assert_eq!(fx.documents.len(), 1);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resubmission_after_accept_is_duplicate_without_extraction() {
        let fx = pipeline_fixture().await;
        let mut server = mockito::Server::new_async().await;
        // Exactly one extraction call across both submissions.
        let mock = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope(POLICE_REPORT_JSON))
            .expect(1)
            .create_async()
            .await;

        let pipeline = pipeline_with(&fx, Some(vision_for(&server)));

        let session = match pipeline.ingest(upload()).await.unwrap() {
            IntakeOutcome::PendingReview(session) => session,
            other => panic!("expected PendingReview, got {:?}", other),
        };
        let record = match fx
            .review_service
            .resolve(session.upload_id, Verdict::Accept, None)
            .await
            .unwrap()
        {
            ReviewOutcome::Accepted(record) => record,
            other => panic!("expected Accepted, got {:?}", other),
        };

        let second = pipeline.ingest(upload()).await.unwrap();
        match second {
            IntakeOutcome::Duplicate(existing) => assert_eq!(existing.id, record.id),
            other => panic!("expected Duplicate, got {:?}", other),
        }
        assert_eq!(fx.documents.len(), 1);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_pending_reviews_allowed_before_accept() {
        let fx = pipeline_fixture().await;
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope(POLICE_REPORT_JSON))
            .expect(2)
            .create_async()
            .await;

        let pipeline = pipeline_with(&fx, Some(vision_for(&server)));

        // Neither submission has been accepted, so both proceed to review.
        let first = pipeline.ingest(upload()).await.unwrap();
        let second = pipeline.ingest(upload()).await.unwrap();
        assert!(matches!(first, IntakeOutcome::PendingReview(_)));
        assert!(matches!(second, IntakeOutcome::PendingReview(_)));
    }

    #[tokio::test]
    async fn test_extraction_unavailable_leaves_no_trace() {
        let fx = pipeline_fixture().await;
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(503)
            .with_body("down")
            .create_async()
            .await;

        // Vision down, no OCR engine configured.
        let pipeline = pipeline_with(&fx, Some(vision_for(&server)));

        let err = pipeline.ingest(upload()).await.unwrap_err();
        assert!(matches!(err, AppError::ExtractionUnavailable(_)));
        assert_eq!(fx.documents.len(), 0);
        assert!(fx.storage_is_empty());
        assert!(fx.review_service.pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed_before_extraction() {
        let fx = pipeline_fixture().await;
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope(POLICE_REPORT_JSON))
            .expect(0)
            .create_async()
            .await;

        let pipeline = pipeline_with(&fx, Some(vision_for(&server)));
        fx.documents.set_unavailable(true);

        let err = pipeline.ingest(upload()).await.unwrap_err();
        assert!(matches!(err, AppError::TransientStore(_)));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_upload_rejected_before_fingerprinting() {
        let fx = pipeline_fixture().await;
        let pipeline = pipeline_with(&fx, None);

        let bad = RawUpload::new(png_upload_bytes(), "application/zip", "operator-1");
        let err = pipeline.ingest(bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reprocess_supersedes_by_fingerprint() {
        let fx = pipeline_fixture().await;
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope(POLICE_REPORT_JSON))
            .expect(2) // ingest + reprocess
            .create_async()
            .await;

        let pipeline = pipeline_with(&fx, Some(vision_for(&server)));

        let session = match pipeline.ingest(upload()).await.unwrap() {
            IntakeOutcome::PendingReview(session) => session,
            other => panic!("expected PendingReview, got {:?}", other),
        };
        let record = match fx
            .review_service
            .resolve(session.upload_id, Verdict::Accept, None)
            .await
            .unwrap()
        {
            ReviewOutcome::Accepted(record) => record,
            other => panic!("expected Accepted, got {:?}", other),
        };

        let reprocessed = pipeline.reprocess(&record.fingerprint).await.unwrap();
        assert_eq!(reprocessed.fingerprint, record.fingerprint);
        assert_ne!(reprocessed.id, record.id);
        assert_eq!(fx.documents.len(), 1);
    }

    #[tokio::test]
    async fn test_reprocess_unknown_fingerprint_is_not_found() {
        let fx = pipeline_fixture().await;
        let pipeline = pipeline_with(&fx, None);
        let fp = ContentFingerprint::of(b"never ingested");
        let err = pipeline.reprocess(&fp).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
