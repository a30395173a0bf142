//! DB-backed confirmation service: `propose` and `resolve`.

use std::sync::Arc;

use uuid::Uuid;

use lexia_core::models::{
    DocumentRecord, FieldOverrides, RawUpload, ReviewSession, ReviewStatus, ScoreSet, Verdict,
};
use lexia_core::{AppError, ContentFingerprint};
use lexia_db::ReviewStore;

use crate::commit::CommitManager;
use crate::review::state::{next_status, status_after_edit};
use crate::scorer::Scorer;

/// Result of resolving a verdict.
#[derive(Debug)]
pub enum ReviewOutcome {
    /// The proposal was accepted and committed.
    Accepted(DocumentRecord),
    /// The proposal was released; nothing was written anywhere.
    Rejected,
    /// An edit was merged and re-scored; the session awaits a new verdict.
    PendingReview(ReviewSession),
}

/// Drives review sessions through the confirmation state machine.
///
/// `propose` persists a pending session and returns; no worker waits on
/// the verdict. `resolve` is invoked later (typically from a different
/// process) with the upload's correlation id.
pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    scorer: Arc<Scorer>,
    commit: CommitManager,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewStore>, scorer: Arc<Scorer>, commit: CommitManager) -> Self {
        Self {
            reviews,
            scorer,
            commit,
        }
    }

    /// Persist a proposed record for human review. Returns the session,
    /// whose `upload_id` correlates the eventual verdict.
    pub async fn propose(
        &self,
        upload: &RawUpload,
        fingerprint: ContentFingerprint,
        proposed: lexia_core::models::ExtractionResult,
        scores: ScoreSet,
    ) -> Result<ReviewSession, AppError> {
        let now = chrono::Utc::now();
        let session = ReviewSession {
            upload_id: Uuid::new_v4(),
            fingerprint,
            manual_fields_supplied: !proposed.needs_manual_fields(),
            proposed,
            scores,
            status: ReviewStatus::PendingReview,
            content_type: upload.declared_content_type.clone(),
            submitted_by: upload.submitted_by.clone(),
            human_edited: false,
            original_bytes: upload.bytes.to_vec(),
            created_at: now,
            updated_at: now,
        };

        self.reviews.create(&session).await?;

        tracing::info!(
            upload_id = %session.upload_id,
            fingerprint = session.fingerprint.short(),
            kind = %session.proposed.kind,
            confidence = session.proposed.confidence,
            "Proposed record awaiting review"
        );

        Ok(session)
    }

    /// Sessions awaiting a verdict, oldest first.
    pub async fn pending(&self, limit: i64) -> Result<Vec<ReviewSession>, AppError> {
        self.reviews.list_pending(limit).await
    }

    /// Apply a verdict to a pending session.
    ///
    /// - `Accept` commits the proposal (object store + record store) and
    ///   ends the session. Zero-confidence proposals must first have had
    ///   their structured fields supplied through an edit.
    /// - `Edit` merges the overrides, re-scores the merged result, and
    ///   re-enters review.
    /// - `Reject` releases the session without contacting the object
    ///   store or writing a record.
    pub async fn resolve(
        &self,
        upload_id: Uuid,
        verdict: Verdict,
        overrides: Option<FieldOverrides>,
    ) -> Result<ReviewOutcome, AppError> {
        let session = self
            .reviews
            .get(upload_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("review session {} not found", upload_id)))?;

        let next = next_status(session.status, verdict)?;

        match next {
            ReviewStatus::Rejected => {
                self.reviews
                    .set_status(upload_id, ReviewStatus::Rejected)
                    .await?;
                tracing::info!(upload_id = %upload_id, "Review rejected; proposal released");
                Ok(ReviewOutcome::Rejected)
            }

            ReviewStatus::Editing => {
                let overrides = overrides.filter(|o| !o.is_empty()).ok_or_else(|| {
                    AppError::InvalidInput(
                        "edit verdict requires at least one field override".to_string(),
                    )
                })?;

                let merged = overrides.apply(&session.proposed);
                // Scores always reflect the latest field values.
                let scores = self.scorer.score(&merged);

                let manual_fields_supplied = session.manual_fields_supplied
                    || !merged.needs_manual_fields()
                    || overrides.covers_required_fields();

                self.reviews
                    .update_proposal(upload_id, &merged, &scores, true, manual_fields_supplied)
                    .await?;

                // Re-enter review with the merged proposal.
                let status = status_after_edit();
                debug_assert_eq!(status, ReviewStatus::PendingReview);

                let session = self.reviews.get(upload_id).await?.ok_or_else(|| {
                    AppError::Internal(format!("review session {} vanished mid-edit", upload_id))
                })?;

                tracing::info!(
                    upload_id = %upload_id,
                    kind = %session.proposed.kind,
                    "Edit merged and re-scored; awaiting new verdict"
                );

                Ok(ReviewOutcome::PendingReview(session))
            }

            ReviewStatus::Accepted => {
                if !session.manual_fields_supplied {
                    return Err(AppError::InvalidReviewState(
                        "cannot accept: extraction had zero confidence and the document type, \
                         date, and title have not been supplied"
                            .to_string(),
                    ));
                }

                match self.commit.commit(&session).await {
                    Ok(record) => {
                        self.reviews
                            .set_status(upload_id, ReviewStatus::Accepted)
                            .await?;
                        tracing::info!(
                            upload_id = %upload_id,
                            record_id = %record.id,
                            "Review accepted and committed"
                        );
                        Ok(ReviewOutcome::Accepted(record))
                    }
                    Err(AppError::DuplicateUpload { record_id }) => {
                        // A concurrent session for the same bytes won the
                        // commit race; this review is moot.
                        self.reviews
                            .set_status(upload_id, ReviewStatus::Accepted)
                            .await?;
                        Err(AppError::DuplicateUpload { record_id })
                    }
                    Err(e) => Err(e),
                }
            }

            ReviewStatus::PendingReview => unreachable!("next_status never yields PendingReview"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        accepted_session_parts, pipeline_fixture, zero_confidence_extraction, Fixture,
    };
    use lexia_core::models::{DocumentDate, DocumentKind};

    async fn propose_fixture(fx: &Fixture, confidence: f32) -> ReviewSession {
        let (upload, fingerprint, extraction, scores) =
            accepted_session_parts(fx, confidence).await;
        fx.review_service
            .propose(&upload, fingerprint, extraction, scores)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_accept_commits_exactly_one_record() {
        let fx = pipeline_fixture().await;
        let session = propose_fixture(&fx, 0.95).await;

        let outcome = fx
            .review_service
            .resolve(session.upload_id, Verdict::Accept, None)
            .await
            .unwrap();

        let record = match outcome {
            ReviewOutcome::Accepted(record) => record,
            other => panic!("expected Accepted, got {:?}", other),
        };
        assert_eq!(record.fingerprint, session.fingerprint);
        assert!(!record.provenance.human_edited);
        assert!(fx.documents.get(&session.fingerprint).is_some());
    }

    #[tokio::test]
    async fn test_reject_writes_nothing() {
        let fx = pipeline_fixture().await;
        let session = propose_fixture(&fx, 0.95).await;

        let outcome = fx
            .review_service
            .resolve(session.upload_id, Verdict::Reject, None)
            .await
            .unwrap();

        assert!(matches!(outcome, ReviewOutcome::Rejected));
        assert!(fx.documents.get(&session.fingerprint).is_none());
        assert!(fx.storage_is_empty());
    }

    #[tokio::test]
    async fn test_edit_rescores_and_reenters_review() {
        let fx = pipeline_fixture().await;
        let session = propose_fixture(&fx, 0.95).await;
        let before = session.scores;

        let overrides = FieldOverrides {
            date: Some(DocumentDate::parse_lenient("2024-08-04")),
            ..Default::default()
        };
        let outcome = fx
            .review_service
            .resolve(session.upload_id, Verdict::Edit, Some(overrides))
            .await
            .unwrap();

        let updated = match outcome {
            ReviewOutcome::PendingReview(s) => s,
            other => panic!("expected PendingReview, got {:?}", other),
        };
        assert_eq!(updated.status, ReviewStatus::PendingReview);
        assert!(updated.human_edited);
        assert!(updated.proposed.date.is_known());
        // The dated contribution moved the scores.
        assert!(updated.scores.legal_weight > before.legal_weight);
    }

    #[tokio::test]
    async fn test_edit_without_overrides_is_invalid_input() {
        let fx = pipeline_fixture().await;
        let session = propose_fixture(&fx, 0.95).await;

        let err = fx
            .review_service
            .resolve(session.upload_id, Verdict::Edit, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_zero_confidence_blocks_accept_until_fields_supplied() {
        let fx = pipeline_fixture().await;
        let (upload, fingerprint, _, _) = accepted_session_parts(&fx, 0.95).await;
        let extraction = zero_confidence_extraction();
        let scores = fx.scorer.score(&extraction);
        let session = fx
            .review_service
            .propose(&upload, fingerprint, extraction, scores)
            .await
            .unwrap();

        // Direct accept is refused.
        let err = fx
            .review_service
            .resolve(session.upload_id, Verdict::Accept, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidReviewState(_)));

        // A partial edit does not unlock accept either.
        let partial = FieldOverrides {
            summary: Some("operator summary".to_string()),
            ..Default::default()
        };
        fx.review_service
            .resolve(session.upload_id, Verdict::Edit, Some(partial))
            .await
            .unwrap();
        let err = fx
            .review_service
            .resolve(session.upload_id, Verdict::Accept, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidReviewState(_)));

        // Supplying type, date, and title unlocks accept.
        let full = FieldOverrides {
            kind: Some(DocumentKind::Correspondence),
            date: Some(DocumentDate::Unknown),
            title: Some("Handwritten note".to_string()),
            summary: None,
        };
        fx.review_service
            .resolve(session.upload_id, Verdict::Edit, Some(full))
            .await
            .unwrap();
        let outcome = fx
            .review_service
            .resolve(session.upload_id, Verdict::Accept, None)
            .await
            .unwrap();
        let record = match outcome {
            ReviewOutcome::Accepted(record) => record,
            other => panic!("expected Accepted, got {:?}", other),
        };
        assert!(record.provenance.human_edited);
        assert_eq!(record.extraction.kind, DocumentKind::Correspondence);
    }

    #[tokio::test]
    async fn test_resolved_session_refuses_further_verdicts() {
        let fx = pipeline_fixture().await;
        let session = propose_fixture(&fx, 0.95).await;

        fx.review_service
            .resolve(session.upload_id, Verdict::Reject, None)
            .await
            .unwrap();

        let err = fx
            .review_service
            .resolve(session.upload_id, Verdict::Accept, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidReviewState(_)));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let fx = pipeline_fixture().await;
        let err = fx
            .review_service
            .resolve(Uuid::new_v4(), Verdict::Accept, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_commit_race_loser_reports_duplicate() {
        let fx = pipeline_fixture().await;
        // Two sessions over identical bytes are both allowed to reach
        // review; the store constraint arbitrates at commit time.
        let first = propose_fixture(&fx, 0.95).await;
        let second = propose_fixture(&fx, 0.95).await;
        assert_eq!(first.fingerprint, second.fingerprint);

        let outcome = fx
            .review_service
            .resolve(first.upload_id, Verdict::Accept, None)
            .await
            .unwrap();
        let winner = match outcome {
            ReviewOutcome::Accepted(record) => record,
            other => panic!("expected Accepted, got {:?}", other),
        };

        let err = fx
            .review_service
            .resolve(second.upload_id, Verdict::Accept, None)
            .await
            .unwrap_err();
        match err {
            AppError::DuplicateUpload { record_id } => assert_eq!(record_id, winner.id),
            other => panic!("expected DuplicateUpload, got {:?}", other),
        }
    }
}
