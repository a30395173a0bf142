//! Repository for persisted review sessions.
//!
//! A pending review is a durable row, not an in-memory wait: the pipeline
//! invocation that proposed it holds nothing while the verdict is pending,
//! and the verdict arrives as a separate invocation correlated by
//! `upload_id`. The original upload bytes are staged in the row until a
//! terminal verdict clears them.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use lexia_core::models::{ExtractionResult, ReviewSession, ReviewStatus, ScoreSet};
use lexia_core::{AppError, ContentFingerprint};

use crate::traits::ReviewStore;

const SELECT_COLUMNS: &str = r#"
    upload_id, fingerprint, proposed, relevancy, legal_weight, page_severity,
    case_severity, status, content_type, submitted_by, human_edited,
    manual_fields_supplied, original_bytes, created_at, updated_at
"#;

/// Postgres-backed review-session repository.
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: &PgRow) -> Result<ReviewSession, AppError> {
    let fingerprint: String = row.try_get("fingerprint").map_err(AppError::from)?;
    let status: String = row.try_get("status").map_err(AppError::from)?;
    let proposed: serde_json::Value = row.try_get("proposed").map_err(AppError::from)?;

    Ok(ReviewSession {
        upload_id: row.try_get("upload_id").map_err(AppError::from)?,
        fingerprint: ContentFingerprint::from_hex(&fingerprint)?,
        proposed: serde_json::from_value(proposed)?,
        scores: ScoreSet {
            relevancy: row.try_get("relevancy").map_err(AppError::from)?,
            legal_weight: row.try_get("legal_weight").map_err(AppError::from)?,
            page_severity: row.try_get("page_severity").map_err(AppError::from)?,
            case_severity: row.try_get("case_severity").map_err(AppError::from)?,
        },
        status: status
            .parse()
            .map_err(|e| AppError::Internal(format!("corrupt status column: {}", e)))?,
        content_type: row.try_get("content_type").map_err(AppError::from)?,
        submitted_by: row.try_get("submitted_by").map_err(AppError::from)?,
        human_edited: row.try_get("human_edited").map_err(AppError::from)?,
        manual_fields_supplied: row
            .try_get("manual_fields_supplied")
            .map_err(AppError::from)?,
        original_bytes: row.try_get("original_bytes").map_err(AppError::from)?,
        created_at: row.try_get("created_at").map_err(AppError::from)?,
        updated_at: row.try_get("updated_at").map_err(AppError::from)?,
    })
}

#[async_trait]
impl ReviewStore for ReviewRepository {
    async fn create(&self, session: &ReviewSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO review_sessions (
                upload_id, fingerprint, proposed, relevancy, legal_weight,
                page_severity, case_severity, status, content_type,
                submitted_by, human_edited, manual_fields_supplied,
                original_bytes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(session.upload_id)
        .bind(session.fingerprint.as_str())
        .bind(serde_json::to_value(&session.proposed)?)
        .bind(session.scores.relevancy)
        .bind(session.scores.legal_weight)
        .bind(session.scores.page_severity)
        .bind(session.scores.case_severity)
        .bind(session.status.as_str())
        .bind(&session.content_type)
        .bind(&session.submitted_by)
        .bind(session.human_edited)
        .bind(session.manual_fields_supplied)
        .bind(&session.original_bytes)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, upload_id: Uuid) -> Result<Option<ReviewSession>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM review_sessions WHERE upload_id = $1",
            SELECT_COLUMNS
        ))
        .bind(upload_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn update_proposal(
        &self,
        upload_id: Uuid,
        proposed: &ExtractionResult,
        scores: &ScoreSet,
        human_edited: bool,
        manual_fields_supplied: bool,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE review_sessions
            SET proposed = $2, relevancy = $3, legal_weight = $4,
                page_severity = $5, case_severity = $6, human_edited = $7,
                manual_fields_supplied = $8, updated_at = NOW()
            WHERE upload_id = $1
            "#,
        )
        .bind(upload_id)
        .bind(serde_json::to_value(proposed)?)
        .bind(scores.relevancy)
        .bind(scores.legal_weight)
        .bind(scores.page_severity)
        .bind(scores.case_severity)
        .bind(human_edited)
        .bind(manual_fields_supplied)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "review session {} not found",
                upload_id
            )));
        }

        Ok(())
    }

    async fn set_status(&self, upload_id: Uuid, status: ReviewStatus) -> Result<(), AppError> {
        // Terminal verdicts also drop the staged bytes; the artifact is
        // either committed to the object store by now or abandoned.
        let result = sqlx::query(
            r#"
            UPDATE review_sessions
            SET status = $2,
                original_bytes = CASE WHEN $3 THEN ''::bytea ELSE original_bytes END,
                updated_at = NOW()
            WHERE upload_id = $1
            "#,
        )
        .bind(upload_id)
        .bind(status.as_str())
        .bind(status.is_terminal())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "review session {} not found",
                upload_id
            )));
        }

        Ok(())
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<ReviewSession>, AppError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM review_sessions
            WHERE status = 'pending_review'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
            SELECT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_session).collect()
    }
}
