//! Repository for the durable documents table.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use lexia_core::models::{
    ArtifactLocators, DocumentDate, DocumentRecord, ExtractionResult, NamedEntity, Provenance,
    ScoreSet,
};
use lexia_core::{AppError, ContentFingerprint};

use crate::traits::DocumentStore;

const SELECT_COLUMNS: &str = r#"
    id, fingerprint, kind, doc_date, title, summary, full_text, entities,
    confidence, relevancy, legal_weight, page_severity, case_severity,
    storage_backend, original_key, original_url, thumbnail_key, thumbnail_url,
    extraction_tier, human_edited, rule_table_version, created_at
"#;

/// Postgres-backed document repository.
///
/// The fingerprint UNIQUE constraint is the only dedupe/commit-race
/// coordination point; no application-level locking exists.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn row_to_record(row: &PgRow) -> Result<DocumentRecord, AppError> {
    let fingerprint: String = row.try_get("fingerprint").map_err(AppError::from)?;
    let kind: String = row.try_get("kind").map_err(AppError::from)?;
    let tier: String = row.try_get("extraction_tier").map_err(AppError::from)?;
    let backend: String = row.try_get("storage_backend").map_err(AppError::from)?;
    let doc_date: Option<chrono::NaiveDate> = row.try_get("doc_date").map_err(AppError::from)?;
    let entities: serde_json::Value = row.try_get("entities").map_err(AppError::from)?;
    let entities: Vec<NamedEntity> = serde_json::from_value(entities)?;

    let extraction = ExtractionResult {
        kind: kind
            .parse()
            .map_err(|e| AppError::Internal(format!("corrupt kind column: {}", e)))?,
        date: match doc_date {
            Some(d) => DocumentDate::On(d),
            None => DocumentDate::Unknown,
        },
        title: row.try_get("title").map_err(AppError::from)?,
        summary: row.try_get("summary").map_err(AppError::from)?,
        text: row.try_get("full_text").map_err(AppError::from)?,
        entities,
        confidence: row.try_get::<f32, _>("confidence").map_err(AppError::from)?,
        tier: tier
            .parse()
            .map_err(|e| AppError::Internal(format!("corrupt extraction_tier column: {}", e)))?,
    };

    Ok(DocumentRecord {
        id: row.try_get("id").map_err(AppError::from)?,
        fingerprint: ContentFingerprint::from_hex(&fingerprint)?,
        scores: ScoreSet {
            relevancy: row.try_get("relevancy").map_err(AppError::from)?,
            legal_weight: row.try_get("legal_weight").map_err(AppError::from)?,
            page_severity: row.try_get("page_severity").map_err(AppError::from)?,
            case_severity: row.try_get("case_severity").map_err(AppError::from)?,
        },
        artifacts: ArtifactLocators {
            backend: backend
                .parse()
                .map_err(|e| AppError::Internal(format!("corrupt storage_backend column: {}", e)))?,
            original_key: row.try_get("original_key").map_err(AppError::from)?,
            original_url: row.try_get("original_url").map_err(AppError::from)?,
            thumbnail_key: row.try_get("thumbnail_key").map_err(AppError::from)?,
            thumbnail_url: row.try_get("thumbnail_url").map_err(AppError::from)?,
        },
        provenance: Provenance {
            tier: extraction.tier,
            human_edited: row.try_get("human_edited").map_err(AppError::from)?,
            rule_table_version: row.try_get("rule_table_version").map_err(AppError::from)?,
        },
        extraction,
        created_at: row.try_get("created_at").map_err(AppError::from)?,
    })
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn exists(&self, fingerprint: &ContentFingerprint) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM documents WHERE fingerprint = $1")
            .bind(fingerprint.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    async fn get_by_fingerprint(
        &self,
        fingerprint: &ContentFingerprint,
    ) -> Result<Option<DocumentRecord>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE fingerprint = $1",
            SELECT_COLUMNS
        ))
        .bind(fingerprint.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn insert(&self, record: &DocumentRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (
                id, fingerprint, kind, doc_date, title, summary, full_text, entities,
                confidence, relevancy, legal_weight, page_severity, case_severity,
                storage_backend, original_key, original_url, thumbnail_key, thumbnail_url,
                extraction_tier, human_edited, rule_table_version, created_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18,
                $19, $20, $21, $22
            )
            "#,
        )
        .bind(record.id)
        .bind(record.fingerprint.as_str())
        .bind(record.extraction.kind.as_str())
        .bind(record.extraction.date.as_date())
        .bind(&record.extraction.title)
        .bind(&record.extraction.summary)
        .bind(&record.extraction.text)
        .bind(serde_json::to_value(&record.extraction.entities)?)
        .bind(record.extraction.confidence)
        .bind(record.scores.relevancy)
        .bind(record.scores.legal_weight)
        .bind(record.scores.page_severity)
        .bind(record.scores.case_severity)
        .bind(record.artifacts.backend.to_string())
        .bind(&record.artifacts.original_key)
        .bind(&record.artifacts.original_url)
        .bind(&record.artifacts.thumbnail_key)
        .bind(&record.artifacts.thumbnail_url)
        .bind(record.provenance.tier.to_string())
        .bind(record.provenance.human_edited)
        .bind(&record.provenance.rule_table_version)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::CommitConflict {
                fingerprint: record.fingerprint.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn supersede(&self, record: &DocumentRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO documents (
                id, fingerprint, kind, doc_date, title, summary, full_text, entities,
                confidence, relevancy, legal_weight, page_severity, case_severity,
                storage_backend, original_key, original_url, thumbnail_key, thumbnail_url,
                extraction_tier, human_edited, rule_table_version, created_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18,
                $19, $20, $21, $22
            )
            ON CONFLICT (fingerprint) DO UPDATE SET
                kind = EXCLUDED.kind,
                doc_date = EXCLUDED.doc_date,
                title = EXCLUDED.title,
                summary = EXCLUDED.summary,
                full_text = EXCLUDED.full_text,
                entities = EXCLUDED.entities,
                confidence = EXCLUDED.confidence,
                relevancy = EXCLUDED.relevancy,
                legal_weight = EXCLUDED.legal_weight,
                page_severity = EXCLUDED.page_severity,
                case_severity = EXCLUDED.case_severity,
                storage_backend = EXCLUDED.storage_backend,
                original_key = EXCLUDED.original_key,
                original_url = EXCLUDED.original_url,
                thumbnail_key = EXCLUDED.thumbnail_key,
                thumbnail_url = EXCLUDED.thumbnail_url,
                extraction_tier = EXCLUDED.extraction_tier,
                human_edited = EXCLUDED.human_edited,
                rule_table_version = EXCLUDED.rule_table_version
            "#,
        )
        .bind(record.id)
        .bind(record.fingerprint.as_str())
        .bind(record.extraction.kind.as_str())
        .bind(record.extraction.date.as_date())
        .bind(&record.extraction.title)
        .bind(&record.extraction.summary)
        .bind(&record.extraction.text)
        .bind(serde_json::to_value(&record.extraction.entities)?)
        .bind(record.extraction.confidence)
        .bind(record.scores.relevancy)
        .bind(record.scores.legal_weight)
        .bind(record.scores.page_severity)
        .bind(record.scores.case_severity)
        .bind(record.artifacts.backend.to_string())
        .bind(&record.artifacts.original_key)
        .bind(&record.artifacts.original_url)
        .bind(&record.artifacts.thumbnail_key)
        .bind(&record.artifacts.thumbnail_url)
        .bind(record.provenance.tier.to_string())
        .bind(record.provenance.human_edited)
        .bind(&record.provenance.rule_table_version)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
