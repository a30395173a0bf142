use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extraction::{ExtractionResult, ExtractionTier};
use super::score::ScoreSet;
use crate::fingerprint::ContentFingerprint;
use crate::storage_types::StorageBackend;

/// Object-store locators for the committed artifacts.
///
/// The original is always present; the thumbnail is absent for uploads the
/// renderer cannot rasterize (e.g. PDFs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactLocators {
    pub backend: StorageBackend,
    pub original_key: String,
    pub original_url: String,
    pub thumbnail_key: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Record of which tier and whether human edits produced the accepted
/// fields, plus the rule-table version behind the stored scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub tier: ExtractionTier,
    pub human_edited: bool,
    pub rule_table_version: String,
}

/// The durable entity: one per unique content fingerprint.
///
/// Created only by the commit manager upon ACCEPT; immutable thereafter
/// except through an explicit reprocess, which supersedes the record by
/// fingerprint match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub fingerprint: ContentFingerprint,
    pub extraction: ExtractionResult,
    pub scores: ScoreSet,
    pub artifacts: ArtifactLocators,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn original_url(&self) -> &str {
        &self.artifacts.original_url
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.artifacts.thumbnail_url.as_deref()
    }
}
