use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::extraction::{
    truncate_title, DocumentDate, DocumentKind, ExtractionResult,
};
use super::score::ScoreSet;
use crate::error::AppError;
use crate::fingerprint::ContentFingerprint;

/// The three-way human decision resolving a pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Edit,
    Reject,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Verdict::Accept => f.write_str("accept"),
            Verdict::Edit => f.write_str("edit"),
            Verdict::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for Verdict {
    type Err = AppError;

    /// An unrecognized verdict is rejected with no state change.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Ok(Verdict::Accept),
            "edit" => Ok(Verdict::Edit),
            "reject" => Ok(Verdict::Reject),
            other => Err(AppError::InvalidVerdict(format!(
                "unknown verdict '{}'",
                other
            ))),
        }
    }
}

/// Operator-supplied replacements for any subset of the extraction fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldOverrides {
    pub kind: Option<DocumentKind>,
    pub date: Option<DocumentDate>,
    pub title: Option<String>,
    pub summary: Option<String>,
}

impl FieldOverrides {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.date.is_none()
            && self.title.is_none()
            && self.summary.is_none()
    }

    /// Whether the overrides supply every structured field a zero-confidence
    /// fallback result is missing.
    pub fn covers_required_fields(&self) -> bool {
        self.kind.is_some() && self.date.is_some() && self.title.is_some()
    }

    /// Merge the overrides into an extraction result. Overridden titles are
    /// truncated to the same bound as extracted ones.
    pub fn apply(&self, base: &ExtractionResult) -> ExtractionResult {
        let mut merged = base.clone();
        if let Some(kind) = self.kind {
            merged.kind = kind;
        }
        if let Some(date) = self.date {
            merged.date = date;
        }
        if let Some(ref title) = self.title {
            merged.title = truncate_title(title);
        }
        if let Some(ref summary) = self.summary {
            merged.summary = summary.clone();
        }
        merged
    }
}

/// States of a review session.
///
/// `PendingReview` and `Editing` are live; `Accepted` and `Rejected` are
/// terminal. There is no timeout-based auto-resolution: a session that
/// never receives a verdict stays pending indefinitely and holds no lock
/// on its fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    PendingReview,
    Editing,
    Accepted,
    Rejected,
}

impl ReviewStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewStatus::Accepted | ReviewStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::PendingReview => "pending_review",
            ReviewStatus::Editing => "editing",
            ReviewStatus::Accepted => "accepted",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl Display for ReviewStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_review" => Ok(ReviewStatus::PendingReview),
            "editing" => Ok(ReviewStatus::Editing),
            "accepted" => Ok(ReviewStatus::Accepted),
            "rejected" => Ok(ReviewStatus::Rejected),
            _ => Err(anyhow::anyhow!("Unknown review status: {}", s)),
        }
    }
}

/// A persisted pending review: the proposed record awaiting a verdict,
/// correlated with its upload by an opaque identifier.
///
/// The invocation that created the session holds no resource while the
/// session awaits a verdict; the verdict arrives as a separate invocation.
/// The original bytes are staged in the session row so the commit manager
/// can write the object-store artifacts at accept time, and a rejection
/// never touches the object store at all.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    /// Opaque per-upload correlation identifier.
    pub upload_id: Uuid,
    pub fingerprint: ContentFingerprint,
    pub proposed: ExtractionResult,
    pub scores: ScoreSet,
    pub status: ReviewStatus,
    /// Declared MIME type of the original upload, carried through for the
    /// artifact keys at commit time.
    pub content_type: String,
    pub submitted_by: String,
    pub human_edited: bool,
    /// Whether the structured fields required for ACCEPT are present.
    /// Initialized true for extractions with confidence above zero; a
    /// zero-confidence fallback flips this only once an edit supplies
    /// kind, date, and title.
    pub manual_fields_supplied: bool,
    /// Raw upload bytes, staged until a terminal verdict. Cleared when the
    /// session reaches a terminal state.
    pub original_bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
