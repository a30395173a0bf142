//! In-memory stores and fixtures for pipeline tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use uuid::Uuid;

use lexia_core::models::{
    DocumentDate, DocumentKind, DocumentRecord, EntityKind, ExtractionResult, ExtractionTier,
    NamedEntity, RawUpload, ReviewSession, ReviewStatus, ScoreSet,
};
use lexia_core::{AppError, ContentFingerprint};
use lexia_db::{DocumentStore, ReviewStore};
use lexia_storage::{LocalStorage, Storage};

use crate::commit::CommitManager;
use crate::review::ReviewService;
use crate::scorer::{RuleTable, Scorer};

fn transient_error() -> AppError {
    AppError::from(sqlx::Error::PoolClosed)
}

/// Document store over a HashMap; duplicate inserts surface as commit
/// conflicts like the real uniqueness constraint.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    records: Mutex<HashMap<String, DocumentRecord>>,
    fail_transient: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &ContentFingerprint) -> Option<DocumentRecord> {
        self.records
            .lock()
            .unwrap()
            .get(fingerprint.as_str())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Make every store call fail as if the record store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_transient.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.fail_transient.load(Ordering::SeqCst) {
            Err(transient_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn exists(&self, fingerprint: &ContentFingerprint) -> Result<bool, AppError> {
        self.check_available()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .contains_key(fingerprint.as_str()))
    }

    async fn get_by_fingerprint(
        &self,
        fingerprint: &ContentFingerprint,
    ) -> Result<Option<DocumentRecord>, AppError> {
        self.check_available()?;
        Ok(self.get(fingerprint))
    }

    async fn insert(&self, record: &DocumentRecord) -> Result<(), AppError> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();
        if records.contains_key(record.fingerprint.as_str()) {
            return Err(AppError::CommitConflict {
                fingerprint: record.fingerprint.to_string(),
            });
        }
        records.insert(record.fingerprint.to_string(), record.clone());
        Ok(())
    }

    async fn supersede(&self, record: &DocumentRecord) -> Result<(), AppError> {
        self.check_available()?;
        self.records
            .lock()
            .unwrap()
            .insert(record.fingerprint.to_string(), record.clone());
        Ok(())
    }
}

/// Review store over a HashMap keyed by upload id.
#[derive(Default)]
pub struct InMemoryReviewStore {
    sessions: Mutex<HashMap<Uuid, ReviewSession>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn create(&self, session: &ReviewSession) -> Result<(), AppError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.upload_id, session.clone());
        Ok(())
    }

    async fn get(&self, upload_id: Uuid) -> Result<Option<ReviewSession>, AppError> {
        Ok(self.sessions.lock().unwrap().get(&upload_id).cloned())
    }

    async fn update_proposal(
        &self,
        upload_id: Uuid,
        proposed: &ExtractionResult,
        scores: &ScoreSet,
        human_edited: bool,
        manual_fields_supplied: bool,
    ) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&upload_id)
            .ok_or_else(|| AppError::NotFound(format!("review session {} not found", upload_id)))?;
        session.proposed = proposed.clone();
        session.scores = *scores;
        session.human_edited = human_edited;
        session.manual_fields_supplied = manual_fields_supplied;
        session.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn set_status(&self, upload_id: Uuid, status: ReviewStatus) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&upload_id)
            .ok_or_else(|| AppError::NotFound(format!("review session {} not found", upload_id)))?;
        session.status = status;
        if status.is_terminal() {
            session.original_bytes.clear();
        }
        session.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<ReviewSession>, AppError> {
        let sessions = self.sessions.lock().unwrap();
        let mut pending: Vec<_> = sessions
            .values()
            .filter(|s| s.status == ReviewStatus::PendingReview)
            .cloned()
            .collect();
        pending.sort_by_key(|s| s.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }
}

/// Everything a pipeline test needs, wired over in-memory stores and a
/// tempdir-backed local object store.
pub struct Fixture {
    pub documents: Arc<InMemoryDocumentStore>,
    pub storage: Arc<dyn Storage>,
    pub scorer: Arc<Scorer>,
    pub review_service: Arc<ReviewService>,
    storage_root: PathBuf,
    _temp: TempDir,
}

impl Fixture {
    pub fn commit_manager(&self) -> CommitManager {
        CommitManager::new(
            self.storage.clone(),
            self.documents.clone(),
            320,
            self.scorer.rule_table_version(),
        )
    }

    pub fn storage_has(&self, key: &str) -> bool {
        self.storage_root.join(key).exists()
    }

    pub fn storage_is_empty(&self) -> bool {
        !self.storage_root.join("originals").exists()
            && !self.storage_root.join("thumbnails").exists()
    }
}

pub async fn pipeline_fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let storage_root = temp.path().to_path_buf();
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp.path(), "http://localhost:4000/artifacts".to_string())
            .await
            .unwrap(),
    );
    let documents = Arc::new(InMemoryDocumentStore::new());
    let reviews = Arc::new(InMemoryReviewStore::new());
    let scorer = Arc::new(Scorer::new(RuleTable::builtin()));

    let commit = CommitManager::new(
        storage.clone(),
        documents.clone(),
        320,
        scorer.rule_table_version(),
    );
    let review_service = Arc::new(ReviewService::new(reviews, scorer.clone(), commit));

    Fixture {
        documents,
        storage,
        scorer,
        review_service,
        storage_root,
        _temp: temp,
    }
}

/// A small real PNG, so fingerprinting and thumbnailing both work.
pub fn png_upload_bytes() -> Vec<u8> {
    let img = RgbaImage::from_pixel(64, 48, Rgba([20, 60, 180, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// A plausible Tier 2 extraction with the given confidence, plus the
/// upload and fingerprint it came from.
pub async fn accepted_session_parts(
    fx: &Fixture,
    confidence: f32,
) -> (RawUpload, ContentFingerprint, ExtractionResult, ScoreSet) {
    let bytes = png_upload_bytes();
    let fingerprint = ContentFingerprint::of(&bytes);
    let upload = RawUpload::new(bytes, "image/png", "operator-1").with_filename("report.png");

    let mut extraction = ExtractionResult {
        kind: DocumentKind::PoliceReport,
        date: DocumentDate::parse_lenient("2024-08-04"),
        title: String::new(),
        summary: "Two-vehicle collision report with minor injuries noted.".to_string(),
        text: "INCIDENT REPORT 2024-CR-00123 assault complaint ...".to_string(),
        entities: vec![NamedEntity::new(EntityKind::CaseNumber, "2024-CR-00123")],
        confidence: 0.0,
        tier: ExtractionTier::Tier2Vision,
    };
    extraction.set_title("Incident Report - 4th Ave Collision");
    extraction.set_confidence(confidence);

    let scores = fx.scorer.score(&extraction);
    (upload, fingerprint, extraction, scores)
}

/// The Tier 1 fallback shape: raw text, no structure, zero confidence.
pub fn zero_confidence_extraction() -> ExtractionResult {
    ExtractionResult::from_ocr_text("handwritten note, barely legible")
}
