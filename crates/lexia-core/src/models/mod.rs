//! Domain models for the intake pipeline.

pub mod extraction;
pub mod record;
pub mod review;
pub mod score;
pub mod upload;

pub use extraction::{
    DocumentDate, DocumentKind, EntityKind, ExtractionResult, ExtractionTier, NamedEntity,
    MAX_TITLE_LEN,
};
pub use record::{ArtifactLocators, DocumentRecord, Provenance};
pub use review::{FieldOverrides, ReviewSession, ReviewStatus, Verdict};
pub use score::{ScoreSet, SCORE_MAX};
pub use upload::RawUpload;
