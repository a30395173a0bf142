//! Lexia tiered extraction.
//!
//! Two ordered strategies for turning raw upload bytes into an
//! [`ExtractionResult`](lexia_core::models::ExtractionResult):
//!
//! - **Tier 1**: a fast, local OCR engine ([`OcrEngine`]). Best-effort,
//!   raw text only, no structured fields, errors swallowed and logged.
//! - **Tier 2**: a single remote call to a vision-capable model
//!   ([`VisionExtractor`]), authoritative when it succeeds.
//!
//! [`TieredExtractor`] applies the tier policy: Tier 2 wins, Tier 1
//! substitutes with confidence forced to 0, and an upload with neither
//! tier available is rejected rather than committed with empty fields.

pub mod entities;
pub mod error;
pub mod mime;
pub mod ocr;
pub mod tiered;
pub mod vision;

pub use error::ExtractError;
pub use mime::detect_media_type;
pub use ocr::{OcrEngine, TesseractOcr};
pub use tiered::TieredExtractor;
pub use vision::{VisionConfig, VisionExtractor};
