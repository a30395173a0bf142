//! The tier policy: Tier 2 authoritative, Tier 1 best-effort fallback.

use std::sync::Arc;
use std::time::Duration;

use lexia_core::models::{DocumentDate, EntityKind, ExtractionResult, NamedEntity};

use crate::entities::{find_case_numbers, find_first_date};
use crate::error::ExtractError;
use crate::ocr::OcrEngine;
use crate::vision::VisionExtractor;

/// Cap on the delay between Tier 2 retry attempts.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Computes backoff for a given retry attempt (exponential with cap).
#[inline]
fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_millis(250u64.saturating_mul(1 << attempt.min(16))).min(MAX_RETRY_BACKOFF)
}

/// Runs the two extraction tiers in order and applies the fallback policy.
///
/// Both tiers are optional at configuration time; an upload that reaches
/// neither is rejected, never silently committed with empty fields.
pub struct TieredExtractor {
    ocr: Option<Arc<dyn OcrEngine>>,
    vision: Option<VisionExtractor>,
    max_retries: u32,
}

impl TieredExtractor {
    pub fn new(
        ocr: Option<Arc<dyn OcrEngine>>,
        vision: Option<VisionExtractor>,
        max_retries: u32,
    ) -> Self {
        Self {
            ocr,
            vision,
            max_retries,
        }
    }

    /// Tier 1 pass. Errors are swallowed and logged; Tier 1 is best-effort
    /// only.
    async fn tier1_text(&self, image: &[u8]) -> Option<String> {
        let ocr = self.ocr.as_ref()?;
        match ocr.recognize(image).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => {
                tracing::debug!(engine = ocr.name(), "OCR produced no text");
                None
            }
            Err(e) => {
                tracing::warn!(engine = ocr.name(), error = %e, "OCR pass failed; continuing");
                None
            }
        }
    }

    /// Tier 2 call with bounded retries on transient errors.
    async fn tier2_result(&self, image: &[u8]) -> Result<ExtractionResult, ExtractError> {
        let vision = self.vision.as_ref().ok_or(ExtractError::NotConfigured)?;

        let mut attempt = 0;
        loop {
            match vision.extract(image).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = retry_backoff(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient vision failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Promote a date or case number the vision tier missed but the OCR
    /// text contains. Promotion only: populated Tier 2 fields are never
    /// overridden.
    fn cross_check(result: &mut ExtractionResult, ocr_text: &str) {
        if !result.date.is_known() {
            if let Some(found) = find_first_date(ocr_text) {
                let parsed = DocumentDate::parse_lenient(found);
                if parsed.is_known() {
                    tracing::debug!(date = %parsed, "Promoted date from OCR cross-check");
                    result.date = parsed;
                }
            }
        }

        for number in find_case_numbers(ocr_text) {
            let already_known = result
                .case_numbers()
                .any(|n| n.eq_ignore_ascii_case(&number));
            if !already_known {
                tracing::debug!(case_number = %number, "Promoted case number from OCR cross-check");
                result
                    .entities
                    .push(NamedEntity::new(EntityKind::CaseNumber, number));
            }
        }
    }

    /// Run the tiered extraction over the raw upload bytes.
    pub async fn extract(&self, image: &[u8]) -> Result<ExtractionResult, ExtractError> {
        let ocr_text = self.tier1_text(image).await;

        match self.tier2_result(image).await {
            Ok(mut result) => {
                if let Some(ref text) = ocr_text {
                    Self::cross_check(&mut result, text);
                }
                Ok(result)
            }
            Err(tier2_err) => match ocr_text {
                Some(text) => {
                    tracing::warn!(
                        error = %tier2_err,
                        "Vision tier failed; falling back to OCR text with zero confidence"
                    );
                    Ok(ExtractionResult::from_ocr_text(text))
                }
                None => {
                    tracing::error!(error = %tier2_err, "No extraction tier could produce text");
                    Err(tier2_err)
                }
            },
        }
    }
}
