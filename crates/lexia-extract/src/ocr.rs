//! Tier 1: local OCR engine.
//!
//! Best-effort raw-text extraction. Failures here are never surfaced to
//! the caller; the tiered extractor logs and moves on.

use async_trait::async_trait;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::ExtractError;

/// A local, optional fast OCR engine.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Extract raw text from image bytes. No structured fields, no
    /// confidence value.
    async fn recognize(&self, image: &[u8]) -> Result<String, ExtractError>;
}

/// Tesseract invoked as a subprocess (`tesseract <file> stdout`).
pub struct TesseractOcr {
    binary: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &[u8]) -> Result<String, ExtractError> {
        // Tesseract reads from a file, not stdin; stage the bytes in a
        // temp file that lives until the subprocess exits.
        let mut tmp = tempfile::NamedTempFile::new()
            .map_err(|e| ExtractError::Ocr(format!("failed to create temp file: {}", e)))?;
        tmp.write_all(image)
            .map_err(|e| ExtractError::Ocr(format!("failed to stage image: {}", e)))?;
        tmp.flush()
            .map_err(|e| ExtractError::Ocr(format!("failed to stage image: {}", e)))?;

        let start = std::time::Instant::now();

        let child = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractError::Ocr(format!("failed to spawn {}: {}", self.binary, e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExtractError::Timeout(self.timeout))?
            .map_err(|e| ExtractError::Ocr(format!("{} failed: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();

        tracing::debug!(
            engine = self.name(),
            chars = text.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "OCR pass complete"
        );

        Ok(text)
    }
}
