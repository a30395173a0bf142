//! Content fingerprint: the dedupe key for raw uploads.
//!
//! The fingerprint is a SHA-256 digest over the raw upload bytes,
//! hex-encoded. Identical bytes always yield the identical fingerprint; it
//! is computed once per upload and never mutated.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Hex length of a SHA-256 digest.
const HEX_LEN: usize = 64;

/// Deterministic content digest of an upload's raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Compute the fingerprint of the given bytes. Pure and deterministic.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        ContentFingerprint(hex::encode(digest))
    }

    /// Reconstruct a fingerprint from its stored hex form.
    pub fn from_hex(s: &str) -> Result<Self, crate::AppError> {
        let lowered = s.to_ascii_lowercase();
        if lowered.len() != HEX_LEN || !lowered.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(crate::AppError::InvalidInput(format!(
                "not a valid content fingerprint: {:?}",
                s
            )));
        }
        Ok(ContentFingerprint(lowered))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl Display for ContentFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentFingerprint {
    type Error = crate::AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ContentFingerprint::from_hex(&s)
    }
}
