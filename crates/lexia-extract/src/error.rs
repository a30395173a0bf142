//! Extraction error types.

use std::time::Duration;

/// Errors from a single extraction tier.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Could not reach the extraction service at all.
    #[error("extraction transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("extraction service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The service answered, but the payload did not contain the required
    /// fields.
    #[error("malformed extraction response: {0}")]
    Malformed(String),

    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    /// The tier is not configured for this deployment.
    #[error("extraction tier not configured")]
    NotConfigured,

    /// Local OCR engine failure.
    #[error("OCR failed: {0}")]
    Ocr(String),
}

impl ExtractError {
    /// Whether retrying the same call may succeed. Only transport-level
    /// failures, timeouts, and server-side throttling qualify; a malformed
    /// response or a client error will not improve on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractError::Transport(_) | ExtractError::Timeout(_) => true,
            ExtractError::Api { status, .. } => *status == 429 || *status >= 500,
            ExtractError::Malformed(_) | ExtractError::NotConfigured | ExtractError::Ocr(_) => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ExtractError::Transport("connection reset".into()).is_transient());
        assert!(ExtractError::Timeout(Duration::from_secs(90)).is_transient());
        assert!(ExtractError::Api {
            status: 529,
            body: "overloaded".into()
        }
        .is_transient());
        assert!(ExtractError::Api {
            status: 429,
            body: "rate limited".into()
        }
        .is_transient());
        assert!(!ExtractError::Api {
            status: 400,
            body: "bad request".into()
        }
        .is_transient());
        assert!(!ExtractError::Malformed("no json".into()).is_transient());
        assert!(!ExtractError::NotConfigured.is_transient());
    }
}
