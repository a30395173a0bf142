use bytes::Bytes;
use chrono::{DateTime, Utc};

/// The unprocessed artifact as it arrives from the messaging front end.
///
/// Ephemeral: dropped once a `DocumentRecord` is produced or the upload is
/// rejected. Never persisted in this form.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub bytes: Bytes,
    /// MIME type declared by the sender. Not trusted for wire calls; the
    /// extractor sniffs the real type from magic numbers.
    pub declared_content_type: String,
    /// Original filename, when the transport supplies one.
    pub filename: Option<String>,
    pub received_at: DateTime<Utc>,
    /// Opaque identifier of the submitting operator.
    pub submitted_by: String,
}

impl RawUpload {
    pub fn new(
        bytes: impl Into<Bytes>,
        declared_content_type: impl Into<String>,
        submitted_by: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            declared_content_type: declared_content_type.into(),
            filename: None,
            received_at: Utc::now(),
            submitted_by: submitted_by.into(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}
