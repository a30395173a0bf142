//! Upload validation, applied before any fingerprinting or extraction.

use std::path::Path;

use crate::models::RawUpload;

/// Common validation errors for incoming uploads
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Content type {content_type} does not match extension {extension}")]
    ContentTypeMismatch {
        content_type: String,
        extension: String,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Upload validator
///
/// Provides size, extension, and content-type checks for raw uploads
/// without coupling to storage or extraction details.
pub struct UploadValidator {
    max_upload_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl UploadValidator {
    pub fn new(
        max_upload_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_upload_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    /// Validate size
    pub fn validate_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_upload_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_upload_size,
            });
        }

        Ok(())
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate that the declared Content-Type agrees with the file
    /// extension. This prevents spoofed declarations from routing a file
    /// to the wrong processing path.
    pub fn validate_extension_content_type_match(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        let normalized = content_type.to_lowercase();

        let expected: &[&str] = match extension.as_str() {
            "jpg" | "jpeg" => &["image/jpeg"],
            "png" => &["image/png"],
            "webp" => &["image/webp"],
            "pdf" => &["application/pdf"],
            "tif" | "tiff" => &["image/tiff"],
            // Unmapped extensions were already filtered by validate_extension
            _ => return Ok(()),
        };

        if !expected.contains(&normalized.as_str()) {
            return Err(ValidationError::ContentTypeMismatch {
                content_type: content_type.to_string(),
                extension,
            });
        }

        Ok(())
    }

    /// Run all applicable checks on an upload. Extension checks run only
    /// when the transport supplied a filename.
    pub fn validate(&self, upload: &RawUpload) -> Result<(), ValidationError> {
        self.validate_size(upload.size())?;
        self.validate_content_type(&upload.declared_content_type)?;
        if let Some(ref filename) = upload.filename {
            self.validate_extension(filename)?;
            self.validate_extension_content_type_match(filename, &upload.declared_content_type)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> UploadValidator {
        UploadValidator::new(
            1024,
            vec!["jpg".to_string(), "pdf".to_string()],
            vec!["image/jpeg".to_string(), "application/pdf".to_string()],
        )
    }

    fn upload(bytes: &[u8], content_type: &str) -> RawUpload {
        RawUpload::new(bytes.to_vec(), content_type, "operator-1")
    }

    #[test]
    fn test_empty_file_rejected() {
        let err = validator().validate(&upload(b"", "image/jpeg")).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyFile));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let big = vec![0u8; 2048];
        let err = validator().validate(&upload(&big, "image/jpeg")).unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[test]
    fn test_unknown_content_type_rejected() {
        let err = validator()
            .validate(&upload(b"data", "application/zip"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContentType { .. }));
    }

    #[test]
    fn test_extension_content_type_mismatch() {
        let u = upload(b"data", "application/pdf").with_filename("scan.jpg");
        let err = validator().validate(&u).unwrap_err();
        assert!(matches!(err, ValidationError::ContentTypeMismatch { .. }));
    }

    #[test]
    fn test_valid_upload_passes() {
        let u = upload(b"data", "image/jpeg").with_filename("scan.jpg");
        assert!(validator().validate(&u).is_ok());
    }

    #[test]
    fn test_missing_filename_skips_extension_checks() {
        assert!(validator().validate(&upload(b"data", "image/jpeg")).is_ok());
    }
}
