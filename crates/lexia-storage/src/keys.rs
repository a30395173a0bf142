//! Shared key generation for storage backends.
//!
//! Key format: `originals/{fingerprint}.{ext}` and
//! `thumbnails/{fingerprint}.jpg`. The extension is derived from the
//! upload's declared content type, never from a client-supplied filename.

use lexia_core::ContentFingerprint;

/// Prefix for original artifacts.
pub const ORIGINALS_PREFIX: &str = "originals";

/// Prefix for derived thumbnails.
pub const THUMBNAILS_PREFIX: &str = "thumbnails";

/// Generate the storage key for an original artifact.
pub fn original_key(fingerprint: &ContentFingerprint, content_type: &str) -> String {
    format!(
        "{}/{}.{}",
        ORIGINALS_PREFIX,
        fingerprint,
        extension_for(content_type)
    )
}

/// Generate the storage key for a derived thumbnail. Thumbnails are always
/// JPEG.
pub fn thumbnail_key(fingerprint: &ContentFingerprint) -> String {
    format!("{}/{}.jpg", THUMBNAILS_PREFIX, fingerprint)
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type.to_lowercase().as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/tiff" => "tif",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}
