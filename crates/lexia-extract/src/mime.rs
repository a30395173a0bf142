//! Media-type sniffing for the vision wire call.
//!
//! The declared MIME type on an upload is operator-supplied and not
//! trusted; the bytes themselves decide what goes on the wire.

/// Detect media type from raw data using magic numbers
pub fn detect_media_type(data: &[u8]) -> &'static str {
    if data.len() < 4 {
        return "image/jpeg"; // Default
    }

    // JPEG: FF D8 FF
    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return "image/jpeg";
    }

    // PNG: 89 50 4E 47
    if data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47 {
        return "image/png";
    }

    // PDF: 25 50 44 46 ("%PDF")
    if data[0] == 0x25 && data[1] == 0x50 && data[2] == 0x44 && data[3] == 0x46 {
        return "application/pdf";
    }

    // WebP: RIFF ... WEBP
    if data.len() >= 12
        && data[0] == 0x52
        && data[1] == 0x49
        && data[2] == 0x46
        && data[3] == 0x46
        && data[8] == 0x57
        && data[9] == 0x45
        && data[10] == 0x42
        && data[11] == 0x50
    {
        return "image/webp";
    }

    // TIFF: II*\0 or MM\0*
    if (data[0] == 0x49 && data[1] == 0x49 && data[2] == 0x2A && data[3] == 0x00)
        || (data[0] == 0x4D && data[1] == 0x4D && data[2] == 0x00 && data[3] == 0x2A)
    {
        return "image/tiff";
    }

    "image/jpeg" // Default
}
