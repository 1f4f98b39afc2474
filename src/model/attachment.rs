//! Attachment payloads as produced by the MIME decoder.
//!
//! Parts live only between decoding and the attachment store; records keep
//! just the paths the bytes were written to.

/// One decoded attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentPart {
    /// File name from `Content-Disposition`/`Content-Type`. Generated if missing.
    pub filename: String,

    /// MIME content type (e.g. `"application/pdf"`).
    pub content_type: String,

    /// Transfer-decoded content.
    pub data: Vec<u8>,
}

impl AttachmentPart {
    /// Decoded size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
