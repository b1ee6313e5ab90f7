//! Source image intake: size ceiling, base64 encoding, data URLs.

use base64::Engine;
use std::path::Path;

use crate::image::types::{ImageFormat, REQUEST_MIME_TYPE};

/// Largest accepted source image, in bytes (1 MiB).
pub const MAX_IMAGE_BYTES: u64 = 1_048_576;

/// Reasons a selected file is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    /// The file is over [`MAX_IMAGE_BYTES`].
    #[error("Image size exceeds 1MB limit. Please choose a smaller image.")]
    TooLarge {
        /// Size of the rejected file.
        size: u64,
    },

    /// The file has no content.
    #[error("Please select an image first.")]
    Empty,

    /// The file could not be read.
    #[error("could not read {path}: {reason}")]
    Unreadable {
        /// Path that was selected.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// Base64 input could not be decoded.
    #[error("failed to decode image data: {0}")]
    Decode(String),
}

/// An image selected for editing.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    data: Vec<u8>,
    encoded: String,
    format: Option<ImageFormat>,
    file_name: Option<String>,
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("size", &self.data.len())
            .field("format", &self.format)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl SourceImage {
    /// Reads an image from disk.
    ///
    /// The size check uses file metadata, so oversized files are never read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let path = path.as_ref();
        let unreadable = |e: std::io::Error| IntakeError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let size = std::fs::metadata(path).map_err(unreadable)?.len();
        check_size(size)?;

        let data = std::fs::read(path).map_err(unreadable)?;
        let mut image = Self::from_bytes(data)?;
        image.file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        if image.format.is_none() {
            image.format = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ImageFormat::from_extension);
        }
        Ok(image)
    }

    /// Accepts raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, IntakeError> {
        check_size(data.len() as u64)?;
        if data.is_empty() {
            return Err(IntakeError::Empty);
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        let format = ImageFormat::from_magic_bytes(&data);
        tracing::debug!(size = data.len(), ?format, "accepted source image");
        Ok(Self {
            data,
            encoded,
            format,
            file_name: None,
        })
    }

    /// Accepts base64 or a `data:` URL.
    pub fn from_base64(input: &str) -> Result<Self, IntakeError> {
        let data = decode_base64_lenient(input).map_err(|e| IntakeError::Decode(e.to_string()))?;
        Self::from_bytes(data)
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Sniffed (or extension-derived) format, if recognised.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Original file name, when loaded from disk.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Standard base64 of the bytes, as sent to the vendor.
    pub fn to_base64(&self) -> &str {
        &self.encoded
    }

    /// `data:` URL using the declared request MIME type.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", REQUEST_MIME_TYPE, self.encoded)
    }
}

fn check_size(size: u64) -> Result<(), IntakeError> {
    if size > MAX_IMAGE_BYTES {
        tracing::warn!(size, limit = MAX_IMAGE_BYTES, "rejected oversized image");
        return Err(IntakeError::TooLarge { size });
    }
    Ok(())
}

/// Returns the base64 payload of a `data:` URL, or the input unchanged.
pub fn strip_data_url(input: &str) -> &str {
    let input = input.trim();
    if input.starts_with("data:") {
        if let Some((_, payload)) = input.split_once(',') {
            return payload;
        }
    }
    input
}

/// Decodes a base64 string that may be imperfectly formatted.
///
/// Accepts a `data:...;base64,` prefix, embedded whitespace and missing
/// padding.
pub fn decode_base64_lenient(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = strip_data_url(input)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD.decode(cleaned.trim_end_matches('='))
}
