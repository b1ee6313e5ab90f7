//! Core types for image editing requests and responses.

use serde::{Deserialize, Serialize};

use crate::credential::ApiKey;

/// MIME type declared for every uploaded image.
///
/// The vendor sniffs the real bytes, so PNG and WebP uploads still work.
pub const REQUEST_MIME_TYPE: &str = "image/jpeg";

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    #[default]
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Maps a declared MIME type back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// One multimodal edit: credential, inline image and instruction.
///
/// Exists only for the duration of a single call.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Key sent with the request.
    pub api_key: ApiKey,
    /// Base64 payload of the source image, without a data-URL prefix.
    pub image_base64: String,
    /// Declared MIME type of the source image.
    pub mime_type: String,
    /// Natural-language editing instruction.
    pub instruction: String,
}

impl EditRequest {
    /// Creates a request declaring [`REQUEST_MIME_TYPE`].
    pub fn new(
        api_key: ApiKey,
        image_base64: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            image_base64: image_base64.into(),
            mime_type: REQUEST_MIME_TYPE.to_string(),
            instruction: instruction.into(),
        }
    }
}

/// A single unit of returned content, kept in vendor order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Model commentary.
    Text {
        /// The text.
        text: String,
    },
    /// Raw image bytes, base64 encoded, with a declared MIME type.
    InlineImage {
        /// Declared MIME type.
        mime_type: String,
        /// Base64 payload.
        data: String,
    },
}

/// Everything the editor returned for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditResponse {
    /// Content parts of the first candidate, in order.
    pub parts: Vec<ContentPart>,
    /// Model that served the request.
    pub model: Option<String>,
}

impl EditResponse {
    /// Creates a response from ordered parts.
    pub fn new(parts: Vec<ContentPart>) -> Self {
        Self { parts, model: None }
    }

    /// Tags the response with the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The first text part.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            ContentPart::Text { text } => Some(text.as_str()),
            ContentPart::InlineImage { .. } => None,
        })
    }

    /// The first inline image part as `(mime_type, base64)`.
    pub fn first_image(&self) -> Option<(&str, &str)> {
        self.parts.iter().find_map(|p| match p {
            ContentPart::InlineImage { mime_type, data } => {
                Some((mime_type.as_str(), data.as_str()))
            }
            ContentPart::Text { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"RIFF"), None);
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), None);
    }

    #[test]
    fn test_format_from_extension_and_mime() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("gif"), None);
        assert_eq!(
            ImageFormat::from_mime_type("image/webp"),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_mime_type("text/plain"), None);
    }

    #[test]
    fn test_request_declares_jpeg() {
        let key = crate::credential::ApiKey::parse(crate::credential::TEST_KEY).unwrap();
        let req = EditRequest::new(key, "AAAA", "add a llama");
        assert_eq!(req.mime_type, "image/jpeg");
    }

    #[test]
    fn test_response_first_parts_in_order() {
        let resp = EditResponse::new(vec![
            ContentPart::InlineImage {
                mime_type: "image/png".into(),
                data: "first".into(),
            },
            ContentPart::Text {
                text: "one".into(),
            },
            ContentPart::Text {
                text: "two".into(),
            },
            ContentPart::InlineImage {
                mime_type: "image/png".into(),
                data: "second".into(),
            },
        ]);
        assert_eq!(resp.first_text(), Some("one"));
        assert_eq!(resp.first_image(), Some(("image/png", "first")));
    }

    #[test]
    fn test_response_without_image() {
        let resp = EditResponse::new(vec![ContentPart::Text {
            text: "sorry".into(),
        }]);
        assert_eq!(resp.first_image(), None);
    }
}
