//! The generation bridge: one edit request in, one tagged outcome out.
//!
//! Every failure is returned as data. Nothing escapes [`GenerationBridge::generate`]
//! as an `Err`, so callers can always surface the message and let the user
//! try again.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::credential::{ApiKey, CredentialError};
use crate::error::{sanitize_error_message, EditifyError};
use crate::image::{strip_data_url, EditRequest, EditResponse, ImageEditor, ImageFormat};

/// Client-side limit on a single edit round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Input problems caught before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No API key was supplied.
    #[error("Please enter your Gemini API key to continue.")]
    MissingCredential,

    /// The API key does not have the expected shape.
    #[error("{}", CredentialError::InvalidFormat)]
    MalformedCredential,

    /// No image payload.
    #[error("Please select an image first.")]
    MissingImage,

    /// Blank instruction.
    #[error("Please enter instructions for how you want to edit the image.")]
    MissingInstruction,
}

impl From<CredentialError> for ValidationError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Empty => Self::MissingCredential,
            CredentialError::InvalidFormat => Self::MalformedCredential,
        }
    }
}

/// Vendor-side refusals the user can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The vendor did not accept the key.
    InvalidCredential,
    /// Quota or rate limit exhausted.
    QuotaExceeded,
    /// Safety filters blocked the prompt or output.
    ContentPolicy,
    /// The model or endpoint is not reachable with this key.
    ModelUnavailable,
}

impl RejectionKind {
    /// Message shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidCredential => {
                "Invalid API key. Please check your Gemini API key and try again."
            }
            Self::QuotaExceeded => {
                "API quota exceeded. Please try again later or check your Gemini API usage limits."
            }
            Self::ContentPolicy => {
                "Content policy violation. Please try with a different image or prompt."
            }
            Self::ModelUnavailable => {
                "Model not available. Please ensure your API key has access to the image generation model."
            }
        }
    }

    /// Short machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid_credential",
            Self::QuotaExceeded => "quota_exceeded",
            Self::ContentPolicy => "content_policy",
            Self::ModelUnavailable => "model_unavailable",
        }
    }
}

/// Why an edit did not produce an image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Caught before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No reply within the client-side window.
    #[error(
        "Request timed out after {}s. Please try again with a simpler prompt or smaller image.",
        .0.as_secs()
    )]
    Timeout(Duration),

    /// The vendor refused the request.
    #[error("{}", .kind.user_message())]
    VendorRejected {
        /// Category of refusal.
        kind: RejectionKind,
        /// Sanitized vendor message.
        detail: String,
    },

    /// The reply was well-formed but carried no image.
    #[error("No image was generated. Try a different prompt or image.")]
    NoImageProduced {
        /// Model commentary, if any was returned.
        text: Option<String>,
    },

    /// Anything else, with the raw message retained.
    #[error("{0}")]
    Unknown(String),
}

impl EditError {
    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Timeout(_) => "timeout",
            Self::VendorRejected { kind, .. } => kind.as_str(),
            Self::NoImageProduced { .. } => "no_image_produced",
            Self::Unknown(_) => "unknown",
        }
    }

    /// True when the same request might succeed later.
    ///
    /// The bridge never retries; this only informs the user.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::Unknown(_)
                | Self::VendorRejected {
                    kind: RejectionKind::QuotaExceeded,
                    ..
                }
        )
    }

    /// Explanation text that survived a failed edit.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::NoImageProduced { text } => text.as_deref(),
            _ => None,
        }
    }
}

/// An edited image plus the model's explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedImage {
    /// Base64 image payload as returned by the vendor.
    pub image_data: String,
    /// Declared MIME type of the image.
    pub mime_type: String,
    /// First text part of the reply.
    pub text: Option<String>,
    /// Model that produced the image.
    pub model: Option<String>,
    /// Round-trip time in milliseconds.
    pub duration_ms: Option<u64>,
}

impl EditedImage {
    /// Decodes the image payload.
    pub fn decode(&self) -> Result<Vec<u8>, EditifyError> {
        crate::image::decode_base64_lenient(&self.image_data)
            .map_err(|e| EditifyError::Decode(e.to_string()))
    }

    /// Format from the decoded bytes, falling back to the declared MIME type.
    pub fn format(&self) -> Option<ImageFormat> {
        self.decode()
            .ok()
            .and_then(|bytes| ImageFormat::from_magic_bytes(&bytes))
            .or_else(|| ImageFormat::from_mime_type(&self.mime_type))
    }

    /// `data:` URL for display.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.image_data)
    }

    /// Writes the decoded image to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EditifyError> {
        std::fs::write(path, self.decode()?)?;
        Ok(())
    }
}

/// Tagged result of one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "the outcome carries the generated image or the reason it failed"]
pub enum EditOutcome {
    /// The vendor returned an image.
    Success(EditedImage),
    /// Nothing usable came back.
    Failure(EditError),
}

impl EditOutcome {
    /// True for [`EditOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The edited image, if any.
    pub fn image(&self) -> Option<&EditedImage> {
        match self {
            Self::Success(image) => Some(image),
            Self::Failure(_) => None,
        }
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&EditError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }

    /// Explanation text, present on success and on `NoImageProduced`.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success(image) => image.text.as_deref(),
            Self::Failure(err) => err.text(),
        }
    }
}

/// Serializes as `{"success": true, "imageData": .., "text": ..}` or
/// `{"success": false, "error": .., "kind": ..}`.
impl Serialize for EditOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(image) => {
                let mut s = serializer.serialize_struct("EditOutcome", 5)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("imageData", &image.image_data)?;
                s.serialize_field("mimeType", &image.mime_type)?;
                s.serialize_field("text", &image.text)?;
                s.serialize_field("model", &image.model)?;
                s.end()
            }
            Self::Failure(err) => {
                let mut s = serializer.serialize_struct("EditOutcome", 4)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("error", &err.to_string())?;
                s.serialize_field("kind", err.kind())?;
                s.serialize_field("text", &err.text())?;
                s.end()
            }
        }
    }
}

/// Performs edits through an [`ImageEditor`] under a fixed timeout.
pub struct GenerationBridge<E> {
    editor: E,
    timeout: Duration,
}

impl<E: ImageEditor> GenerationBridge<E> {
    /// Wraps `editor` with the default 30 second timeout.
    pub fn new(editor: E) -> Self {
        Self {
            editor,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The wrapped editor.
    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Checks inputs and builds the request without touching the network.
    ///
    /// `image_base64` may carry a `data:` URL prefix; only the payload is kept.
    pub fn prepare(
        &self,
        credential: &str,
        image_base64: &str,
        instruction: &str,
    ) -> Result<EditRequest, ValidationError> {
        let api_key = ApiKey::parse(credential)?;
        let image = strip_data_url(image_base64);
        if image.is_empty() {
            return Err(ValidationError::MissingImage);
        }
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(ValidationError::MissingInstruction);
        }
        Ok(EditRequest::new(api_key, image, instruction))
    }

    /// Runs one edit from raw inputs.
    pub async fn generate(
        &self,
        credential: &str,
        image_base64: &str,
        instruction: &str,
    ) -> EditOutcome {
        match self.prepare(credential, image_base64, instruction) {
            Ok(request) => self.send(&request).await,
            Err(err) => {
                tracing::warn!("edit rejected before sending: {err}");
                EditOutcome::Failure(err.into())
            }
        }
    }

    /// Runs one edit from an already built request.
    pub async fn generate_request(&self, request: &EditRequest) -> EditOutcome {
        if request.image_base64.trim().is_empty() {
            return EditOutcome::Failure(ValidationError::MissingImage.into());
        }
        if request.instruction.trim().is_empty() {
            return EditOutcome::Failure(ValidationError::MissingInstruction.into());
        }
        self.send(request).await
    }

    async fn send(&self, request: &EditRequest) -> EditOutcome {
        let start = Instant::now();
        tracing::info!(
            editor = self.editor.name(),
            model = self.editor.model(),
            timeout_secs = self.timeout.as_secs(),
            "sending edit request"
        );

        // Dropping the future on timeout also aborts the HTTP call.
        let outcome = match tokio::time::timeout(self.timeout, self.editor.edit(request)).await {
            Err(_) => EditOutcome::Failure(EditError::Timeout(self.timeout)),
            Ok(Err(err)) => EditOutcome::Failure(classify(err, self.timeout)),
            Ok(Ok(response)) => interpret(response, start.elapsed()),
        };

        match &outcome {
            EditOutcome::Success(image) => tracing::info!(
                duration_ms = image.duration_ms,
                has_text = image.text.is_some(),
                "edit succeeded"
            ),
            EditOutcome::Failure(err) => {
                tracing::warn!(kind = err.kind(), "edit failed: {err}")
            }
        }
        outcome
    }
}

/// Picks the first text part and the first image part.
fn interpret(response: EditResponse, elapsed: Duration) -> EditOutcome {
    let text = response.first_text().map(str::to_string);
    match response.first_image() {
        Some((mime_type, data)) => {
            let mime_type = if mime_type.is_empty() {
                crate::image::REQUEST_MIME_TYPE
            } else {
                mime_type
            };
            EditOutcome::Success(EditedImage {
                image_data: data.to_string(),
                mime_type: mime_type.to_string(),
                text,
                model: response.model.clone(),
                duration_ms: Some(elapsed.as_millis() as u64),
            })
        }
        None => EditOutcome::Failure(EditError::NoImageProduced { text }),
    }
}

enum Category {
    Rejected(RejectionKind),
    Timeout,
}

/// Substring inspection of a vendor message.
fn categorize_message(message: &str) -> Option<Category> {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&[
        "api key not valid",
        "api_key_invalid",
        "invalid api key",
        "permission_denied",
        "unauthenticated",
        "authentication failed",
    ]) {
        return Some(Category::Rejected(RejectionKind::InvalidCredential));
    }
    if has(&["quota", "resource_exhausted", "rate limit", "too many requests"]) {
        return Some(Category::Rejected(RejectionKind::QuotaExceeded));
    }
    if has(&["safety", "blocked", "prohibited", "content policy", "content_policy"]) {
        return Some(Category::Rejected(RejectionKind::ContentPolicy));
    }
    if has(&[
        "not found",
        "not_found",
        "not supported",
        "is not available",
        "unavailable",
    ]) {
        return Some(Category::Rejected(RejectionKind::ModelUnavailable));
    }
    if has(&["timed out", "timeout", "deadline"]) {
        return Some(Category::Timeout);
    }
    None
}

/// Maps a backend error onto the user-facing taxonomy.
fn classify(err: EditifyError, timeout: Duration) -> EditError {
    let rejected = |kind: RejectionKind, detail: String| EditError::VendorRejected {
        kind,
        detail: sanitize_error_message(&detail),
    };

    match err {
        EditifyError::Credential(e) => EditError::Validation(e.into()),
        EditifyError::Auth(m) => rejected(RejectionKind::InvalidCredential, m),
        EditifyError::RateLimited {
            message,
            retry_after,
        } => {
            let detail = match retry_after {
                Some(wait) => format!("{message} (retry after {}s)", wait.as_secs()),
                None => message,
            };
            rejected(RejectionKind::QuotaExceeded, detail)
        }
        EditifyError::ContentBlocked(m) => rejected(RejectionKind::ContentPolicy, m),
        EditifyError::ModelUnavailable(m) => rejected(RejectionKind::ModelUnavailable, m),
        EditifyError::Timeout(d) => EditError::Timeout(d),
        EditifyError::Network(ref e) if e.is_timeout() => EditError::Timeout(timeout),
        other => {
            let message = sanitize_error_message(&other.to_string());
            match categorize_message(&message) {
                Some(Category::Rejected(kind)) => rejected(kind, message),
                Some(Category::Timeout) => EditError::Timeout(timeout),
                None => EditError::Unknown(message),
            }
        }
    }
}
