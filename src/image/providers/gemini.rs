//! Gemini (Google) image editing backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::credential::ApiKey;
use crate::error::{parse_retry_after, sanitize_error_message, EditifyError, Result};
use crate::image::provider::ImageEditor;
use crate::image::types::{ContentPart, EditRequest, EditResponse};

/// Public Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini model variants that return both text and images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Gemini 2.0 Flash experimental image generation.
    #[default]
    FlashExpImageGeneration,
    /// Gemini 2.5 Flash Image.
    FlashImage,
    /// Any other model identifier.
    Custom(String),
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FlashExpImageGeneration => "gemini-2.0-flash-exp-image-generation",
            Self::FlashImage => "gemini-2.5-flash-image",
            Self::Custom(name) => name,
        }
    }
}

impl std::str::FromStr for GeminiModel {
    type Err = EditifyError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "" => Err(EditifyError::Config("model name must not be empty".into())),
            "gemini-2.0-flash-exp-image-generation" => Ok(Self::FlashExpImageGeneration),
            "gemini-2.5-flash-image" => Ok(Self::FlashImage),
            other => Ok(Self::Custom(other.to_string())),
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for GeminiEditor.
#[derive(Debug, Clone, Default)]
pub struct GeminiEditorBuilder {
    model: GeminiModel,
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl GeminiEditorBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API endpoint (useful for proxies).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Uses a preconfigured HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the editor.
    pub fn build(self) -> Result<GeminiEditor> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(EditifyError::Config(format!(
                "base URL must be http(s): {base_url}"
            )));
        }

        Ok(GeminiEditor {
            client: self.client.unwrap_or_default(),
            base_url,
            model: self.model,
        })
    }
}

/// Gemini image editing backend.
pub struct GeminiEditor {
    client: reqwest::Client,
    base_url: String,
    model: GeminiModel,
}

impl GeminiEditor {
    /// Creates a new `GeminiEditorBuilder`.
    pub fn builder() -> GeminiEditorBuilder {
        GeminiEditorBuilder::new()
    }

    fn model_url(&self) -> String {
        format!("{}/v1beta/models/{}", self.base_url, self.model.as_str())
    }

    async fn edit_impl(&self, request: &EditRequest) -> Result<EditResponse> {
        let start = Instant::now();
        let url = format!("{}:generateContent", self.model_url());
        let body = GeminiRequest::from_edit_request(request);

        tracing::debug!(
            model = self.model.as_str(),
            key = %request.api_key,
            image_len = request.image_base64.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", request.api_key.expose())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let parts = gemini_response.into_parts()?;

        tracing::debug!(
            parts = parts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "received generateContent response"
        );

        Ok(EditResponse::new(parts).with_model(self.model.as_str()))
    }
}

/// Maps a non-2xx reply onto the error taxonomy.
///
/// Gemini reports a bad key as HTTP 400 with `API_KEY_INVALID`, so the
/// message is inspected as well as the status.
fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> EditifyError {
    let message = serde_json::from_str::<GeminiErrorEnvelope>(text)
        .map(|env| env.error.describe())
        .unwrap_or_else(|_| text.to_string());
    let message = sanitize_error_message(&message);
    let lower = message.to_lowercase();

    if status == 401
        || status == 403
        || lower.contains("api key not valid")
        || lower.contains("api_key_invalid")
    {
        return EditifyError::Auth(message);
    }
    if status == 404 {
        return EditifyError::ModelUnavailable(message);
    }
    if status == 429 || lower.contains("resource_exhausted") {
        let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
        return EditifyError::RateLimited {
            message,
            retry_after,
        };
    }
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return EditifyError::ContentBlocked(message);
    }
    EditifyError::Api { status, message }
}

#[async_trait]
impl ImageEditor for GeminiEditor {
    async fn edit(&self, request: &EditRequest) -> Result<EditResponse> {
        self.edit_impl(request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    fn model(&self) -> &str {
        self.model.as_str()
    }

    async fn health_check(&self, api_key: &ApiKey) -> Result<()> {
        let response = self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", api_key.expose())
            .send()
            .await?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(());
        }
        let headers = response.headers().clone();
        let text = response.text().await.unwrap_or_default();
        Err(parse_error(status, &text, &headers))
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_edit_request(req: &EditRequest) -> Self {
        // Instruction first, then the image it refers to.
        let parts = vec![
            GeminiRequestPart::Text {
                text: req.instruction.clone(),
            },
            GeminiRequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: req.mime_type.clone(),
                    data: req.image_base64.clone(),
                },
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["Text".to_string(), "Image".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

impl GeminiErrorBody {
    /// Message plus status and any `reason` codes, for substring matching.
    fn describe(&self) -> String {
        let mut out = self.message.clone();
        if let Some(status) = &self.status {
            out.push_str(&format!(" [{status}]"));
        }
        for reason in self
            .details
            .iter()
            .filter_map(|d| d.get("reason").and_then(|r| r.as_str()))
        {
            out.push_str(&format!(" [{reason}]"));
        }
        out
    }
}

impl GeminiResponse {
    /// Flattens the first candidate into ordered content parts.
    ///
    /// A missing image is not an error here; the bridge decides that.
    fn into_parts(self) -> Result<Vec<ContentPart>> {
        if let Some(feedback) = &self.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .clone()
                    .unwrap_or_else(|| format!("Prompt blocked: {reason}"));
                return Err(EditifyError::ContentBlocked(msg));
            }
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            EditifyError::UnexpectedResponse("No candidates in Gemini response".into())
        })?;

        if let Some(finish_reason) = candidate.finish_reason.as_deref() {
            match finish_reason {
                "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "IMAGE_RECITATION"
                | "RECITATION"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST" => {
                    return Err(EditifyError::ContentBlocked(format!(
                        "Content blocked by Gemini safety filter: {finish_reason}"
                    )));
                }
                _ => {} // STOP, MAX_TOKENS, NO_IMAGE etc. fall through
            }
        }

        let parts = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|p| {
                let text = p
                    .text
                    .filter(|t| !t.is_empty())
                    .map(|text| ContentPart::Text { text });
                let image = p.inline_data.filter(|d| !d.data.is_empty()).map(|d| {
                    ContentPart::InlineImage {
                        mime_type: d.mime_type,
                        data: d.data,
                    }
                });
                text.into_iter().chain(image)
            })
            .collect();

        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::TEST_KEY;

    fn request() -> EditRequest {
        EditRequest::new(ApiKey::parse(TEST_KEY).unwrap(), "SU1H", "add a llama")
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(
            GeminiModel::FlashExpImageGeneration.as_str(),
            "gemini-2.0-flash-exp-image-generation"
        );
        assert_eq!(GeminiModel::FlashImage.as_str(), "gemini-2.5-flash-image");
        assert_eq!(GeminiModel::Custom("x".into()).as_str(), "x");
    }

    #[test]
    fn test_gemini_model_parse() {
        assert_eq!(
            "gemini-2.5-flash-image".parse::<GeminiModel>().unwrap(),
            GeminiModel::FlashImage
        );
        assert_eq!(
            "my-model".parse::<GeminiModel>().unwrap(),
            GeminiModel::Custom("my-model".into())
        );
        assert!("  ".parse::<GeminiModel>().is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let editor = GeminiEditor::builder().build().unwrap();
        assert_eq!(editor.model(), "gemini-2.0-flash-exp-image-generation");
        assert_eq!(
            editor.model_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp-image-generation"
        );
    }

    #[test]
    fn test_builder_rejects_bad_base_url() {
        assert!(GeminiEditor::builder().base_url("ftp://x").build().is_err());
        let editor = GeminiEditor::builder()
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert!(editor.model_url().starts_with("http://localhost:8080/v1beta/"));
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_value(GeminiRequest::from_edit_request(&request())).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "parts": [
                        { "text": "add a llama" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "SU1H" } }
                    ]
                }],
                "generationConfig": { "responseModalities": ["Text", "Image"] }
            })
        );
    }

    #[test]
    fn test_response_text_and_image() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Added a llama." },
                        { "inlineData": { "mimeType": "image/png", "data": "SU1H" } }
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let parts = resp.into_parts().unwrap();
        assert_eq!(
            parts,
            vec![
                ContentPart::Text {
                    text: "Added a llama.".into()
                },
                ContentPart::InlineImage {
                    mime_type: "image/png".into(),
                    data: "SU1H".into()
                },
            ]
        );
    }

    #[test]
    fn test_response_empty_parts_skipped() {
        let json = r#"{"candidates": [{"content": {"parts": [{}, {"text": ""}]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(resp.into_parts().unwrap().is_empty());
    }

    #[test]
    fn test_response_no_image_finish_reason_is_not_an_error() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "I can't"}]}, "finishReason": "NO_IMAGE"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.into_parts().unwrap().len(), 1);
    }

    #[test]
    fn test_response_with_prompt_feedback_block() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = resp.into_parts().unwrap_err();
        assert!(matches!(err, EditifyError::ContentBlocked(m) if m == "Prompt was blocked due to safety"));
    }

    #[test]
    fn test_response_safety_finish_reason() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            resp.into_parts(),
            Err(EditifyError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_response_no_candidates() {
        let resp: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            resp.into_parts(),
            Err(EditifyError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_error_invalid_key_is_400() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT", "details": [{"reason": "API_KEY_INVALID"}]}}"#;
        let err = parse_error(400, body, &reqwest::header::HeaderMap::new());
        assert!(matches!(err, EditifyError::Auth(m) if m.contains("API_KEY_INVALID")));
    }

    #[test]
    fn test_parse_error_statuses() {
        let headers = reqwest::header::HeaderMap::new();
        assert!(matches!(
            parse_error(403, "denied", &headers),
            EditifyError::Auth(_)
        ));
        assert!(matches!(
            parse_error(404, r#"{"error": {"message": "models/x is not found"}}"#, &headers),
            EditifyError::ModelUnavailable(_)
        ));
        assert!(matches!(
            parse_error(400, "request blocked by safety settings", &headers),
            EditifyError::ContentBlocked(_)
        ));
        assert!(matches!(
            parse_error(500, "boom", &headers),
            EditifyError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_parse_error_rate_limited_reads_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "12".parse().unwrap());
        let err = parse_error(429, "Resource has been exhausted (e.g. check quota).", &headers);
        assert!(matches!(
            err,
            EditifyError::RateLimited { retry_after: Some(d), ref message }
                if d.as_secs() == 12 && message.contains("exhausted")
        ));
    }

    #[test]
    fn test_parse_error_redacts_key() {
        let body = format!("bad request for key={TEST_KEY}");
        let err = parse_error(500, &body, &reqwest::header::HeaderMap::new());
        assert!(!err.to_string().contains(TEST_KEY));
    }
}
