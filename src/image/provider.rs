//! Image editor trait.

use async_trait::async_trait;

use crate::credential::ApiKey;
use crate::error::Result;
use crate::image::types::{EditRequest, EditResponse};

/// A backend that applies an instruction to an image.
///
/// Implementations make exactly one outbound call per [`edit`](Self::edit)
/// and never retry on their own.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Sends the request and returns the content parts of the reply.
    async fn edit(&self, request: &EditRequest) -> Result<EditResponse>;

    /// Returns the name of this backend for display.
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Checks if the backend is reachable and accepts `api_key`.
    async fn health_check(&self, api_key: &ApiKey) -> Result<()>;
}
