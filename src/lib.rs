#![warn(missing_docs)]
//! Editify - edit images with natural-language instructions via Gemini.
//!
//! The crate bundles the pieces of a bring-your-own-key image editor:
//! API key validation and persistence, source image intake, a generation
//! bridge that turns one multimodal call into a tagged outcome, and an
//! editor session state machine that ties them together.
//!
//! # Quick Start
//!
//! ```no_run
//! use editify::{Config, EditOutcome, SourceImage};
//!
//! #[tokio::main]
//! async fn main() -> editify::Result<()> {
//!     let bridge = Config::from_env()?.build_bridge()?;
//!     let image = SourceImage::from_path("cat.jpg")?;
//!     let key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
//!
//!     match bridge.generate(&key, image.to_base64(), "add a llama").await {
//!         EditOutcome::Success(edited) => edited.save("edited.jpg")?,
//!         EditOutcome::Failure(err) => eprintln!("{err}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli` (default): the `editify` command-line front end.

pub mod bridge;
pub mod config;
pub mod credential;
mod error;
pub mod image;
pub mod session;
pub mod store;

// Re-export error types at crate root
pub use error::{EditifyError, Result};

pub use bridge::{
    EditError, EditOutcome, EditedImage, GenerationBridge, RejectionKind, ValidationError,
    DEFAULT_TIMEOUT,
};
pub use config::Config;
pub use credential::{ApiKey, CredentialError, CredentialStore};
pub use image::providers::{GeminiEditor, GeminiEditorBuilder, GeminiModel};
pub use image::{
    ContentPart, EditRequest, EditResponse, ImageEditor, ImageFormat, IntakeError, SourceImage,
    MAX_IMAGE_BYTES,
};
pub use session::{Activity, EditorSession, Notice, NoticeLevel, Screen, SessionError};
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::bridge::{EditOutcome, GenerationBridge};
    pub use crate::config::Config;
    pub use crate::credential::ApiKey;
    pub use crate::error::{EditifyError, Result};
    pub use crate::image::providers::GeminiEditor;
    pub use crate::image::{ImageEditor, SourceImage};
    pub use crate::session::EditorSession;
}
