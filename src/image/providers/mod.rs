//! Image editing backends.

mod gemini;

pub use gemini::{GeminiEditor, GeminiEditorBuilder, GeminiModel, DEFAULT_BASE_URL};
