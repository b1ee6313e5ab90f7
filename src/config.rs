//! Runtime configuration: model, timeout, endpoint and state location.

use std::path::PathBuf;
use std::time::Duration;

use crate::bridge::{GenerationBridge, DEFAULT_TIMEOUT};
use crate::credential::CredentialStore;
use crate::error::{EditifyError, Result};
use crate::image::providers::{GeminiEditor, GeminiModel, DEFAULT_BASE_URL};
use crate::store::FileStore;

/// Name of the state file inside the state directory.
pub const STATE_FILE_NAME: &str = "state.json";

/// Settings shared by the library and the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model edits are sent to.
    pub model: GeminiModel,
    /// Client-side timeout per edit.
    pub timeout: Duration,
    /// API endpoint.
    pub base_url: String,
    /// Directory holding the persisted state. `None` uses the platform
    /// config directory.
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: GeminiModel::default(),
            timeout: DEFAULT_TIMEOUT,
            base_url: DEFAULT_BASE_URL.to_string(),
            state_dir: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `EDITIFY_MODEL`, `EDITIFY_TIMEOUT_SECS`,
    /// `EDITIFY_BASE_URL` and `EDITIFY_STATE_DIR`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(model) = lookup("EDITIFY_MODEL") {
            config.model = model.parse()?;
        }
        if let Some(secs) = lookup("EDITIFY_TIMEOUT_SECS") {
            config.timeout = parse_timeout_secs(&secs)?;
        }
        if let Some(url) = lookup("EDITIFY_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = url;
        }
        if let Some(dir) = lookup("EDITIFY_STATE_DIR").filter(|d| !d.trim().is_empty()) {
            config.state_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Sets the model.
    pub fn with_model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the state directory.
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    /// Path of the persisted state file.
    pub fn state_file(&self) -> Result<PathBuf> {
        let dir = match &self.state_dir {
            Some(dir) => dir.clone(),
            None => dirs::config_dir()
                .ok_or_else(|| {
                    EditifyError::Config(
                        "no config directory on this platform; set EDITIFY_STATE_DIR".into(),
                    )
                })?
                .join("editify"),
        };
        Ok(dir.join(STATE_FILE_NAME))
    }

    /// Gemini-backed bridge using this model, endpoint and timeout.
    pub fn build_bridge(&self) -> Result<GenerationBridge<GeminiEditor>> {
        let editor = GeminiEditor::builder()
            .model(self.model.clone())
            .base_url(&self.base_url)
            .build()?;
        Ok(GenerationBridge::new(editor).with_timeout(self.timeout))
    }

    /// Credential store backed by [`state_file`](Self::state_file).
    pub fn credential_store(&self) -> Result<CredentialStore<FileStore>> {
        Ok(CredentialStore::new(FileStore::new(self.state_file()?)))
    }
}

/// Parses a positive whole number of seconds.
pub fn parse_timeout_secs(value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(EditifyError::Config(format!(
            "timeout must be a positive number of seconds, got {value:?}"
        ))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}
