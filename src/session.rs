//! Editor session: the two-phase screen state machine.
//!
//! A session starts at [`Screen::CredentialEntry`] (or [`Screen::Editing`]
//! when a stored key is restored), moves to `Editing` on an accepted key and
//! only returns on [`EditorSession::logout`]. While editing, at most one
//! generation is outstanding at a time.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};

use crate::bridge::{EditOutcome, EditedImage, GenerationBridge};
use crate::credential::{ApiKey, CredentialError, CredentialStore};
use crate::error::EditifyError;
use crate::image::{ImageEditor, IntakeError, SourceImage};
use crate::store::KeyValueStore;

/// File name offered when saving a generated image.
pub const DOWNLOAD_FILE_NAME: &str = "gemini-generated-image.jpg";

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Waiting for an API key.
    CredentialEntry,
    /// Key accepted; images can be edited.
    Editing,
}

/// Whether a generation call is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Nothing in flight.
    Idle,
    /// One call in flight.
    Requesting,
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Something worked.
    Success,
    /// Something failed; state is unchanged.
    Error,
    /// Neutral information.
    Info,
}

/// A transient, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text to show.
    pub message: String,
}

/// Actions the current state does not allow.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The action needs an accepted API key.
    #[error("Please enter your Gemini API key")]
    NotAuthenticated,

    /// A generation is already outstanding.
    #[error("An edit is already in progress")]
    Busy,

    /// Generation needs a selected image.
    #[error("Please select an image first")]
    NoImage,

    /// Nothing has been generated yet.
    #[error("There is no generated image to save")]
    NoResult,

    /// Output path tries to leave its directory.
    #[error("output path must not contain '..' components: {}", .0.display())]
    UnsafePath(PathBuf),

    /// The submitted key was refused.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The selected image was refused.
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// Persisting state or writing output failed.
    #[error(transparent)]
    Storage(#[from] EditifyError),
}

/// Ticket for a generation started with [`EditorSession::begin_generation`].
#[derive(Debug)]
#[must_use = "pass the ticket back to complete_generation"]
pub struct PendingEdit {
    epoch: u64,
    api_key: ApiKey,
    image_base64: String,
    instruction: String,
}

impl PendingEdit {
    /// Key to send.
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Base64 payload of the source image.
    pub fn image_base64(&self) -> &str {
        &self.image_base64
    }

    /// Editing instruction as entered.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

/// Clears the requesting flag when dropped, including on cancellation.
struct InFlight<'a>(&'a mut bool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// State of one editor screen.
pub struct EditorSession<E, S> {
    bridge: GenerationBridge<E>,
    credentials: CredentialStore<S>,
    screen: Screen,
    api_key: Option<ApiKey>,
    credential_error: Option<String>,
    source: Option<SourceImage>,
    result: Option<EditedImage>,
    requesting: bool,
    // Bumped by reset and logout so late completions are dropped.
    epoch: u64,
    notices: Vec<Notice>,
}

impl<E: ImageEditor, S: KeyValueStore> EditorSession<E, S> {
    /// Creates a session, restoring a previously stored key if there is one.
    pub fn new(
        bridge: GenerationBridge<E>,
        credentials: CredentialStore<S>,
    ) -> Result<Self, SessionError> {
        let api_key = credentials.load()?;
        let screen = if api_key.is_some() {
            Screen::Editing
        } else {
            Screen::CredentialEntry
        };
        tracing::info!(?screen, "session started");

        Ok(Self {
            bridge,
            credentials,
            screen,
            api_key,
            credential_error: None,
            source: None,
            result: None,
            requesting: false,
            epoch: 0,
            notices: Vec::new(),
        })
    }

    /// Current screen.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Whether a generation is outstanding.
    pub fn activity(&self) -> Activity {
        if self.requesting {
            Activity::Requesting
        } else {
            Activity::Idle
        }
    }

    /// True while a generation is outstanding.
    pub fn is_requesting(&self) -> bool {
        self.requesting
    }

    /// The accepted key.
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    /// Error text for the credential form.
    pub fn credential_error(&self) -> Option<&str> {
        self.credential_error.as_deref()
    }

    /// The selected image.
    pub fn source_image(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    /// The latest generated image.
    pub fn result(&self) -> Option<&EditedImage> {
        self.result.as_ref()
    }

    /// Model explanation of the latest generated image.
    pub fn explanation(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.text.as_deref())
    }

    /// The bridge requests go through.
    pub fn bridge(&self) -> &GenerationBridge<E> {
        &self.bridge
    }

    /// Pending notices, oldest first.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Removes one notice.
    pub fn dismiss(&mut self, index: usize) -> Option<Notice> {
        (index < self.notices.len()).then(|| self.notices.remove(index))
    }

    /// Takes all pending notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    fn require_editing(&self) -> Result<(), SessionError> {
        match self.screen {
            Screen::Editing => Ok(()),
            Screen::CredentialEntry => Err(SessionError::NotAuthenticated),
        }
    }

    /// Validates and stores a key, moving to [`Screen::Editing`].
    ///
    /// No network call is made; the vendor may still reject the key later.
    pub fn submit_credential(&mut self, input: &str) -> Result<(), SessionError> {
        self.credential_error = None;

        let key = match ApiKey::parse(input) {
            Ok(key) => key,
            Err(err) => {
                self.credential_error = Some(err.to_string());
                return Err(err.into());
            }
        };

        if let Err(err) = self.credentials.save(&key) {
            self.credential_error = Some(err.to_string());
            return Err(err.into());
        }

        self.api_key = Some(key);
        self.screen = Screen::Editing;
        self.notify(
            NoticeLevel::Success,
            "Your Gemini API key has been saved on this device.",
        );
        tracing::info!("credential accepted, entering editor");
        Ok(())
    }

    /// Forgets the key, the image and the result, and returns to
    /// [`Screen::CredentialEntry`].
    ///
    /// If the stored key cannot be removed the session stays as it was.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.credentials.clear()?;
        self.clear_work();
        self.api_key = None;
        self.credential_error = None;
        self.screen = Screen::CredentialEntry;
        tracing::info!("logged out");
        Ok(())
    }

    /// Clears image and result but stays in [`Screen::Editing`].
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.require_editing()?;
        self.clear_work();
        Ok(())
    }

    // Abandons any outstanding ticket; its completion no longer matches the epoch.
    fn clear_work(&mut self) {
        self.source = None;
        self.result = None;
        self.requesting = false;
        self.epoch += 1;
    }

    /// Replaces the selected image and clears any previous result.
    pub fn select_image(&mut self, image: SourceImage) -> Result<(), SessionError> {
        self.require_editing()?;
        tracing::info!(size = image.size(), format = ?image.format(), "image selected");
        self.source = Some(image);
        self.result = None;
        Ok(())
    }

    /// Loads an image from disk and selects it.
    ///
    /// A refused file leaves the previous selection and result untouched.
    pub fn open_image(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        self.require_editing()?;
        match SourceImage::from_path(path) {
            Ok(image) => self.select_image(image),
            Err(err) => {
                self.notify(NoticeLevel::Error, err.to_string());
                Err(err.into())
            }
        }
    }

    /// Marks a generation as outstanding and hands out what to send.
    pub fn begin_generation(&mut self, instruction: &str) -> Result<PendingEdit, SessionError> {
        self.require_editing()?;
        if self.requesting {
            return Err(SessionError::Busy);
        }
        let Some(api_key) = self.api_key.clone() else {
            self.notify(NoticeLevel::Error, "Please enter your Gemini API key");
            return Err(SessionError::NotAuthenticated);
        };
        let Some(source) = &self.source else {
            self.notify(NoticeLevel::Error, "Please select an image first");
            return Err(SessionError::NoImage);
        };

        let pending = PendingEdit {
            epoch: self.epoch,
            api_key,
            image_base64: source.to_base64().to_string(),
            instruction: instruction.to_string(),
        };
        self.requesting = true;
        Ok(pending)
    }

    /// Applies the outcome of a generation started with
    /// [`begin_generation`](Self::begin_generation).
    ///
    /// Failures only add a notice; the previous result stays. Outcomes for
    /// work cleared by [`reset`](Self::reset) or [`logout`](Self::logout)
    /// are dropped.
    pub fn complete_generation(&mut self, pending: PendingEdit, outcome: &EditOutcome) {
        if pending.epoch != self.epoch {
            tracing::debug!("dropping outcome for cleared work");
            return;
        }
        self.requesting = false;

        match outcome {
            EditOutcome::Success(image) => {
                self.result = Some(image.clone());
                self.notify(NoticeLevel::Success, "Image generated successfully!");
            }
            EditOutcome::Failure(err) => {
                self.notify(NoticeLevel::Error, err.to_string());
            }
        }
    }

    /// Runs one generation end to end.
    ///
    /// Dropping the returned future before it finishes leaves the session
    /// idle, so the user can start over.
    pub async fn generate(&mut self, instruction: &str) -> Result<EditOutcome, SessionError> {
        let pending = self.begin_generation(instruction)?;
        let outcome = {
            let _in_flight = InFlight(&mut self.requesting);
            self.bridge
                .generate(
                    pending.api_key.expose(),
                    &pending.image_base64,
                    &pending.instruction,
                )
                .await
        };
        self.complete_generation(pending, &outcome);
        Ok(outcome)
    }

    /// Saves the generated image as [`DOWNLOAD_FILE_NAME`] inside `dir`.
    pub fn save_result(&mut self, dir: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        self.save_result_to(dir.as_ref().join(DOWNLOAD_FILE_NAME))
    }

    /// Saves the generated image to `path`.
    pub fn save_result_to(&mut self, path: impl Into<PathBuf>) -> Result<PathBuf, SessionError> {
        let path = path.into();
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(SessionError::UnsafePath(path));
        }
        let result = self.result.as_ref().ok_or(SessionError::NoResult)?;
        result.save(&path)?;

        self.notify(
            NoticeLevel::Info,
            format!("Saved image to {}", path.display()),
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EditError;
    use crate::credential::{STORAGE_KEY, TEST_KEY};
    use crate::image::testing::{image, text, ScriptedEditor};
    use crate::image::MAX_IMAGE_BYTES;
    use crate::store::MemoryStore;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    type TestSession = EditorSession<ScriptedEditor, Arc<MemoryStore>>;

    fn session_with(editor: ScriptedEditor, store: &Arc<MemoryStore>) -> TestSession {
        EditorSession::new(
            GenerationBridge::new(editor),
            CredentialStore::new(Arc::clone(store)),
        )
        .unwrap()
    }

    fn editing_session(editor: ScriptedEditor) -> TestSession {
        let mut session = session_with(editor, &Arc::new(MemoryStore::new()));
        session.submit_credential(TEST_KEY).unwrap();
        session
    }

    fn small_image(bytes: &[u8]) -> SourceImage {
        SourceImage::from_bytes(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_starts_at_credential_entry() {
        let session = session_with(ScriptedEditor::new(), &Arc::new(MemoryStore::new()));
        assert_eq!(session.screen(), Screen::CredentialEntry);
        assert_eq!(session.activity(), Activity::Idle);
        assert!(session.api_key().is_none());
    }

    #[test]
    fn test_invalid_credential_stays_on_entry() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_with(ScriptedEditor::new(), &store);

        let err = session.submit_credential("short").unwrap_err();

        assert!(matches!(
            err,
            SessionError::Credential(CredentialError::InvalidFormat)
        ));
        assert_eq!(session.screen(), Screen::CredentialEntry);
        assert!(session.credential_error().unwrap().contains("AIza"));
        assert!(store.get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_valid_credential_enters_editor_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_with(ScriptedEditor::new(), &store);
        session.submit_credential("bad").unwrap_err();

        session.submit_credential(TEST_KEY).unwrap();

        assert_eq!(session.screen(), Screen::Editing);
        assert!(session.credential_error().is_none());
        assert_eq!(store.get(STORAGE_KEY).unwrap().as_deref(), Some(TEST_KEY));
        assert_eq!(session.notices()[0].level, NoticeLevel::Success);
    }

    #[test]
    fn test_stored_credential_restored() {
        let store = Arc::new(MemoryStore::new());
        store.set(STORAGE_KEY, TEST_KEY).unwrap();

        let session = session_with(ScriptedEditor::new(), &store);
        assert_eq!(session.screen(), Screen::Editing);
        assert_eq!(session.api_key().unwrap().expose(), TEST_KEY);
    }

    #[test]
    fn test_logout_clears_persisted_credential() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_with(ScriptedEditor::new(), &store);
        session.submit_credential(TEST_KEY).unwrap();
        session.select_image(small_image(b"IMG")).unwrap();

        session.logout().unwrap();

        assert_eq!(session.screen(), Screen::CredentialEntry);
        assert!(session.source_image().is_none());
        assert!(store.get(STORAGE_KEY).unwrap().is_none());

        // A fresh session over the same storage is back at credential entry.
        let reloaded = session_with(ScriptedEditor::new(), &store);
        assert_eq!(reloaded.screen(), Screen::CredentialEntry);
    }

    #[test]
    fn test_corrupt_state_file_starts_at_credential_entry() {
        use crate::store::FileStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut session = EditorSession::new(
            GenerationBridge::new(ScriptedEditor::new()),
            CredentialStore::new(FileStore::new(&path)),
        )
        .unwrap();
        assert_eq!(session.screen(), Screen::CredentialEntry);

        session.submit_credential(TEST_KEY).unwrap();
        session.logout().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_editing_actions_need_credential() {
        let mut session = session_with(ScriptedEditor::new(), &Arc::new(MemoryStore::new()));
        assert!(matches!(
            session.select_image(small_image(b"IMG")),
            Err(SessionError::NotAuthenticated)
        ));
        assert!(matches!(
            session.begin_generation("edit"),
            Err(SessionError::NotAuthenticated)
        ));
        assert!(matches!(session.reset(), Err(SessionError::NotAuthenticated)));
    }

    #[test]
    fn test_oversized_file_leaves_selection_unchanged() {
        let mut session = editing_session(ScriptedEditor::new());
        session.select_image(small_image(b"first")).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.jpg");
        std::fs::File::create(&path)
            .unwrap()
            .set_len(MAX_IMAGE_BYTES + 1)
            .unwrap();

        let err = session.open_image(&path).unwrap_err();

        assert!(matches!(err, SessionError::Intake(IntakeError::TooLarge { .. })));
        assert_eq!(session.source_image().unwrap().data(), b"first");
        let last = session.notices().last().unwrap();
        assert_eq!(last.level, NoticeLevel::Error);
        assert!(last.message.contains("1MB"));
    }

    #[tokio::test]
    async fn test_generate_success_sets_result() {
        let mut session = editing_session(
            ScriptedEditor::new().reply_parts(vec![text("Added a llama."), image("SU1H")]),
        );
        session.select_image(small_image(b"source")).unwrap();

        let outcome = session.generate("add a llama").await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(session.result().unwrap().image_data, "SU1H");
        assert_eq!(session.explanation(), Some("Added a llama."));
        assert_eq!(session.activity(), Activity::Idle);
        assert_eq!(
            session.notices().last().unwrap().message,
            "Image generated successfully!"
        );
    }

    #[tokio::test]
    async fn test_selecting_new_image_clears_result() {
        let mut session = editing_session(
            ScriptedEditor::new().reply_parts(vec![text("done"), image("SU1H")]),
        );
        session.select_image(small_image(b"one")).unwrap();
        let _ = session.generate("edit").await.unwrap();
        assert!(session.result().is_some());

        session.select_image(small_image(b"two")).unwrap();

        assert!(session.result().is_none());
        assert!(session.explanation().is_none());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_result() {
        let mut session = editing_session(
            ScriptedEditor::new()
                .reply_parts(vec![text("first"), image("SU1H")])
                .reply_parts(vec![text("no luck")]),
        );
        session.select_image(small_image(b"src")).unwrap();
        let _ = session.generate("edit").await.unwrap();

        let outcome = session.generate("edit again").await.unwrap();

        assert!(matches!(
            outcome,
            EditOutcome::Failure(EditError::NoImageProduced { .. })
        ));
        assert_eq!(session.explanation(), Some("first"));
        assert_eq!(session.notices().last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_generate_without_image() {
        let editor = ScriptedEditor::new();
        let calls = editor.call_counter();
        let mut session = editing_session(editor);

        let err = session.generate("edit").await.unwrap_err();

        assert!(matches!(err, SessionError::NoImage));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            session.notices().last().unwrap().message,
            "Please select an image first"
        );
        assert_eq!(session.activity(), Activity::Idle);
    }

    #[test]
    fn test_second_generation_refused_while_outstanding() {
        let mut session = editing_session(ScriptedEditor::new());
        session.select_image(small_image(b"src")).unwrap();

        let pending = session.begin_generation("edit").unwrap();
        assert_eq!(session.activity(), Activity::Requesting);
        assert!(matches!(
            session.begin_generation("again"),
            Err(SessionError::Busy)
        ));

        session.complete_generation(
            pending,
            &EditOutcome::Failure(EditError::Unknown("boom".into())),
        );
        assert_eq!(session.activity(), Activity::Idle);
        let next = session.begin_generation("again").unwrap();
        assert_eq!(next.instruction(), "again");
    }

    #[test]
    fn test_reset_drops_late_outcome() {
        let mut session = editing_session(ScriptedEditor::new());
        session.select_image(small_image(b"src")).unwrap();
        let pending = session.begin_generation("edit").unwrap();

        session.reset().unwrap();
        assert_eq!(session.screen(), Screen::Editing);
        assert!(session.source_image().is_none());
        assert!(!session.is_requesting());

        session.select_image(small_image(b"next")).unwrap();
        let current = session.begin_generation("edit next").unwrap();

        let late = EditOutcome::Success(EditedImage {
            image_data: "SU1H".into(),
            mime_type: "image/png".into(),
            text: None,
            model: None,
            duration_ms: None,
        });
        session.complete_generation(pending, &late);

        // The stale outcome neither lands nor ends the newer request.
        assert!(session.result().is_none());
        assert!(session.is_requesting());

        session.complete_generation(current, &late);
        assert!(!session.is_requesting());
        assert!(session.result().is_some());
    }

    #[test]
    fn test_dropped_ticket_recovered_by_reset() {
        let mut session = editing_session(ScriptedEditor::new());
        session.select_image(small_image(b"src")).unwrap();
        drop(session.begin_generation("edit").unwrap());
        assert!(matches!(
            session.begin_generation("again"),
            Err(SessionError::Busy)
        ));

        session.reset().unwrap();
        session.select_image(small_image(b"src")).unwrap();

        assert!(session.begin_generation("again").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_generate_leaves_session_idle() {
        let mut session = editing_session(
            ScriptedEditor::new()
                .with_delay(Duration::from_secs(10))
                .reply_parts(vec![image("SU1H")])
                .reply_parts(vec![text("second"), image("SU1H")]),
        );
        session.select_image(small_image(b"src")).unwrap();

        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), session.generate("edit")).await;
        assert!(cancelled.is_err());
        assert_eq!(session.activity(), Activity::Idle);
        assert!(session.result().is_none());

        let outcome = session.generate("edit again").await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(session.activity(), Activity::Idle);
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> crate::error::Result<Option<String>> {
            Ok(Some(TEST_KEY.to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> crate::error::Result<()> {
            Ok(())
        }

        fn remove(&self, _key: &str) -> crate::error::Result<()> {
            Err(EditifyError::Io(std::io::Error::other("read-only")))
        }
    }

    #[test]
    fn test_failed_logout_keeps_session() {
        let mut session = EditorSession::new(
            GenerationBridge::new(ScriptedEditor::new()),
            CredentialStore::new(ReadOnlyStore),
        )
        .unwrap();
        session.select_image(small_image(b"src")).unwrap();

        let err = session.logout().unwrap_err();

        assert!(matches!(err, SessionError::Storage(EditifyError::Io(_))));
        assert_eq!(session.screen(), Screen::Editing);
        assert!(session.api_key().is_some());
        assert!(session.source_image().is_some());
    }

    #[tokio::test]
    async fn test_save_result() {
        let mut session = editing_session(ScriptedEditor::new().reply_parts(vec![image("SU1H")]));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            session.save_result(dir.path()),
            Err(SessionError::NoResult)
        ));

        session.select_image(small_image(b"src")).unwrap();
        let _ = session.generate("edit").await.unwrap();
        let path = session.save_result(dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), DOWNLOAD_FILE_NAME);
        assert_eq!(std::fs::read(&path).unwrap(), b"IMG");
    }

    #[test]
    fn test_save_rejects_parent_components() {
        let mut session = editing_session(ScriptedEditor::new());
        assert!(matches!(
            session.save_result_to("../escape.jpg"),
            Err(SessionError::UnsafePath(_))
        ));
    }

    #[test]
    fn test_notices_dismiss_and_drain() {
        let mut session = editing_session(ScriptedEditor::new());
        let _ = session.begin_generation("edit");
        assert_eq!(session.notices().len(), 2);

        let first = session.dismiss(0).unwrap();
        assert_eq!(first.level, NoticeLevel::Success);
        assert!(session.dismiss(5).is_none());

        let rest = session.drain_notices();
        assert_eq!(rest.len(), 1);
        assert!(session.notices().is_empty());
    }
}
