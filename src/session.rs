use anyhow::Context;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::canvas::image::{DataUri, JPEG_MIME, PNG_MIME};
use crate::canvas::{BackgroundStatus, Compositor, RenderOutcome, Surface};
use crate::editor::{DragController, PointerEvent, Viewport};
use crate::generation::{GenerationError, GenerationErrorKind, GenerationService};
use crate::providers::ServiceKind;
use crate::state::{ApiKeys, AppState, OverlayUpdate};
use crate::storage::KeyStorage;
use crate::store::Store;
use crate::validators::{self, ValidationError};

/// Transient success message shown to the user.
pub type Notice = &'static str;

pub const KEYS_SAVED: Notice = "API keys saved successfully!";
pub const TITLES_GENERATED: Notice = "10 titles generated successfully!";
pub const TITLE_SELECTED: Notice = "Title selected!";
pub const IMAGE_UPLOADED: Notice = "Image uploaded successfully!";
pub const IMAGE_GENERATED: Notice = "Thumbnail image generated successfully!";
pub const THUMBNAIL_DOWNLOADED: Notice = "Thumbnail downloaded!";

const LOAD_FAILED: &str = "Failed to load image. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    Validation,
    Upstream,
    Render,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl SessionError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::Validation,
            message: message.into(),
        }
    }

    fn render(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::Render,
            message: message.into(),
        }
    }

    fn storage(err: anyhow::Error) -> Self {
        Self {
            kind: SessionErrorKind::Storage,
            message: format!("{:#}", err),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SessionError {}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::validation(err.0)
    }
}

impl From<GenerationError> for SessionError {
    fn from(err: GenerationError) -> Self {
        let kind = match err.kind {
            GenerationErrorKind::Validation => SessionErrorKind::Validation,
            GenerationErrorKind::Upstream => SessionErrorKind::Upstream,
        };
        Self {
            kind,
            message: err.message,
        }
    }
}

/// One editing session: the state container, the drawing surface kept in
/// sync with the thumbnail state, and the generation service.
pub struct Session<S: KeyStorage, G: GenerationService> {
    store: Store<S>,
    compositor: Compositor,
    surface: Surface,
    generation: G,
    viewport: Viewport,
    last_render: Option<RenderOutcome>,
}

impl<S: KeyStorage, G: GenerationService> Session<S, G> {
    /// Draws the initial (empty) thumbnail.
    pub async fn new(store: Store<S>, compositor: Compositor, generation: G) -> anyhow::Result<Self> {
        let (surface, outcome) = draw(&compositor, store.state()).await?;
        Ok(Self {
            store,
            compositor,
            surface,
            generation,
            viewport: Viewport::canvas(),
            last_render: Some(outcome),
        })
    }

    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn last_render(&self) -> Option<&RenderOutcome> {
        self.last_render.as_ref()
    }

    pub fn save_api_keys(&mut self, gemini: &str, together: &str) -> Result<Notice, SessionError> {
        let gemini = validators::validate_api_key(gemini).map_err(|err| {
            SessionError::validation(format!("Gemini API Key: {}", err.message()))
        })?;
        let together = validators::validate_api_key(together).map_err(|err| {
            SessionError::validation(format!("Together API Key: {}", err.message()))
        })?;
        self.store
            .save_api_keys(ApiKeys { gemini, together })
            .map_err(SessionError::storage)?;
        info!("API keys saved");
        Ok(KEYS_SAVED)
    }

    pub async fn generate_titles(&mut self, topic: &str) -> Result<Notice, SessionError> {
        let topic = validators::validate_topic(topic)?;
        let key = self.state().api_keys.get(ServiceKind::Gemini).to_string();
        if key.is_empty() {
            return Err(SessionError::validation(
                "Please configure your Gemini API key first",
            ));
        }
        self.store.update(|state| state.with_generating_titles(true));
        let result = self.generation.generate_titles(topic.clone(), key).await;
        self.store.update(|state| state.with_generating_titles(false));
        let titles = result?;
        info!("received {} titles", titles.len());
        self.store
            .update(|state| state.with_topic(topic).with_titles(titles));
        Ok(TITLES_GENERATED)
    }

    /// `index` is 1-based, as listed to the user.
    pub fn select_title(&mut self, index: usize) -> Result<Notice, SessionError> {
        let titles = &self.state().titles;
        if titles.is_empty() {
            return Err(SessionError::validation("Please generate titles first"));
        }
        let Some(title) = index.checked_sub(1).and_then(|idx| titles.get(idx)).cloned() else {
            return Err(SessionError::validation(format!(
                "Choose a title between 1 and {}",
                titles.len()
            )));
        };
        self.store.update(|state| state.with_selected_title(title));
        Ok(TITLE_SELECTED)
    }

    pub async fn upload_image(&mut self, path: &Path) -> Result<Notice, SessionError> {
        let mime = mime_from_extension(path);
        let size = std::fs::metadata(path)
            .map_err(|_| SessionError::render(LOAD_FAILED))?
            .len();
        validators::validate_image_upload(mime, size)?;
        let bytes = std::fs::read(path).map_err(|_| SessionError::render(LOAD_FAILED))?;
        let uri = DataUri {
            mime: mime.to_string(),
            bytes,
        }
        .encode();
        check_decodes(&uri)
            .await
            .map_err(|_| SessionError::render(LOAD_FAILED))?;
        debug!("uploaded {} ({} bytes)", path.display(), size);
        let next = self.state().with_background_image(Some(uri));
        self.commit(next).await?;
        Ok(IMAGE_UPLOADED)
    }

    pub async fn generate_image(&mut self) -> Result<Notice, SessionError> {
        let title = self.state().selected_title.clone();
        if title.is_empty() {
            return Err(SessionError::validation("Please select a title first"));
        }
        let key = self.state().api_keys.get(ServiceKind::Together).to_string();
        if key.is_empty() {
            return Err(SessionError::validation(
                "Please configure your Together API key first",
            ));
        }
        self.store.update(|state| state.with_generating_image(true));
        let result = self.generation.generate_image(title, key).await;
        self.store.update(|state| state.with_generating_image(false));
        let uri = result?;
        check_decodes(&uri)
            .await
            .map_err(|err| SessionError::render(format!("Failed to generate image: {:#}", err)))?;
        let next = self.state().with_background_image(Some(uri));
        self.commit(next).await?;
        Ok(IMAGE_GENERATED)
    }

    pub async fn set_text(&mut self, text: &str) -> Result<(), SessionError> {
        let text = validators::validate_text(text)?;
        self.update_overlay(OverlayUpdate {
            text: Some(text),
            ..OverlayUpdate::default()
        })
        .await
    }

    pub async fn set_font_family(&mut self, name: &str) -> Result<(), SessionError> {
        let family = validators::validate_font_family(name)?;
        self.update_overlay(OverlayUpdate {
            font_family: Some(family),
            ..OverlayUpdate::default()
        })
        .await
    }

    pub async fn set_font_size(&mut self, size: u32) -> Result<(), SessionError> {
        let size = validators::validate_font_size(size)?;
        self.update_overlay(OverlayUpdate {
            font_size: Some(size),
            ..OverlayUpdate::default()
        })
        .await
    }

    /// Partial hex values are stored as typed; rendering keeps the previous
    /// fill until the value is a complete colour.
    pub async fn set_color(&mut self, value: &str) -> Result<(), SessionError> {
        let color = validators::validate_color_input(value)?;
        self.update_overlay(OverlayUpdate {
            color: Some(color),
            ..OverlayUpdate::default()
        })
        .await
    }

    /// Returns whether the event changed the session.
    pub async fn pointer(&mut self, event: PointerEvent) -> Result<bool, SessionError> {
        if !event.is_finite() {
            return Err(SessionError::validation("Pointer coordinates must be finite"));
        }
        let controller = DragController::new(self.compositor.fonts(), self.viewport);
        let Some(next) = controller.handle(self.store.state(), event) else {
            return Ok(false);
        };
        self.commit(next).await?;
        Ok(true)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), SessionError> {
        if !(viewport.width > 0.0 && viewport.height > 0.0) {
            return Err(SessionError::validation(
                "Viewport width and height must be positive",
            ));
        }
        self.viewport = viewport;
        Ok(())
    }

    /// Writes the current surface into `dir` and returns the file path.
    pub fn download(&self, dir: &Path) -> Result<(Notice, PathBuf), SessionError> {
        if self.state().thumbnail.background_image.is_none() {
            return Err(SessionError::validation(
                "Please add a background image first",
            ));
        }
        let path = dir.join(crate::canvas::export_filename(&self.state().selected_title));
        crate::canvas::export(&self.surface, &path).map_err(SessionError::storage)?;
        info!("thumbnail written to {}", path.display());
        Ok((THUMBNAIL_DOWNLOADED, path))
    }

    /// Writes the current surface regardless of preconditions.
    pub fn write_preview(&self, path: &Path) -> anyhow::Result<()> {
        crate::canvas::export(&self.surface, path)
            .with_context(|| format!("failed to write preview: {}", path.display()))
    }

    async fn update_overlay(&mut self, update: OverlayUpdate) -> Result<(), SessionError> {
        let next = self.state().with_overlay(update);
        self.commit(next).await
    }

    /// Publishes `next`. When the thumbnail changed, `next` is drawn on a
    /// fresh surface first; state, surface and `last_render` only move
    /// forward together once that draw succeeded.
    async fn commit(&mut self, next: AppState) -> Result<(), SessionError> {
        if next.thumbnail == self.state().thumbnail {
            self.store.replace(next);
            return Ok(());
        }
        let (surface, outcome) = draw(&self.compositor, &next)
            .await
            .map_err(|err| SessionError::render(format!("{:#}", err)))?;
        if let BackgroundStatus::Failed(reason) = &outcome.background {
            return Err(SessionError::render(format!(
                "Failed to draw background: {}",
                reason
            )));
        }
        self.store.replace(next);
        self.surface = surface;
        self.last_render = Some(outcome);
        Ok(())
    }
}

async fn draw(compositor: &Compositor, state: &AppState) -> anyhow::Result<(Surface, RenderOutcome)> {
    let mut surface = Surface::new()?;
    let thumbnail = &state.thumbnail;
    let outcome = compositor
        .render(
            &mut surface,
            thumbnail.background_image.as_deref(),
            &thumbnail.text_overlay,
        )
        .await?;
    Ok((surface, outcome))
}

/// The MIME a browser would report for the file name.
fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => PNG_MIME,
        Some("jpg") | Some("jpeg") => JPEG_MIME,
        _ => "",
    }
}

async fn check_decodes(uri: &str) -> anyhow::Result<()> {
    let uri = uri.to_string();
    tokio::task::spawn_blocking(move || crate::canvas::image::decode_background(&uri))
        .await
        .with_context(|| "background decode task failed")??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::font::FontBook;
    use crate::canvas::geometry::TextMeasure;
    use crate::canvas::image::tests::png_bytes;
    use crate::generation::tests::{TestText, numbered_titles};
    use crate::generation::{GenerationFuture, titles_from_provider};
    use crate::storage::{GEMINI_KEY_NAME, MemoryKeyStorage, TOGETHER_KEY_NAME};

    struct StubGeneration {
        text: TestText,
        image: Option<String>,
    }

    impl GenerationService for StubGeneration {
        fn generate_titles(&self, topic: String, _api_key: String) -> GenerationFuture<'_, Vec<String>> {
            Box::pin(async move { titles_from_provider(&self.text, &topic).await })
        }

        fn generate_image(&self, _prompt: String, _api_key: String) -> GenerationFuture<'_, String> {
            let image = self.image.clone();
            Box::pin(async move {
                image.ok_or_else(|| GenerationError::upstream("Failed to generate image: boom"))
            })
        }
    }

    fn png_uri() -> String {
        DataUri::from_bytes(png_bytes(8, 8, |_, _| [200, 40, 40, 255]), PNG_MIME).encode()
    }

    async fn session_with(text: TestText, image: Option<String>) -> Session<MemoryKeyStorage, StubGeneration> {
        session_with_fonts(FontBook::empty(), text, image).await
    }

    async fn session_with_fonts(
        fonts: FontBook,
        text: TestText,
        image: Option<String>,
    ) -> Session<MemoryKeyStorage, StubGeneration> {
        let storage = MemoryKeyStorage::default()
            .with_value(GEMINI_KEY_NAME, "gemini-0123456789")
            .with_value(TOGETHER_KEY_NAME, "together-0123456789");
        Session::new(
            Store::open(storage).expect("store"),
            Compositor::new(fonts),
            StubGeneration { text, image },
        )
        .await
        .expect("session")
    }

    #[tokio::test]
    async fn empty_topic_is_rejected_without_calling_out() {
        let text = TestText::replying(&numbered_titles(10));
        let mut session = session_with(text.clone(), None).await;
        let err = session.generate_titles("").await.unwrap_err();
        assert_eq!(err.kind, SessionErrorKind::Validation);
        assert_eq!(err.message, "Topic cannot be empty");
        assert_eq!(text.calls(), 0);
    }

    #[tokio::test]
    async fn ten_titles_are_stored_with_topic() {
        let mut session = session_with(TestText::replying(&numbered_titles(10)), None).await;
        let notice = session
            .generate_titles("10 tips for remote work")
            .await
            .expect("titles");
        assert_eq!(notice, "10 titles generated successfully!");
        let state = session.state();
        assert_eq!(state.titles.len(), 10);
        assert_eq!(state.titles[0], "Remote Work Title 1");
        assert_eq!(state.topic, "10 tips for remote work");
        assert!(!state.is_generating_titles);
    }

    #[tokio::test]
    async fn short_answer_leaves_titles_unchanged() {
        let mut session = session_with(TestText::replying(&numbered_titles(7)), None).await;
        let before = session.state().clone();
        let err = session.generate_titles("remote work").await.unwrap_err();
        assert_eq!(err.kind, SessionErrorKind::Upstream);
        assert_eq!(err.message, "Failed to generate 10 titles. Please try again.");
        assert_eq!(session.state(), &before);
    }

    #[tokio::test]
    async fn missing_gemini_key_is_rejected() {
        let text = TestText::replying(&numbered_titles(10));
        let mut session = Session::new(
            Store::open(MemoryKeyStorage::default()).expect("store"),
            Compositor::new(FontBook::empty()),
            StubGeneration {
                text: text.clone(),
                image: None,
            },
        )
        .await
        .expect("session");
        let err = session.generate_titles("remote work").await.unwrap_err();
        assert_eq!(err.message, "Please configure your Gemini API key first");
        assert_eq!(text.calls(), 0);
    }

    #[tokio::test]
    async fn saving_keys_validates_each_key() {
        let mut session = session_with(TestText::replying(""), None).await;
        let err = session.save_api_keys("short", "together-0123456789").unwrap_err();
        assert_eq!(err.message, "Gemini API Key: API key appears to be invalid");
        let err = session.save_api_keys("gemini-abcdefghij", "").unwrap_err();
        assert_eq!(err.message, "Together API Key: API key cannot be empty");
        assert_eq!(
            session.save_api_keys(" gemini-abcdefghij ", "together-abcdefghij"),
            Ok(KEYS_SAVED)
        );
        assert_eq!(session.state().api_keys.gemini, "gemini-abcdefghij");
    }

    #[tokio::test]
    async fn oversized_upload_keeps_background() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![0u8; 6 * 1024 * 1024]).expect("write");
        let mut session = session_with(TestText::replying(""), None).await;
        let err = session.upload_image(&path).await.unwrap_err();
        assert_eq!(err.message, "Image must be less than 5MB");
        assert!(session.state().thumbnail.background_image.is_none());
    }

    #[tokio::test]
    async fn upload_rejects_other_types_and_broken_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gif = dir.path().join("cat.gif");
        std::fs::write(&gif, b"GIF89a").expect("write");
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not a png").expect("write");
        let mut session = session_with(TestText::replying(""), None).await;

        let err = session.upload_image(&gif).await.unwrap_err();
        assert_eq!(err.message, "Only PNG and JPEG images are supported");
        let err = session.upload_image(&broken).await.unwrap_err();
        assert_eq!(err.kind, SessionErrorKind::Render);
        assert_eq!(err.message, "Failed to load image. Please try again.");
        assert!(session.state().thumbnail.background_image.is_none());
    }

    #[tokio::test]
    async fn upload_sets_background_and_renders_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bg.PNG");
        std::fs::write(&path, png_bytes(4, 4, |_, _| [0, 0, 250, 255])).expect("write");
        let mut session = session_with(TestText::replying(""), None).await;
        assert_eq!(session.upload_image(&path).await, Ok(IMAGE_UPLOADED));
        let background = session.state().thumbnail.background_image.clone();
        assert!(background.expect("background").starts_with("data:image/png;base64,"));
        assert_eq!(session.surface().pixel(640, 360), Some([0, 0, 250, 255]));
        assert_eq!(
            session.last_render().map(|outcome| outcome.background.clone()),
            Some(BackgroundStatus::Image)
        );
    }

    #[tokio::test]
    async fn download_without_title_is_thumbnail_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_with(TestText::replying(""), Some(png_uri())).await;
        let err = session.download(dir.path()).unwrap_err();
        assert_eq!(err.message, "Please add a background image first");

        let image = dir.path().join("bg.png");
        std::fs::write(&image, png_bytes(2, 2, |_, _| [1, 2, 3, 255])).expect("write");
        session.upload_image(&image).await.expect("upload");
        let (notice, path) = session.download(dir.path()).expect("download");
        assert_eq!(notice, "Thumbnail downloaded!");
        assert_eq!(path.file_name().and_then(|name| name.to_str()), Some("thumbnail.png"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn generated_image_needs_selected_title() {
        let mut session = session_with(TestText::replying(&numbered_titles(10)), Some(png_uri())).await;
        let err = session.generate_image().await.unwrap_err();
        assert_eq!(err.message, "Please select a title first");

        assert_eq!(
            session.select_title(1).unwrap_err().message,
            "Please generate titles first"
        );
        session.generate_titles("remote work").await.expect("titles");
        assert_eq!(session.select_title(3), Ok(TITLE_SELECTED));
        assert_eq!(session.state().selected_title, "Remote Work Title 3");
        assert!(session.select_title(11).is_err());

        assert_eq!(session.generate_image().await, Ok(IMAGE_GENERATED));
        assert!(session.state().thumbnail.background_image.is_some());
        assert!(!session.state().is_generating_image);
        let (_, path) = session.download(&std::env::temp_dir()).expect("download");
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("Remote-Work-Title-3.png")
        );
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn failed_image_generation_changes_nothing() {
        let mut session = session_with(TestText::replying(&numbered_titles(10)), None).await;
        session.generate_titles("remote work").await.expect("titles");
        session.select_title(1).expect("select");
        let before = session.state().clone();
        let err = session.generate_image().await.unwrap_err();
        assert_eq!(err.kind, SessionErrorKind::Upstream);
        assert_eq!(session.state(), &before);
    }

    #[tokio::test]
    async fn drag_clamps_to_right_edge() {
        let mut session = session_with(TestText::replying(""), None).await;
        session.set_text("Remote Work").await.expect("text");
        assert!(session
            .pointer(PointerEvent::Down { x: 50.0, y: 50.0 })
            .await
            .expect("down"));
        assert!(session
            .pointer(PointerEvent::Move { x: 1200.0, y: 100.0 })
            .await
            .expect("move"));
        assert!(session.pointer(PointerEvent::Up).await.expect("up"));
        let overlay = session.state().overlay().clone();
        let width = FontBook::empty()
            .measure("Remote Work", 64.0, overlay.font_family)
            .width;
        assert_eq!(overlay.x, 1280.0 - width);
        assert_eq!(overlay.y, 100.0);
        assert!(!session.state().thumbnail.is_dragging);
        assert!(!session.pointer(PointerEvent::Move { x: 10.0, y: 10.0 }).await.expect("idle"));
    }

    #[tokio::test]
    async fn overlay_controls_validate_input() {
        let mut session = session_with(TestText::replying(""), None).await;
        assert_eq!(
            session.set_font_size(19).await.unwrap_err().message,
            "Font size must be between 20 and 200"
        );
        assert!(session.set_font_family("Helvetica").await.is_err());
        assert!(session.set_color("red").await.is_err());
        assert!(session.set_text(&"x".repeat(201)).await.is_err());

        session.set_font_family("georgia").await.expect("family");
        session.set_color("#12").await.expect("partial colour");
        session.set_font_size(120).await.expect("size");
        let overlay = session.state().overlay();
        assert_eq!(overlay.color, "#12");
        assert_eq!(overlay.font_size, 120);
        assert_eq!(overlay.font_family.as_str(), "Georgia");
    }

    #[tokio::test]
    async fn scaled_viewport_is_applied_to_pointer() {
        let mut session = session_with(TestText::replying(""), None).await;
        session
            .set_viewport(Viewport {
                left: 0.0,
                top: 0.0,
                width: 640.0,
                height: 360.0,
            })
            .expect("viewport");
        session
            .pointer(PointerEvent::Down { x: 100.0, y: 50.0 })
            .await
            .expect("down");
        assert_eq!(
            (session.state().overlay().x, session.state().overlay().y),
            (200.0, 100.0)
        );
        assert!(session.set_viewport(Viewport { width: 0.0, ..Viewport::canvas() }).is_err());
    }

    #[tokio::test]
    async fn control_characters_in_text_still_render() {
        let fonts = FontBook::system::<&Path>(&[]).expect("fonts");
        let mut session = session_with_fonts(fonts, TestText::replying(""), None).await;
        session.set_text("Hello").await.expect("text");
        session.set_text("Tab\u{1}bed").await.expect("control text");
        assert_eq!(session.state().overlay().text, "Tab\u{1}bed");
        assert!(session.last_render().expect("outcome").text_drawn);
        session.set_font_size(100).await.expect("size");
        assert_eq!(session.state().overlay().font_size, 100);
    }

    #[tokio::test]
    async fn failed_draw_keeps_previous_snapshot() {
        let mut session = session_with(TestText::replying(""), None).await;
        session.set_text("Remote").await.expect("text");
        let before = session.state().clone();
        let pixels = session.surface().data().to_vec();
        let outcome = session.last_render().cloned();

        let broken = DataUri {
            mime: PNG_MIME.to_string(),
            bytes: b"not an image".to_vec(),
        }
        .encode();
        let next = session.state().with_background_image(Some(broken));
        let err = session.commit(next).await.unwrap_err();
        assert_eq!(err.kind, SessionErrorKind::Render);
        assert_eq!(session.state(), &before);
        assert_eq!(session.surface().data(), pixels.as_slice());
        assert_eq!(session.last_render().cloned(), outcome);
    }

    #[tokio::test]
    async fn download_write_failure_is_storage_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = dir.path().join("bg.png");
        std::fs::write(&image, png_bytes(2, 2, |_, _| [1, 2, 3, 255])).expect("write");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").expect("write");
        let mut session = session_with(TestText::replying(""), None).await;
        session.upload_image(&image).await.expect("upload");
        let err = session.download(&blocker.join("nested")).unwrap_err();
        assert_eq!(err.kind, SessionErrorKind::Storage);
    }

    #[tokio::test]
    async fn non_finite_pointer_is_rejected() {
        let mut session = session_with(TestText::replying(""), None).await;
        let before = session.state().clone();
        let err = session
            .pointer(PointerEvent::Down {
                x: f32::NAN,
                y: f32::INFINITY,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, SessionErrorKind::Validation);
        assert_eq!(session.state(), &before);
        assert!(session.pointer(PointerEvent::Leave).await.is_ok());
    }
}
