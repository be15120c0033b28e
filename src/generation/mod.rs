use anyhow::{Context, Result};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tera::{Context as TeraContext, Tera};
use tracing::{debug, warn};

use crate::canvas::image::{DataUri, PNG_MIME};
use crate::canvas::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::providers::{Gemini, ImageGenerator, ImageRequest, TextGenerator, Together};
use crate::settings::Settings;
use crate::state::TITLE_COUNT;

mod remote;

pub use remote::RemoteGeneration;

const TITLE_PROMPT: &str = include_str!("prompts/title_prompt.tera");
const IMAGE_PROMPT: &str = include_str!("prompts/image_prompt.tera");

pub const TITLE_COUNT_MESSAGE: &str = "Failed to generate 10 titles. Please try again.";
pub const NO_IMAGE_URL_MESSAGE: &str = "No image URL returned from Together API";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// Rejected request; HTTP 400.
    Validation,
    /// Upstream or generation failure; HTTP 500.
    Upstream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: GenerationErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: GenerationErrorKind::Upstream,
            message: message.into(),
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GenerationError {}

pub fn render_title_prompt(topic: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("topic", topic);
    let rendered = Tera::one_off(TITLE_PROMPT, &context, false)
        .with_context(|| "failed to render title prompt")?;
    Ok(rendered.trim_end().to_string())
}

/// The title is used verbatim; only the image constraints are appended.
pub fn build_image_prompt(title: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("prompt", title);
    let rendered = Tera::one_off(IMAGE_PROMPT, &context, false)
        .with_context(|| "failed to render image prompt")?;
    Ok(rendered.trim_end().to_string())
}

/// One title per line: leading `N.` and following whitespace removed, lines
/// trimmed, blanks dropped, at most ten kept.
pub fn parse_titles(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| strip_number_prefix(line).trim())
        .filter(|line| !line.is_empty())
        .take(TITLE_COUNT)
        .map(str::to_string)
        .collect()
}

fn strip_number_prefix(line: &str) -> &str {
    let rest = line.trim_start_matches(|ch: char| ch.is_ascii_digit());
    if rest.len() == line.len() {
        return line;
    }
    match rest.strip_prefix('.') {
        Some(rest) => rest.trim_start(),
        None => line,
    }
}

/// Asks for ten titles and enforces the count.
pub async fn titles_from_provider<P: TextGenerator>(
    provider: &P,
    topic: &str,
) -> Result<Vec<String>, GenerationError> {
    let prompt = render_title_prompt(topic)
        .map_err(|err| GenerationError::upstream(format!("Failed to generate titles: {}", err)))?;
    let text = provider
        .generate_text(prompt)
        .await
        .map_err(|err| GenerationError::upstream(format!("Failed to generate titles: {}", err)))?;
    let titles = parse_titles(&text);
    if titles.len() < TITLE_COUNT {
        warn!("expected {} titles, got {}", TITLE_COUNT, titles.len());
        return Err(GenerationError::upstream(TITLE_COUNT_MESSAGE));
    }
    Ok(titles)
}

/// Generates a 1280x720 background and embeds the fetched asset as a data
/// URI so the result does not depend on the hosted URL.
pub async fn image_from_provider<P: ImageGenerator>(
    provider: &P,
    prompt: &str,
) -> Result<String, GenerationError> {
    let failed = |err: anyhow::Error| {
        GenerationError::upstream(format!("Failed to generate image: {}", err))
    };
    let request = ImageRequest {
        prompt: build_image_prompt(prompt).map_err(failed)?,
        width: CANVAS_WIDTH,
        height: CANVAS_HEIGHT,
    };
    let Some(url) = provider.generate_image(request).await.map_err(failed)? else {
        return Err(GenerationError::upstream(NO_IMAGE_URL_MESSAGE));
    };
    let bytes = provider.fetch_asset(url).await.map_err(failed)?;
    debug!("embedded generated image ({} bytes)", bytes.len());
    Ok(DataUri::from_bytes(bytes, PNG_MIME).encode())
}

pub type GenerationFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, GenerationError>> + Send + 'a>>;

/// The two generation endpoints, either in-process or over HTTP.
pub trait GenerationService: Send + Sync {
    fn generate_titles(&self, topic: String, api_key: String) -> GenerationFuture<'_, Vec<String>>;
    /// Answers with a self-contained data URI.
    fn generate_image(&self, prompt: String, api_key: String) -> GenerationFuture<'_, String>;
}

/// Calls the upstream services directly.
#[derive(Debug, Clone)]
pub struct LocalGeneration {
    gemini_model: String,
    gemini_base_url: Option<String>,
    together_model: String,
    together_steps: u32,
    together_base_url: Option<String>,
}

impl LocalGeneration {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            gemini_model: settings.gemini_model.clone(),
            gemini_base_url: settings.gemini_base_url.clone(),
            together_model: settings.together_model.clone(),
            together_steps: settings.together_steps,
            together_base_url: settings.together_base_url.clone(),
        }
    }

    fn gemini(&self, key: String) -> Gemini {
        Gemini::new(key)
            .with_model(self.gemini_model.clone())
            .with_base_url(self.gemini_base_url.clone())
    }

    fn together(&self, key: String) -> Together {
        Together::new(key)
            .with_model(self.together_model.clone())
            .with_steps(self.together_steps)
            .with_base_url(self.together_base_url.clone())
    }
}

impl GenerationService for LocalGeneration {
    fn generate_titles(&self, topic: String, api_key: String) -> GenerationFuture<'_, Vec<String>> {
        Box::pin(async move {
            if topic.trim().is_empty() {
                return Err(GenerationError::validation(
                    "Topic is required and must be a non-empty string",
                ));
            }
            if api_key.trim().is_empty() {
                return Err(GenerationError::validation("Gemini API key is required"));
            }
            titles_from_provider(&self.gemini(api_key), &topic).await
        })
    }

    fn generate_image(&self, prompt: String, api_key: String) -> GenerationFuture<'_, String> {
        Box::pin(async move {
            if prompt.trim().is_empty() {
                return Err(GenerationError::validation(
                    "Prompt is required and must be a non-empty string",
                ));
            }
            if api_key.trim().is_empty() {
                return Err(GenerationError::validation("Together API key is required"));
            }
            image_from_provider(&self.together(api_key), &prompt).await
        })
    }
}

#[derive(Debug, Clone)]
pub enum GenerationImpl {
    Local(LocalGeneration),
    Remote(RemoteGeneration),
}

impl GenerationImpl {
    /// Remote when an API base is given, otherwise in-process.
    pub fn select(settings: &Settings, api_base: Option<&str>) -> Self {
        match api_base.map(str::trim).filter(|base| !base.is_empty()) {
            Some(base) => GenerationImpl::Remote(RemoteGeneration::new(base)),
            None => GenerationImpl::Local(LocalGeneration::from_settings(settings)),
        }
    }
}

impl GenerationService for GenerationImpl {
    fn generate_titles(&self, topic: String, api_key: String) -> GenerationFuture<'_, Vec<String>> {
        match self {
            GenerationImpl::Local(service) => service.generate_titles(topic, api_key),
            GenerationImpl::Remote(service) => service.generate_titles(topic, api_key),
        }
    }

    fn generate_image(&self, prompt: String, api_key: String) -> GenerationFuture<'_, String> {
        match self {
            GenerationImpl::Local(service) => service.generate_image(prompt, api_key),
            GenerationImpl::Remote(service) => service.generate_image(prompt, api_key),
        }
    }
}
