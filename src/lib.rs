use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};

pub mod canvas;
pub mod editor;
pub mod generation;
pub mod logging;
mod paths;
pub mod providers;
pub mod server;
pub mod session;
pub mod settings;
pub mod state;
pub mod storage;
pub mod store;
pub mod validators;

pub use canvas::{Compositor, Surface};
pub use generation::{GenerationImpl, GenerationService};
pub use session::{Notice, Session, SessionError, SessionErrorKind};
pub use state::AppState;
pub use storage::{FileKeyStorage, KeyStorage};
pub use store::Store;

const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub key: Option<String>,
    pub api_base: Option<String>,
    pub settings_path: Option<String>,
}

/// One-shot title generation: the topic comes from `input`, the output is
/// the ten titles, one per line.
pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings = load_settings(&config)?;
    let input = input.unwrap_or_default();
    let topic = validators::validate_topic(&input).map_err(|err| anyhow!(err.0))?;
    let key = resolve_gemini_key(config.key.as_deref(), &FileKeyStorage::default_location())
        .with_context(|| "no Gemini API key found")?;

    let generation = GenerationImpl::select(&settings, config.api_base.as_deref());
    let titles = generation
        .generate_titles(topic, key)
        .await
        .map_err(|err| anyhow!(err.message))?;
    Ok(titles.join("\n"))
}

/// Opens an editing session backed by the key file and the system fonts.
/// Also returns where the live preview should be written.
pub async fn open_session(config: &Config) -> Result<(Session<FileKeyStorage, GenerationImpl>, PathBuf)> {
    let settings = load_settings(config)?;
    let store = Store::open(FileKeyStorage::default_location())?;
    let fonts = canvas::font::FontBook::system(&settings.font_paths)?;
    let generation = GenerationImpl::select(&settings, config.api_base.as_deref());
    let session = Session::new(store, Compositor::new(fonts), generation).await?;
    Ok((session, settings.preview_path()))
}

fn load_settings(config: &Config) -> Result<settings::Settings> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    settings::load_settings(settings_path)
}

/// `--key`, then the saved key, then `GEMINI_API_KEY`.
fn resolve_gemini_key<S: KeyStorage>(override_key: Option<&str>, storage: &S) -> Result<String> {
    if let Some(key) = override_key
        && !key.trim().is_empty()
    {
        return Ok(key.trim().to_string());
    }
    if let Some(key) = storage.get(providers::ServiceKind::Gemini.storage_key())?
        && !key.trim().is_empty()
    {
        return Ok(key);
    }
    std::env::var(GEMINI_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow!("pass --key, save one with /keys, or set {}", GEMINI_KEY_ENV))
}
