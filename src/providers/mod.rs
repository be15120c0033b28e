use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

mod gemini;
mod together;

pub use gemini::Gemini;
pub use together::Together;

/// External services a session holds a key for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Gemini,
    Together,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 2] = [ServiceKind::Gemini, ServiceKind::Together];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Gemini => "gemini",
            ServiceKind::Together => "together",
        }
    }

    pub fn storage_key(&self) -> &'static str {
        match self {
            ServiceKind::Gemini => crate::storage::GEMINI_KEY_NAME,
            ServiceKind::Together => crate::storage::TOGETHER_KEY_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

pub type ProviderFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Single-prompt text completion.
pub trait TextGenerator: Clone + Send + Sync {
    fn generate_text(&self, prompt: String) -> ProviderFuture<String>;
}

/// Text-to-image generation that answers with a hosted asset URL.
pub trait ImageGenerator: Clone + Send + Sync {
    /// `None` when the service answered without an image URL.
    fn generate_image(&self, request: ImageRequest) -> ProviderFuture<Option<String>>;
    fn fetch_asset(&self, url: String) -> ProviderFuture<Vec<u8>>;
}

/// `explicit`, then the environment variable, then the public endpoint.
fn resolve_base_url(explicit: Option<&str>, env_name: &str, default: &str) -> String {
    if let Some(url) = explicit
        && !url.trim().is_empty()
    {
        return url.trim().trim_end_matches('/').to_string();
    }
    std::env::var(env_name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .unwrap_or_else(|| default.to_string())
}

fn format_error_parts(message: Option<String>, kind: Option<String>, code: Option<String>) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message
        && !message.trim().is_empty()
    {
        parts.push(message);
    }
    if let Some(kind) = kind
        && !kind.trim().is_empty()
    {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = code
        && !code.trim().is_empty()
    {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}
