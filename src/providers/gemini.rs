use anyhow::anyhow;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ProviderFuture, TextGenerator, format_error_parts, resolve_base_url};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const BASE_URL_ENV: &str = "GEMINI_BASE_URL";
pub(crate) const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug, Clone)]
pub struct Gemini {
    key: String,
    model: String,
    base_url: Option<String>,
    client: reqwest::Client,
}

impl Gemini {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            resolve_base_url(self.base_url.as_deref(), BASE_URL_ENV, DEFAULT_BASE_URL),
            self.model
        )
    }
}

impl TextGenerator for Gemini {
    fn generate_text(&self, prompt: String) -> ProviderFuture<String> {
        let provider = self.clone();
        Box::pin(async move {
            let url = provider.endpoint();
            let body = json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": [{ "text": prompt }]
                    }
                ]
            });
            debug!("Gemini request to {}", provider.model);
            let response = provider
                .client
                .post(&url)
                .header("x-goog-api-key", provider.key.clone())
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!(
                    "Gemini API error ({}): {}",
                    status,
                    extract_gemini_error(&text).unwrap_or(text)
                ));
            }
            extract_text_response(&text)
        })
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text_response(text: &str) -> anyhow::Result<String> {
    let payload: GeminiResponse = serde_json::from_str(text)
        .map_err(|err| anyhow!("failed to parse Gemini response JSON: {}", err))?;
    let content = payload
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .ok_or_else(|| anyhow!("no candidate returned from Gemini"))?;
    let joined = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("");
    Ok(joined)
}

fn extract_gemini_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<GeminiError>,
    }

    #[derive(Deserialize)]
    struct GeminiError {
        message: Option<String>,
        status: Option<String>,
        code: Option<i32>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(
        error.message,
        error.status,
        error.code.map(|value| value.to_string()),
    ))
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}
