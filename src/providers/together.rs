use anyhow::anyhow;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ImageGenerator, ImageRequest, ProviderFuture, format_error_parts, resolve_base_url};

const DEFAULT_BASE_URL: &str = "https://api.together.xyz/v1";
const BASE_URL_ENV: &str = "TOGETHER_BASE_URL";
pub(crate) const DEFAULT_MODEL: &str = "black-forest-labs/FLUX.1-schnell";
pub(crate) const DEFAULT_STEPS: u32 = 4;

#[derive(Debug, Clone)]
pub struct Together {
    key: String,
    model: String,
    steps: u32,
    base_url: Option<String>,
    client: reqwest::Client,
}

impl Together {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            steps: DEFAULT_STEPS,
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

    pub fn with_steps(mut self, steps: u32) -> Self {
        if steps > 0 {
            self.steps = steps;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/images/generations",
            resolve_base_url(self.base_url.as_deref(), BASE_URL_ENV, DEFAULT_BASE_URL)
        )
    }

    fn request_body(&self, request: &ImageRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "prompt": request.prompt,
            "width": request.width,
            "height": request.height,
            "steps": self.steps,
            "n": 1
        })
    }
}

impl ImageGenerator for Together {
    fn generate_image(&self, request: ImageRequest) -> ProviderFuture<Option<String>> {
        let provider = self.clone();
        Box::pin(async move {
            let url = provider.endpoint();
            let body = provider.request_body(&request);
            debug!(
                "Together request to {} ({}x{})",
                provider.model, request.width, request.height
            );
            let response = provider
                .client
                .post(&url)
                .bearer_auth(&provider.key)
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!(
                    "Together API error ({}): {}",
                    status,
                    extract_together_error(&text).unwrap_or(text)
                ));
            }
            extract_image_url(&text)
        })
    }

    fn fetch_asset(&self, url: String) -> ProviderFuture<Vec<u8>> {
        let client = self.client.clone();
        Box::pin(async move {
            debug!("fetching generated image");
            let response = client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(anyhow!("Failed to fetch generated image"));
            }
            let bytes = response.bytes().await?;
            Ok(bytes.to_vec())
        })
    }
}

fn extract_image_url(text: &str) -> anyhow::Result<Option<String>> {
    let payload: TogetherResponse = serde_json::from_str(text)
        .map_err(|err| anyhow!("failed to parse Together response JSON: {}", err))?;
    Ok(payload
        .data
        .into_iter()
        .next()
        .and_then(|image| image.url)
        .filter(|url| !url.trim().is_empty()))
}

fn extract_together_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<TogetherError>,
    }

    #[derive(Deserialize)]
    struct TogetherError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(error.message, error.kind, error.code))
}

#[derive(Debug, Deserialize)]
struct TogetherResponse {
    #[serde(default)]
    data: Vec<TogetherImage>,
}

#[derive(Debug, Deserialize)]
struct TogetherImage {
    url: Option<String>,
}
