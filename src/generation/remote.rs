use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{GenerationError, GenerationFuture, GenerationService, TITLE_COUNT_MESSAGE};
use crate::state::TITLE_COUNT;

/// Client of a running `tubeme --server`.
#[derive(Debug, Clone)]
pub struct RemoteGeneration {
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TitlesBody {
    titles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImageBody {
    #[serde(rename = "imageUrl")]
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl RemoteGeneration {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
        fallback: &str,
    ) -> Result<String, GenerationError> {
        let url = format!("{}{}", self.api_base, path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerationError::upstream(format!("{}: {}", fallback, err)))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            return Ok(text);
        }
        Err(error_from_response(status, &text, fallback))
    }
}

fn error_from_response(
    status: reqwest::StatusCode,
    text: &str,
    fallback: &str,
) -> GenerationError {
    let message = serde_json::from_str::<ErrorBody>(text)
        .ok()
        .and_then(|body| body.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    if status == reqwest::StatusCode::BAD_REQUEST {
        GenerationError::validation(message)
    } else {
        GenerationError::upstream(message)
    }
}

fn parse_titles_body(text: &str) -> Result<Vec<String>, GenerationError> {
    let body: TitlesBody = serde_json::from_str(text).map_err(|err| {
        GenerationError::upstream(format!("Failed to generate titles: {}", err))
    })?;
    if body.titles.len() != TITLE_COUNT {
        return Err(GenerationError::upstream(TITLE_COUNT_MESSAGE));
    }
    Ok(body.titles)
}

fn parse_image_body(text: &str) -> Result<String, GenerationError> {
    let body: ImageBody = serde_json::from_str(text).map_err(|err| {
        GenerationError::upstream(format!("Failed to generate image: {}", err))
    })?;
    Ok(body.image_url)
}

impl GenerationService for RemoteGeneration {
    fn generate_titles(&self, topic: String, api_key: String) -> GenerationFuture<'_, Vec<String>> {
        Box::pin(async move {
            let text = self
                .post(
                    "/generate-titles",
                    json!({ "topic": topic, "apiKey": api_key }),
                    "Failed to generate titles",
                )
                .await?;
            parse_titles_body(&text)
        })
    }

    fn generate_image(&self, prompt: String, api_key: String) -> GenerationFuture<'_, String> {
        Box::pin(async move {
            let text = self
                .post(
                    "/generate-image",
                    json!({ "prompt": prompt, "apiKey": api_key }),
                    "Failed to generate image",
                )
                .await?;
            parse_image_body(&text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationErrorKind;
    use reqwest::StatusCode;

    #[test]
    fn status_selects_error_kind() {
        let err = error_from_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Gemini API key is required"}"#,
            "Failed to generate titles",
        );
        assert_eq!(err, GenerationError::validation("Gemini API key is required"));

        let err = error_from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "gateway exploded",
            "Failed to generate image",
        );
        assert_eq!(err.kind, GenerationErrorKind::Upstream);
        assert_eq!(err.message, "Failed to generate image");
    }

    #[test]
    fn titles_body_must_hold_ten() {
        let ten: Vec<String> = (1..=10).map(|idx| format!("Title {}", idx)).collect();
        let body = json!({ "titles": ten }).to_string();
        assert_eq!(parse_titles_body(&body).expect("titles").len(), 10);

        let short = json!({ "titles": ["a", "b"] }).to_string();
        assert_eq!(
            parse_titles_body(&short).unwrap_err().message,
            TITLE_COUNT_MESSAGE
        );
    }

    #[test]
    fn image_body_reads_data_uri() {
        let body = r#"{"imageUrl":"data:image/png;base64,AAAA"}"#;
        assert_eq!(
            parse_image_body(body).expect("image"),
            "data:image/png;base64,AAAA"
        );
        assert!(parse_image_body("{}").is_err());
    }

    #[test]
    fn api_base_is_normalised() {
        assert_eq!(
            RemoteGeneration::new(" http://127.0.0.1:8787/ ").api_base(),
            "http://127.0.0.1:8787"
        );
    }
}
