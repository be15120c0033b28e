use axum::Json;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generation::{GenerationError, GenerationErrorKind};

/// Fields are kept as raw JSON so a non-string value is reported as a
/// missing field rather than a parse failure.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct TitlesRequest {
    pub(crate) topic: Option<Value>,
    #[serde(rename = "apiKey")]
    pub(crate) api_key: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ImageRequest {
    pub(crate) prompt: Option<Value>,
    #[serde(rename = "apiKey")]
    pub(crate) api_key: Option<Value>,
}

pub(crate) fn text_field(value: &Option<Value>) -> String {
    value
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Serialize)]
pub(crate) struct TitlesResponse {
    pub(crate) titles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageResponse {
    #[serde(rename = "imageUrl")]
    pub(crate) image_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub(crate) fn into_response(self) -> (StatusCode, Json<ErrorResponse>) {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
    }
}

impl From<GenerationError> for ServerError {
    fn from(err: GenerationError) -> Self {
        let status = match err.kind {
            GenerationErrorKind::Validation => StatusCode::BAD_REQUEST,
            GenerationErrorKind::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.message,
        }
    }
}
