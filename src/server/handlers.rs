use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{info, warn};

use super::models::{
    ErrorResponse, ImageRequest, ImageResponse, ServerError, TitlesRequest, TitlesResponse,
    text_field,
};
use super::state::ServerState;
use crate::generation::LocalGeneration;
use crate::settings;

pub async fn run_server(settings: settings::Settings, addr: String) -> Result<()> {
    let state = ServerState::new(Arc::new(LocalGeneration::from_settings(&settings)));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate-titles", post(generate_titles))
        .route("/generate-image", post(generate_image))
        .with_state(Arc::new(state))
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn generate_titles(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<TitlesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request: TitlesRequest = serde_json::from_slice(&body).map_err(|err| {
        ServerError::internal(format!("Failed to generate titles: {}", err)).into_response()
    })?;
    let topic = text_field(&request.topic);
    let api_key = text_field(&request.api_key);
    match state.generation.generate_titles(topic, api_key).await {
        Ok(titles) => {
            info!("generated {} titles", titles.len());
            Ok(Json(TitlesResponse { titles }))
        }
        Err(err) => {
            warn!("title generation failed: {}", err);
            Err(ServerError::from(err).into_response())
        }
    }
}

async fn generate_image(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<ImageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request: ImageRequest = serde_json::from_slice(&body).map_err(|err| {
        ServerError::internal(format!("Failed to generate image: {}", err)).into_response()
    })?;
    let prompt = text_field(&request.prompt);
    let api_key = text_field(&request.api_key);
    match state.generation.generate_image(prompt, api_key).await {
        Ok(image_url) => {
            info!("generated image ({} bytes as data URI)", image_url.len());
            Ok(Json(ImageResponse { image_url }))
        }
        Err(err) => {
            warn!("image generation failed: {}", err);
            Err(ServerError::from(err).into_response())
        }
    }
}
