//! HTTP surface: JSON API, health check and the web UI page.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::{ApiError, ErrorKind};
use crate::perplexity::PerplexityApi;
use crate::schema::{
    ChatQuery, ChatQueryInput, ChatResponse, SearchQuery, SearchQueryInput, SearchResponse,
};
use crate::ui::INDEX_HTML;

#[derive(Clone)]
pub struct AppState {
    api: Arc<dyn PerplexityApi>,
}

impl AppState {
    pub fn new(api: Arc<dyn PerplexityApi>) -> Self {
        Self { api }
    }
}

/// Builds the application router around any upstream client.
pub fn router(api: Arc<dyn PerplexityApi>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/search", post(search))
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(api))
}

/// Status code returned to callers for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::TransientNetwork => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Unauthorized | ErrorKind::UpstreamServerError => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind());
        let body = Json(json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[tracing::instrument(skip(state, payload))]
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatQueryInput>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(input) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let query = ChatQuery::try_from(input)?;

    info!(
        "POST /api/chat model={} messages={}",
        query.model(),
        query.messages().len()
    );
    let response = state.api.chat(&query).await.inspect_err(|e| {
        warn!("Chat failed ({}): {}", e.kind(), e);
    })?;

    Ok(Json(response))
}

#[tracing::instrument(skip(state, payload))]
async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchQueryInput>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(input) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let query = SearchQuery::try_from(input)?;

    info!(
        "POST /api/search max_results={} query={:?}",
        query.max_results(),
        query.query()
    );
    let response = state.api.search(&query).await.inspect_err(|e| {
        warn!("Search failed ({}): {}", e.kind(), e);
    })?;

    Ok(Json(response))
}
