// Client script and health endpoints

use crate::server::AppState;
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

/// GET /visits.js - The tracking script pages embed
pub async fn client_script(State(state): State<AppState>) -> impl IntoResponse {
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/javascript; charset=utf-8"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=300")),
        ],
        state.script.to_string(),
    )
}

#[derive(Debug, Serialize)]
pub struct StorageStatus {
    pub enabled: bool,
    pub binding: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: StorageStatus,
}

/// GET /health - Liveness plus storage status
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::VERSION,
        storage: StorageStatus {
            enabled: state.store.is_some(),
            binding: state.binding.to_string(),
        },
    })
}
