// HTTP API module - visit collection, deletion and analytics endpoints
//
// All endpoints speak JSON except /visits.js. SQLite work runs on the
// blocking pool.

mod delete;
mod script;
mod visit;
mod visits;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

// Re-export endpoint handlers
pub use delete::{delete_visit_by_path, delete_visits};
pub use script::{client_script, health};
pub use visit::record_visit;
pub use visits::{
    aggregate, browser_stats, device_stats, list_visits, os_stats, recent_stats,
    referrer_stats, stats, timezone_stats, top_pages, trend_stats,
};

/// Upper bound on any `limit` query parameter
pub(crate) const MAX_LIMIT: u32 = 1000;

/// API error responses
/// Converted to HTTP status codes via IntoResponse
#[derive(Debug)]
pub enum ApiError {
    Internal(String),
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        if status.is_server_error() {
            tracing::error!("API error: {} - {}", status, message);
        } else {
            tracing::debug!("API error: {} - {}", status, message);
        }

        (
            status,
            Json(json!({
                "success": false,
                "message": message,
            })),
        )
            .into_response()
    }
}

/// Run a SQLite call on the blocking pool, mapping failures to 500
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Worker task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("Database error: {}", e)))
}
