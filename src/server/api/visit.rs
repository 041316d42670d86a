// Visit collection endpoint - POST /api/visit

use super::{blocking, ApiError};
use crate::script::should_ignore_path;
use crate::server::AppState;
use crate::storage::NewVisit;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// IP used when no proxy header is present
const UNKNOWN_IP: &str = "unknown";

/// Visit payload as sent by the client script
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPayload {
    /// Client RFC 3339 time; server time when absent or unparseable
    #[serde(default)]
    pub timestamp: Option<String>,
    pub url: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub cookies: String,
    #[serde(default)]
    pub screen_width: i64,
    #[serde(default)]
    pub screen_height: i64,
    #[serde(default)]
    pub color_depth: i64,
    #[serde(default)]
    pub timezone: String,
}

impl VisitPayload {
    fn into_visit(self, ip: String) -> NewVisit {
        let timestamp = match self.timestamp {
            Some(t) if DateTime::parse_from_rfc3339(&t).is_ok() => t,
            Some(t) if !t.is_empty() => {
                tracing::debug!("Replacing unparseable client timestamp {:?}", t);
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
            }
            _ => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        NewVisit {
            timestamp,
            url: self.url,
            referrer: self.referrer,
            user_agent: self.user_agent,
            language: self.language,
            cookies: self.cookies,
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            color_depth: self.color_depth,
            timezone: self.timezone,
            ip,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VisitResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Client IP: `cf-connecting-ip`, then `x-forwarded-for` (verbatim), else "unknown"
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    ["cf-connecting-ip", "x-forwarded-for"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

/// Path component of an absolute or relative URL
pub(crate) fn url_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => {
            let after_scheme = &url[idx + 3..];
            match after_scheme.find('/') {
                Some(slash) => &after_scheme[slash..],
                None => "/",
            }
        }
        None => url,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

/// POST /api/visit - Record one page view
///
/// Body: the camelCase visit payload. `url` is required.
/// Responses:
///   - 200 `{success: true, message}` (stored, dev mode, or ignored path)
///   - 400 malformed JSON or missing url
///   - 500 storage failure
pub async fn record_visit(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<VisitPayload>, JsonRejection>,
) -> Result<Json<VisitResponse>, ApiError> {
    let Json(payload) = payload
        .map_err(|e| ApiError::BadRequest(format!("Invalid request data: {}", e.body_text())))?;

    if payload.url.is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid request data: url is required".to_string(),
        ));
    }

    let path = url_path(&payload.url);
    if should_ignore_path(path, &state.tracking.ignore_paths) {
        tracing::debug!("Ignoring visit to {}", path);
        return Ok(Json(VisitResponse {
            success: true,
            message: "Path ignored",
        }));
    }

    let visit = payload.into_visit(client_ip(&headers));

    let Some(store) = state.store.clone() else {
        tracing::info!(
            url = %visit.url,
            ip = %visit.ip,
            timestamp = %visit.timestamp,
            "Visit recorded (dev mode)"
        );
        return Ok(Json(VisitResponse {
            success: true,
            message: "Visit recorded (dev mode)",
        }));
    };

    let url = visit.url.clone();
    let ip = visit.ip.clone();
    let id = blocking(move || store.insert_visit(&visit))
        .await
        .map_err(|e| {
            tracing::error!(url = %url, ip = %ip, "Failed to store visit");
            e
        })?;

    tracing::info!(id, url = %url, ip = %ip, "Visit recorded");

    Ok(Json(VisitResponse {
        success: true,
        message: "Visit recorded",
    }))
}
