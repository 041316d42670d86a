// Deletion endpoints - DELETE /api/visits and DELETE /api/visits/:id

use super::{blocking, ApiError};
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

/// An id as sent by clients: a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VisitId {
    Number(i64),
    Text(String),
}

impl VisitId {
    fn parse(&self) -> Result<i64, ApiError> {
        match self {
            VisitId::Number(n) => Ok(*n),
            VisitId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("Invalid visit id: {:?}", s))),
        }
    }
}

/// Body for DELETE /api/visits: `{id}` or `{ids: [...]}`
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub id: Option<VisitId>,
    #[serde(default)]
    pub ids: Option<Vec<VisitId>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<usize>,
    pub message: String,
}

async fn delete_one(state: &AppState, id: i64) -> Result<Json<DeleteResponse>, ApiError> {
    let store = state.store()?.clone();
    let deleted = blocking(move || store.delete_visit(id)).await?;

    if !deleted {
        return Err(ApiError::NotFound(format!("Visit {} not found", id)));
    }

    tracing::info!(id, "Visit deleted");
    Ok(Json(DeleteResponse {
        success: true,
        deleted_count: None,
        message: "Visit deleted".to_string(),
    }))
}

/// DELETE /api/visits - Delete one visit or a batch
///
/// Body: `{"id": 1}` or `{"ids": [1, "2", 3]}`; `id` wins when both are present.
/// Responses:
///   - 200 on success (`deletedCount` for batches)
///   - 400 when neither field is usable or an id is not numeric
///   - 404 when nothing was deleted
pub async fn delete_visits(
    State(state): State<AppState>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Json(request) = body
        .map_err(|e| ApiError::BadRequest(format!("Invalid request data: {}", e.body_text())))?;

    if let Some(id) = &request.id {
        return delete_one(&state, id.parse()?).await;
    }

    let ids = match request.ids {
        Some(ids) if !ids.is_empty() => ids
            .iter()
            .map(VisitId::parse)
            .collect::<Result<Vec<i64>, _>>()?,
        _ => {
            return Err(ApiError::BadRequest(
                "Invalid request parameters: expected id or ids".to_string(),
            ))
        }
    };

    let store = state.store()?.clone();
    let deleted_count = blocking(move || store.delete_visits(&ids)).await?;

    if deleted_count == 0 {
        return Err(ApiError::NotFound("No matching visits found".to_string()));
    }

    tracing::info!(deleted_count, "Visits deleted");
    Ok(Json(DeleteResponse {
        success: true,
        deleted_count: Some(deleted_count),
        message: format!("Deleted {} visits", deleted_count),
    }))
}

/// DELETE /api/visits/:id - Delete one visit by path
pub async fn delete_visit_by_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = VisitId::Text(id).parse()?;
    delete_one(&state, id).await
}
