use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use taskhive_core::model::UserProfile;
use taskhive_http::ApiError;

use crate::AppState;

/// GET /api/v1/users/{id} — internal lookup used by sibling services.
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({ "success": true, "user": UserProfile::from(&user) })))
}
