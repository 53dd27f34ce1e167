use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use taskhive_core::model::{FieldErrors, FileCategory};
use taskhive_core::HiveError;
use taskhive_http::ApiError;

use crate::AppState;

pub const MAX_CATEGORY_NAME_LENGTH: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CategoryBody {
    pub file_category: CreateCategoryInput,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub allowed_file_types: Vec<String>,
    #[serde(default)]
    pub max_file_size: Option<i64>,
}

/// GET /api/v1/file_categories
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let categories = state.store.list_categories().await?;
    Ok(Json(json!({ "success": true, "file_categories": categories })))
}

/// POST /api/v1/file_categories
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CategoryBody>,
) -> Result<Response, ApiError> {
    let input = body.file_category;

    let mut errors = FieldErrors::default();
    let name = input.name.trim();
    if name.is_empty() {
        errors.add("name", "can't be blank");
    } else if name.len() > MAX_CATEGORY_NAME_LENGTH {
        errors.add(
            "name",
            format!("is too long (maximum is {MAX_CATEGORY_NAME_LENGTH} characters)"),
        );
    }
    if input.max_file_size.is_some_and(|max| max <= 0) {
        errors.add("max_file_size", "must be greater than 0");
    }
    if !errors.is_empty() {
        return Err(ApiError::field_errors(errors));
    }

    let category = state
        .store
        .insert_category(FileCategory {
            id: 0,
            name: name.to_string(),
            description: input.description.trim().to_string(),
            allowed_file_types: input.allowed_file_types,
            max_file_size: input.max_file_size,
            created_at: Utc::now(),
        })
        .await
        .map_err(|e| match e {
            HiveError::InvalidInput(msg) => {
                let mut errors = FieldErrors::default();
                errors.add("name", msg);
                ApiError::field_errors(errors)
            }
            other => other.into(),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "file_category": category })),
    )
        .into_response())
}

/// GET /api/v1/file_categories/{id}
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let category = state
        .store
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("File category not found"))?;
    Ok(Json(json!({ "success": true, "file_category": category })))
}

/// DELETE /api/v1/file_categories/{id} — attachments in the category are
/// detached, not deleted.
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_category(id).await? {
        return Err(ApiError::not_found("File category not found"));
    }
    Ok(Json(json!({ "success": true, "message": "Category deleted successfully" })))
}
