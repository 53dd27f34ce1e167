use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use taskhive_core::model::{
    generate_storage_filename, validate_attachment, CreateAttachmentInput, FieldErrors,
    FileAttachment,
};
use taskhive_http::ApiError;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AttachmentBody {
    pub file_attachment: CreateAttachmentInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct AttachmentFilters {
    pub user_id: Option<i64>,
}

/// GET /api/v1/file_attachments
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<AttachmentFilters>,
) -> Result<Json<Value>, ApiError> {
    let files = state.store.list_attachments(filters.user_id).await?;
    let total = files.len();
    Ok(Json(json!({
        "success": true,
        "file_attachments": files,
        "total": total,
    })))
}

/// POST /api/v1/file_attachments — metadata only; validation runs against
/// global limits plus the named category's allow-list.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AttachmentBody>,
) -> Result<Response, ApiError> {
    let input = body.file_attachment;

    let category = match input.category_id {
        Some(id) => {
            let Some(category) = state.store.get_category(id).await? else {
                let mut errors = FieldErrors::default();
                errors.add("category", "must exist");
                return Err(ApiError::field_errors(errors));
            };
            Some(category)
        }
        None => None,
    };

    validate_attachment(&input, category.as_ref()).map_err(ApiError::field_errors)?;

    let now = Utc::now();
    let storage_filename = generate_storage_filename(&input.original_filename, now);
    let file_url = input
        .file_url
        .clone()
        .unwrap_or_else(|| format!("/files/{storage_filename}"));

    let file = state
        .store
        .insert_attachment(FileAttachment {
            id: 0,
            original_filename: input.original_filename,
            storage_filename,
            content_type: input.content_type,
            file_size: input.file_size,
            file_url,
            user_id: input.user_id,
            category_id: input.category_id,
            created_at: now,
        })
        .await?;

    tracing::info!(file_id = file.id, "attachment recorded");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "file_attachment": file })),
    )
        .into_response())
}

/// GET /api/v1/file_attachments/{id}
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let file = state
        .store
        .get_attachment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("File attachment not found"))?;
    Ok(Json(json!({ "success": true, "file_attachment": file })))
}

/// DELETE /api/v1/file_attachments/{id}
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_attachment(id).await? {
        return Err(ApiError::not_found("File attachment not found"));
    }
    Ok(Json(json!({ "success": true, "message": "File deleted successfully" })))
}
