use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use taskhive_core::model::{AnalyticsEvent, CreateEventInput};
use taskhive_core::HiveError;
use taskhive_http::{ApiError, CurrentUser};

use crate::AppState;

/// Source attributed to events that don't name one.
const DEFAULT_SOURCE: &str = "frontend-service";

#[derive(Debug, Deserialize)]
pub struct EventBody {
    pub event: CreateEventInput,
}

/// POST /api/v1/analytics/events
pub async fn track(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<EventBody>,
) -> Result<Response, ApiError> {
    let mut input = body.event;
    if input.user_id.is_none() {
        input.user_id = Some(user.id);
    }
    let source = input
        .source_service
        .clone()
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

    let event = AnalyticsEvent::from_input(input, &source).map_err(|e| match e {
        HiveError::InvalidInput(msg) => ApiError::validation(vec![msg]),
        other => other.into(),
    })?;

    let event = state.store.insert_event(event).await?;
    tracing::debug!(event_id = event.id, event_type = %event.event_type, "event tracked");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": { "event_id": event.id } })),
    )
        .into_response())
}

/// GET /api/v1/analytics/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let summary = state.store.dashboard_summary(Utc::now()).await?;
    Ok(Json(json!({ "status": "success", "data": summary })))
}
