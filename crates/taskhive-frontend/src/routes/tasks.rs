use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use taskhive_http::{ApiError, CurrentUser, SessionToken};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TaskBody {
    pub task: Value,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// GET /tasks — pass the filter query through unchanged.
pub async fn index(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let filters: Vec<(&str, &str)> = query
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let body = state.tasks.get_user_tasks(&token, &filters).await?;
    Ok(Json(body))
}

/// POST /tasks — create via the Task Service, then record the event with
/// analytics on a best-effort basis.
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    SessionToken(token): SessionToken,
    Json(body): Json<TaskBody>,
) -> Result<Response, ApiError> {
    let created = state.tasks.create_task(&token, body.task).await?;

    let task_id = created["task"]["id"].as_i64();
    if let Err(e) = state
        .analytics
        .track_event(&token, "task", user.id, task_id, json!({ "action": "created" }))
        .await
    {
        tracing::warn!(error = %e, "failed to track task creation event");
    }

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// PATCH /tasks/{id}/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Value>, ApiError> {
    let updated = state.tasks.update_task_status(&token, id, &body.status).await?;
    Ok(Json(updated))
}

/// PATCH /tasks/{id}/complete
pub async fn complete(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let updated = state.tasks.complete_task(&token, id).await?;
    Ok(Json(updated))
}

/// DELETE /tasks/{id}
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state.tasks.delete_task(&token, id).await?;
    Ok(Json(deleted))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use axum::body::Body;
    use axum::extract::{Query, Request};
    use axum::http::StatusCode;
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use crate::testutil::{
        get_with_bearer, mock_verifier, post_json, send, serve, state_with, SiblingUrls,
    };

    const TOKEN: &str = "valid-token";

    fn mock_task_service() -> Router {
        Router::new()
            .route(
                "/api/v1/tasks",
                get(|Query(q): Query<BTreeMap<String, String>>| async move {
                    Json(json!({ "success": true, "tasks": [], "total": 0, "echo": q }))
                })
                .post(|Json(body): Json<Value>| async move {
                    (
                        StatusCode::CREATED,
                        Json(json!({ "success": true, "task": {
                            "id": 42, "title": body["task"]["title"], "status": "pending"
                        }})),
                    )
                }),
            )
            .route(
                "/api/v1/tasks/{id}/status",
                patch(|Json(body): Json<Value>| async move {
                    if body["status"] == "in_progress" {
                        (
                            StatusCode::OK,
                            Json(json!({ "success": true, "task": { "id": 42, "status": "in_progress" } })),
                        )
                    } else {
                        (
                            StatusCode::UNPROCESSABLE_ENTITY,
                            Json(json!({ "errors": ["Cannot transition from pending to completed"] })),
                        )
                    }
                }),
            )
    }

    fn mock_analytics_sink() -> Router {
        Router::new().route(
            "/api/v1/analytics/events",
            post(|| async {
                (
                    StatusCode::CREATED,
                    Json(json!({ "status": "success", "data": { "event_id": 1 } })),
                )
            }),
        )
    }

    async fn app() -> Router {
        let state = state_with(SiblingUrls {
            user: serve(mock_verifier(TOKEN)).await,
            task: serve(mock_task_service()).await,
            analytics: serve(mock_analytics_sink()).await,
            ..Default::default()
        });
        crate::routes::router(state)
    }

    fn with_bearer(req: Request<Body>) -> Request<Body> {
        let (mut parts, body) = req.into_parts();
        parts.headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {TOKEN}").parse().unwrap(),
        );
        Request::from_parts(parts, body)
    }

    #[tokio::test]
    async fn index_forwards_the_filter_query() {
        let (status, _, body) = send(
            app().await,
            get_with_bearer("/tasks?status=pending&filter=overdue", TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["echo"]["status"], "pending");
        assert_eq!(body["echo"]["filter"], "overdue");
    }

    #[tokio::test]
    async fn create_proxies_and_returns_created() {
        let req = with_bearer(post_json(
            "/tasks",
            json!({ "task": { "title": "Write report" } }),
        ));
        let (status, _, body) = send(app().await, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["task"]["id"], 42);
        assert_eq!(body["task"]["title"], "Write report");
    }

    #[tokio::test]
    async fn status_update_passes_sibling_errors_through() {
        let req = with_bearer(
            Request::builder()
                .method("PATCH")
                .uri("/tasks/42/status")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "status": "completed" }).to_string()))
                .unwrap(),
        );
        let (status, _, body) = send(app().await, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0], "Cannot transition from pending to completed");

        let req = with_bearer(
            Request::builder()
                .method("PATCH")
                .uri("/tasks/42/status")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "status": "in_progress" }).to_string()))
                .unwrap(),
        );
        let (status, _, body) = send(app().await, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"]["status"], "in_progress");
    }

    #[tokio::test]
    async fn task_routes_require_authentication() {
        let (status, _, body) = send(
            app().await,
            Request::builder().uri("/tasks").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }
}
