use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use taskhive_core::model::{
    validate_task_fields, CreateTaskInput, Task, TaskPriority, TaskStatistics, TaskStatus,
    UpdateTaskInput,
};
use taskhive_core::HiveError;
use taskhive_http::{ApiError, CurrentUser};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TaskBody<T> {
    pub task: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskFilters {
    pub status: Option<String>,
    pub priority: Option<String>,
    /// Date-window filter: `overdue` or `due_soon`.
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: Option<String>,
}

/// GET /api/v1/tasks
pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filters): Query<TaskFilters>,
) -> Result<Json<Value>, ApiError> {
    let status = parse_filter::<TaskStatus>(filters.status.as_deref())?;
    let priority = parse_filter::<TaskPriority>(filters.priority.as_deref())?;

    let mut tasks = state.store.list_tasks(user.id, status, priority).await?;

    let today = Utc::now().date_naive();
    match filters.filter.as_deref() {
        Some("overdue") => tasks.retain(|t| t.is_overdue(today) && !t.is_completed()),
        Some("due_soon") => tasks.retain(|t| t.is_due_soon(today)),
        Some(other) => {
            return Err(ApiError::bad_request(format!("Unknown filter: {other}")));
        }
        None => {}
    }

    let total = tasks.len();
    Ok(Json(json!({ "success": true, "tasks": tasks, "total": total })))
}

/// POST /api/v1/tasks
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<TaskBody<CreateTaskInput>>,
) -> Result<Response, ApiError> {
    validate_task_fields(&body.task.title, &body.task.description)
        .map_err(validation_list)?;

    let task = state.store.insert_task(Task::new(user.id, body.task)).await?;
    tracing::info!(task_id = task.id, user_id = user.id, "task created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "task": task })),
    )
        .into_response())
}

/// GET /api/v1/tasks/{id}
pub async fn show(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let task = find_task(&state, id, user.id).await?;
    Ok(Json(json!({ "success": true, "task": task })))
}

/// PUT /api/v1/tasks/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<TaskBody<UpdateTaskInput>>,
) -> Result<Json<Value>, ApiError> {
    let mut task = find_task(&state, id, user.id).await?;
    task.apply_update(&body.task).map_err(validation_list)?;

    if !state.store.update_task(task.clone()).await? {
        return Err(ApiError::not_found("Task not found"));
    }
    Ok(Json(json!({ "success": true, "task": task })))
}

/// DELETE /api/v1/tasks/{id}
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_task(id, user.id).await? {
        return Err(ApiError::not_found("Task not found"));
    }
    Ok(Json(json!({ "success": true, "message": "Task deleted successfully" })))
}

/// PATCH /api/v1/tasks/{id}/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Value>, ApiError> {
    let raw = body
        .status
        .ok_or_else(|| ApiError::bad_request("Status parameter is required"))?;
    let next = TaskStatus::from_str(&raw).map_err(|e| ApiError::validation(vec![e]))?;

    transition(&state, id, user.id, next).await
}

/// PATCH /api/v1/tasks/{id}/complete
pub async fn complete(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    transition(&state, id, user.id, TaskStatus::Completed).await
}

/// GET /api/v1/tasks/statistics
pub async fn statistics(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let tasks = state.store.list_tasks(user.id, None, None).await?;
    let stats = TaskStatistics::for_tasks(&tasks, Utc::now().date_naive());
    Ok(Json(json!({ "success": true, "statistics": stats })))
}

// ── helpers ────────────────────────────────────────────────────────────

async fn find_task(state: &AppState, id: i64, user_id: i64) -> Result<Task, ApiError> {
    state
        .store
        .get_task(id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

/// Validate the edge against the loaded status, then persist with a
/// compare-and-swap on that same status. A lost race is a conflict, not a
/// silently re-ordered write.
async fn transition(
    state: &AppState,
    id: i64,
    user_id: i64,
    next: TaskStatus,
) -> Result<Json<Value>, ApiError> {
    let mut task = find_task(state, id, user_id).await?;
    let expected = task.status;
    task.transition_to(next).map_err(HiveError::from)?;

    if !state.store.update_status_cas(task.clone(), expected).await? {
        return Err(ApiError::conflict("Task was modified by another request"));
    }

    tracing::info!(task_id = id, from = %expected, to = %next, "status transition");
    Ok(Json(json!({ "success": true, "task": task })))
}

fn parse_filter<T: FromStr<Err = String>>(raw: Option<&str>) -> Result<Option<T>, ApiError> {
    raw.map(|s| s.parse::<T>().map_err(ApiError::bad_request))
        .transpose()
}

fn validation_list(e: HiveError) -> ApiError {
    match e {
        HiveError::InvalidInput(msg) => ApiError::validation(vec![msg]),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use taskhive_core::client::{RetryDelay, ServiceClient, UserServiceClient};
    use taskhive_core::model::CreateTaskInput;

    use crate::storage::TaskStore;

    const TOKEN: &str = "valid-token";

    /// Stand-in User Service: one fixed token maps to user 7.
    async fn spawn_verifier() -> String {
        let router = Router::new().route(
            "/api/v1/auth/verify",
            get(|headers: axum::http::HeaderMap| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v == format!("Bearer {TOKEN}"));
                if authorized {
                    (
                        StatusCode::OK,
                        Json(json!({
                            "success": true,
                            "user": { "id": 7, "email": "a@example.com", "name": "Alice" }
                        })),
                    )
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "success": false, "error": "Invalid session token" })),
                    )
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fast_verifier(base: String) -> Arc<UserServiceClient> {
        Arc::new(UserServiceClient::new(base).with_client(
            ServiceClient::new()
                .with_timeout(Duration::from_millis(500))
                .with_retries(1, RetryDelay::Fixed(Duration::from_millis(10))),
        ))
    }

    async fn test_state() -> Arc<AppState> {
        let base = spawn_verifier().await;
        Arc::new(AppState {
            store: TaskStore::open_in_memory().unwrap(),
            verifier: fast_verifier(base),
        })
    }

    fn app(state: &Arc<AppState>) -> Router {
        crate::routes::router(Arc::clone(state))
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TOKEN}"));
        match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn seed_task(state: &Arc<AppState>, title: &str) -> Task {
        state
            .store
            .insert_task(Task::new(
                7,
                CreateTaskInput {
                    title: title.to_string(),
                    ..Default::default()
                },
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_and_list_tasks() {
        let state = test_state().await;

        let (status, body) = send(
            app(&state),
            request(
                "POST",
                "/api/v1/tasks",
                Some(json!({ "task": { "title": "Write report", "priority": "high" } })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["task"]["status"], "pending");
        assert_eq!(body["task"]["priority"], "high");

        let (status, body) = send(app(&state), request("GET", "/api/v1/tasks", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["tasks"][0]["title"], "Write report");
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let state = test_state().await;
        let (status, body) = send(
            app(&state),
            request(
                "POST",
                "/api/v1/tasks",
                Some(json!({ "task": { "title": "   " } })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0], "Title can't be blank");
    }

    #[tokio::test]
    async fn another_users_task_reads_as_missing() {
        let state = test_state().await;
        let foreign = state
            .store
            .insert_task(Task::new(
                8,
                CreateTaskInput {
                    title: "Not yours".to_string(),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let (status, body) = send(
            app(&state),
            request("GET", &format!("/api/v1/tasks/{}", foreign.id), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Task not found");
    }

    #[tokio::test]
    async fn legal_transition_stamps_completed_at() {
        let state = test_state().await;
        let task = seed_task(&state, "Finish me").await;

        let (status, _) = send(
            app(&state),
            request(
                "PATCH",
                &format!("/api/v1/tasks/{}/status", task.id),
                Some(json!({ "status": "in_progress" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app(&state),
            request(
                "PATCH",
                &format!("/api/v1/tasks/{}/complete", task.id),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"]["status"], "completed");
        assert!(!body["task"]["completed_at"].is_null());
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected_with_edge_message() {
        let state = test_state().await;
        let task = seed_task(&state, "Too eager").await;

        let (status, body) = send(
            app(&state),
            request(
                "PATCH",
                &format!("/api/v1/tasks/{}/status", task.id),
                Some(json!({ "status": "completed" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"][0],
            "Cannot transition from pending to completed"
        );

        // Nothing was persisted.
        let current = state.store.get_task(task.id, 7).await.unwrap().unwrap();
        assert_eq!(current.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn missing_status_param_is_bad_request() {
        let state = test_state().await;
        let task = seed_task(&state, "No status").await;

        let (status, body) = send(
            app(&state),
            request(
                "PATCH",
                &format!("/api/v1/tasks/{}/status", task.id),
                Some(json!({})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Status parameter is required");
    }

    #[tokio::test]
    async fn update_edits_fields_and_checks_transitions() {
        let state = test_state().await;
        let task = seed_task(&state, "Old title").await;

        let (status, body) = send(
            app(&state),
            request(
                "PUT",
                &format!("/api/v1/tasks/{}", task.id),
                Some(json!({ "task": { "title": "New title", "status": "in_progress" } })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"]["title"], "New title");
        assert_eq!(body["task"]["status"], "in_progress");

        let (status, body) = send(
            app(&state),
            request(
                "PUT",
                &format!("/api/v1/tasks/{}", task.id),
                Some(json!({ "task": { "status": "in_progress" } })),
            ),
        )
        .await;
        // Same-status update is not a transition.
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"]["status"], "in_progress");
    }

    #[tokio::test]
    async fn overdue_filter_excludes_completed() {
        let state = test_state().await;
        let today = Utc::now().date_naive();

        let mut overdue = Task::new(
            7,
            CreateTaskInput {
                title: "Late".to_string(),
                ..Default::default()
            },
        );
        overdue.due_date = Some(today - chrono::Duration::days(2));
        state.store.insert_task(overdue).await.unwrap();

        let mut done = Task::new(
            7,
            CreateTaskInput {
                title: "Late but done".to_string(),
                ..Default::default()
            },
        );
        done.due_date = Some(today - chrono::Duration::days(2));
        done.set_status_unchecked(TaskStatus::Completed);
        state.store.insert_task(done).await.unwrap();

        let (status, body) = send(
            app(&state),
            request("GET", "/api/v1/tasks?filter=overdue", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["tasks"][0]["title"], "Late");
    }

    #[tokio::test]
    async fn status_filter_narrows_list() {
        let state = test_state().await;
        seed_task(&state, "Pending one").await;
        let moving = seed_task(&state, "Moving one").await;
        send(
            app(&state),
            request(
                "PATCH",
                &format!("/api/v1/tasks/{}/status", moving.id),
                Some(json!({ "status": "in_progress" })),
            ),
        )
        .await;

        let (_, body) = send(
            app(&state),
            request("GET", "/api/v1/tasks?status=in_progress", None),
        )
        .await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["tasks"][0]["title"], "Moving one");

        let (status, _) = send(
            app(&state),
            request("GET", "/api/v1/tasks?status=bogus", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn statistics_reflect_the_users_tasks() {
        let state = test_state().await;
        seed_task(&state, "One").await;
        let two = seed_task(&state, "Two").await;
        send(
            app(&state),
            request(
                "PATCH",
                &format!("/api/v1/tasks/{}/status", two.id),
                Some(json!({ "status": "in_progress" })),
            ),
        )
        .await;
        send(
            app(&state),
            request("PATCH", &format!("/api/v1/tasks/{}/complete", two.id), None),
        )
        .await;

        let (status, body) = send(
            app(&state),
            request("GET", "/api/v1/tasks/statistics", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let stats = &body["statistics"];
        assert_eq!(stats["total_tasks"], 2);
        assert_eq!(stats["completed_tasks"], 1);
        assert_eq!(stats["completion_rate"], 50.0);
    }

    #[tokio::test]
    async fn delete_removes_the_task() {
        let state = test_state().await;
        let task = seed_task(&state, "Doomed").await;

        let (status, body) = send(
            app(&state),
            request("DELETE", &format!("/api/v1/tasks/{}", task.id), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Task deleted successfully");
        assert!(state.store.get_task(task.id, 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn requests_without_token_are_unauthorized() {
        let state = test_state().await;
        let req = Request::builder()
            .uri("/api/v1/tasks")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(&state), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }

    #[tokio::test]
    async fn bad_token_is_unauthorized() {
        let state = test_state().await;
        let req = Request::builder()
            .uri("/api/v1/tasks")
            .header("authorization", "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(&state), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid session token");
    }

    #[tokio::test]
    async fn unreachable_user_service_is_service_unavailable() {
        // Bind then drop so nothing answers on the port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let state = Arc::new(AppState {
            store: TaskStore::open_in_memory().unwrap(),
            verifier: fast_verifier(format!("http://{addr}")),
        });

        let (status, body) = send(app(&state), request("GET", "/api/v1/tasks", None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "User service unavailable");
    }
}
