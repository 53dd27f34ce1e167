use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use taskhive_core::client::ClientResult;
use taskhive_http::{CurrentUser, SessionToken};

use crate::AppState;

/// GET /dashboard — one aggregated view over the sibling services. A
/// sibling failure degrades its section to an empty default instead of
/// failing the whole page.
pub async fn show(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    SessionToken(token): SessionToken,
) -> Json<Value> {
    let (tasks, statistics, analytics, files) = tokio::join!(
        state.tasks.get_user_tasks(&token, &[]),
        state.tasks.get_task_statistics(&token),
        state.analytics.get_dashboard_summary(&token),
        state.files.get_user_files(user.id),
    );

    Json(json!({
        "success": true,
        "user": { "id": user.id, "name": user.name, "email": user.email },
        "tasks": section(tasks, "tasks", json!([])),
        "statistics": section(statistics, "statistics", json!({})),
        "analytics": section(analytics, "data", json!({})),
        "files": section(files, "file_attachments", json!([])),
    }))
}

/// Pull one key out of a sibling response, falling back to `default` when
/// the call failed or the key is absent.
fn section(result: ClientResult, key: &str, default: Value) -> Value {
    match result {
        Ok(mut body) => body.get_mut(key).map(Value::take).unwrap_or(default),
        Err(e) => {
            tracing::warn!(section = key, error = %e, "dashboard section degraded");
            default
        }
    }
}
