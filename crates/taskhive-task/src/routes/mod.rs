pub mod health;
pub mod tasks;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch};
use axum::Router;

use taskhive_http::require_auth;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let authed = Router::new()
        .route("/api/v1/tasks", get(tasks::index).post(tasks::create))
        .route("/api/v1/tasks/statistics", get(tasks::statistics))
        .route(
            "/api/v1/tasks/{id}",
            get(tasks::show).put(tasks::update).delete(tasks::destroy),
        )
        .route("/api/v1/tasks/{id}/status", patch(tasks::update_status))
        .route("/api/v1/tasks/{id}/complete", patch(tasks::complete))
        .layer(from_fn_with_state(
            Arc::clone(&state.verifier),
            require_auth,
        ));

    Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/up", get(health::health))
        .merge(authed)
        .with_state(state)
}
