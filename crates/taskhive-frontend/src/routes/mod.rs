pub mod auth;
pub mod dashboard;
pub mod health;
pub mod tasks;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, patch, post};
use axum::Router;

use taskhive_http::require_auth;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let authed = Router::new()
        .route("/dashboard", get(dashboard::show))
        .route("/tasks", get(tasks::index).post(tasks::create))
        .route("/tasks/{id}", delete(tasks::destroy))
        .route("/tasks/{id}/status", patch(tasks::update_status))
        .route("/tasks/{id}/complete", patch(tasks::complete))
        .layer(from_fn_with_state(Arc::clone(&state.users), require_auth));

    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/api/v1/health", get(health::health))
        .route("/up", get(health::health))
        .merge(authed)
        .with_state(state)
}
