pub mod events;
pub mod health;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use taskhive_http::require_auth;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let authed = Router::new()
        .route("/api/v1/analytics/events", post(events::track))
        .route("/api/v1/analytics/dashboard", get(events::dashboard))
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
