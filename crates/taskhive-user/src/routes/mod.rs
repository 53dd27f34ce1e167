pub mod auth;
pub mod health;
pub mod users;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/verify", get(auth::verify))
        .route("/api/v1/users/{id}", get(users::show))
        .route("/api/v1/health", get(health::health))
        .route("/up", get(health::health))
}
