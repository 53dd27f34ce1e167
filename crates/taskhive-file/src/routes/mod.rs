pub mod attachments;
pub mod categories;
pub mod health;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/file_attachments",
            get(attachments::index).post(attachments::create),
        )
        .route(
            "/api/v1/file_attachments/{id}",
            get(attachments::show).delete(attachments::destroy),
        )
        .route(
            "/api/v1/file_categories",
            get(categories::index).post(categories::create),
        )
        .route(
            "/api/v1/file_categories/{id}",
            get(categories::show).delete(categories::destroy),
        )
        .route("/api/v1/health", get(health::health))
        .route("/up", get(health::health))
}
