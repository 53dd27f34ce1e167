use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use taskhive_core::client::{
    AnalyticsServiceClient, FileServiceClient, RetryDelay, ServiceClient, TaskServiceClient,
    UserServiceClient,
};

use crate::AppState;

/// Resilient client tuned for tests: one quick retry, short timeout.
pub fn fast() -> ServiceClient {
    ServiceClient::new()
        .with_timeout(Duration::from_millis(500))
        .with_retries(1, RetryDelay::Fixed(Duration::from_millis(10)))
}

/// Spawn a mock sibling on an ephemeral port, returning its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on (reserved port 9, discard protocol).
pub fn dead_base() -> String {
    "http://127.0.0.1:9".to_string()
}

pub struct SiblingUrls {
    pub user: String,
    pub task: String,
    pub analytics: String,
    pub file: String,
}

impl Default for SiblingUrls {
    fn default() -> Self {
        Self {
            user: dead_base(),
            task: dead_base(),
            analytics: dead_base(),
            file: dead_base(),
        }
    }
}

pub fn state_with(urls: SiblingUrls) -> Arc<AppState> {
    Arc::new(AppState {
        users: Arc::new(UserServiceClient::new(urls.user).with_client(fast())),
        tasks: TaskServiceClient::new(urls.task).with_client(fast()),
        analytics: AnalyticsServiceClient::new(urls.analytics).with_client(fast()),
        files: FileServiceClient::new(urls.file).with_client(fast()),
        production: false,
    })
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Mock User Service that verifies exactly one token as user 7.
pub fn mock_verifier(token: &'static str) -> Router {
    use axum::routing::get;
    use serde_json::json;

    Router::new().route(
        "/api/v1/auth/verify",
        get(move |headers: HeaderMap| async move {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == format!("Bearer {token}"));
            if authorized {
                (
                    StatusCode::OK,
                    axum::Json(json!({
                        "success": true,
                        "user": { "id": 7, "email": "a@example.com", "name": "Alice" }
                    })),
                )
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    axum::Json(json!({ "success": false, "error": "Invalid session token" })),
                )
            }
        }),
    )
}
