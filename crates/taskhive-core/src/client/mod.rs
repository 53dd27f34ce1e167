mod analytics;
mod file;
mod task;
mod user;

pub use analytics::AnalyticsServiceClient;
pub use file::FileServiceClient;
pub use task::TaskServiceClient;
pub use user::UserServiceClient;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Delay schedule between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDelay {
    /// Same wait before every retry.
    Fixed(Duration),
    /// Wait grows linearly with the attempt number (base, 2×base, 3×base).
    Linear(Duration),
}

impl RetryDelay {
    pub fn for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(base) => *base,
            Self::Linear(base) => *base * attempt,
        }
    }
}

/// How a failed call should be reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection refused or timed out on every attempt.
    ConnectionFailed,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Unprocessable,
    Server,
    Unknown,
    /// Request could not be issued at all (bad URL, body serialization).
    Unexpected,
}

/// Normalized failure from a sibling-service call. Callers never see a
/// transport exception; they match on `kind` and surface `message`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    /// Human-readable message, safe to show to an end user.
    pub message: String,
    /// Raw underlying error string, for logs.
    pub detail: Option<String>,
    /// Parsed error body from the sibling service, when one was received.
    pub body: Option<Value>,
}

impl ClientError {
    fn from_status(kind: ErrorKind, message: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            body,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == ErrorKind::ConnectionFailed
    }

    /// The `errors` list from a 422 body, when the sibling sent one.
    pub fn error_list(&self) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get("errors"))
    }
}

pub type ClientResult = Result<Value, ClientError>;

/// Per-request options merged over the client defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn bearer(token: &str) -> Self {
        Self {
            headers: vec![("Authorization".to_string(), format!("Bearer {token}"))],
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// Outbound HTTP wrapper shared by every inter-service call: fixed
/// timeout, bounded retry on connection-level failures, and uniform
/// classification of whatever response comes back.
///
/// Only connect/timeout errors are retried. Any received HTTP response,
/// including error codes, is classified exactly once and returned.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    timeout: Duration,
    retries: u32,
    retry_delay: RetryDelay,
}

impl Default for ServiceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_delay: RetryDelay::Fixed(DEFAULT_RETRY_DELAY),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32, delay: RetryDelay) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> ClientResult {
        self.request(Method::GET, url, options).await
    }

    pub async fn post(&self, url: &str, options: RequestOptions) -> ClientResult {
        self.request(Method::POST, url, options).await
    }

    pub async fn put(&self, url: &str, options: RequestOptions) -> ClientResult {
        self.request(Method::PUT, url, options).await
    }

    pub async fn patch(&self, url: &str, options: RequestOptions) -> ClientResult {
        self.request(Method::PATCH, url, options).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> ClientResult {
        self.request(Method::DELETE, url, options).await
    }

    /// Issue a request with bounded retry and normalize the outcome.
    pub async fn request(&self, method: Method, url: &str, options: RequestOptions) -> ClientResult {
        // Defaults first; caller headers replace them rather than stack.
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &options.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping malformed request header"),
            }
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let mut req = self
                .http
                .request(method.clone(), url)
                .timeout(options.timeout.unwrap_or(self.timeout))
                .headers(headers.clone());
            if !options.query.is_empty() {
                req = req.query(&options.query);
            }
            if let Some(ref body) = options.body {
                req = req.json(body);
            }

            match req.send().await {
                Ok(response) => return Self::classify(response).await,
                Err(e) if is_connection_error(&e) && attempt <= self.retries => {
                    let delay = self.retry_delay.for_attempt(attempt);
                    tracing::warn!(
                        attempt,
                        url,
                        error = %e,
                        "request failed, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if is_connection_error(&e) => {
                    tracing::error!(retries = self.retries, url, error = %e, "request failed after all retries");
                    return Err(ClientError {
                        kind: ErrorKind::ConnectionFailed,
                        message: "Service connection failed. Please try again later.".to_string(),
                        detail: Some(e.to_string()),
                        body: None,
                    });
                }
                Err(e) => {
                    tracing::error!(url, error = %e, "unexpected error in service request");
                    return Err(ClientError {
                        kind: ErrorKind::Unexpected,
                        message: "An error occurred while processing the service request."
                            .to_string(),
                        detail: Some(e.to_string()),
                        body: None,
                    });
                }
            }
        }
    }

    /// Map a received response to the uniform result shape. Runs once per
    /// call; received error codes are never retried.
    async fn classify(response: reqwest::Response) -> ClientResult {
        let status = response.status().as_u16();
        let bytes = response.bytes().await.unwrap_or_default();
        let parsed: Option<Value> = serde_json::from_slice(&bytes).ok();

        if (200..300).contains(&status) {
            // An empty or non-JSON 2xx body still counts as success.
            return Ok(parsed.unwrap_or_else(|| serde_json::json!({ "success": true })));
        }

        let body_message = parsed
            .as_ref()
            .and_then(|v| v.get("message").or_else(|| v.get("error")))
            .and_then(Value::as_str)
            .map(str::to_string);

        Err(match status {
            400 => ClientError::from_status(
                ErrorKind::BadRequest,
                body_message.unwrap_or_else(|| "Invalid request.".to_string()),
                parsed,
            ),
            401 => ClientError::from_status(
                ErrorKind::Unauthorized,
                body_message.unwrap_or_else(|| "Authentication required.".to_string()),
                parsed,
            ),
            403 => ClientError::from_status(ErrorKind::Forbidden, "Access denied.", parsed),
            404 => {
                ClientError::from_status(ErrorKind::NotFound, "Requested resource not found.", parsed)
            }
            422 => ClientError::from_status(
                ErrorKind::Unprocessable,
                body_message.unwrap_or_else(|| "Input data is invalid.".to_string()),
                parsed,
            ),
            500..=599 => ClientError::from_status(
                ErrorKind::Server,
                "Server error occurred. Please contact the administrator.",
                parsed,
            ),
            _ => ClientError::from_status(ErrorKind::Unknown, "Unknown error occurred.", parsed),
        })
    }
}

fn is_connection_error(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fast_client() -> ServiceClient {
        ServiceClient::new()
            .with_timeout(Duration::from_millis(500))
            .with_retries(3, RetryDelay::Fixed(Duration::from_millis(50)))
    }

    #[test]
    fn fixed_delay_is_constant() {
        let delay = RetryDelay::Fixed(Duration::from_secs(1));
        assert_eq!(delay.for_attempt(1), Duration::from_secs(1));
        assert_eq!(delay.for_attempt(3), Duration::from_secs(1));
    }

    #[test]
    fn linear_delay_grows_with_attempt() {
        let delay = RetryDelay::Linear(Duration::from_secs(1));
        assert_eq!(delay.for_attempt(1), Duration::from_secs(1));
        assert_eq!(delay.for_attempt(2), Duration::from_secs(2));
        assert_eq!(delay.for_attempt(3), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn success_passes_body_through() {
        let base = serve(Router::new().route(
            "/ok",
            get(|| async { axum::Json(serde_json::json!({ "tasks": [], "total": 0 })) }),
        ))
        .await;
        let value = fast_client()
            .get(&format!("{base}/ok"), RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(value["total"], 0);
    }

    #[tokio::test]
    async fn empty_success_body_becomes_bare_marker() {
        let base = serve(Router::new().route("/empty", get(|| async { "" }))).await;
        let value = fast_client()
            .get(&format!("{base}/empty"), RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(value["success"], true);
    }

    #[tokio::test]
    async fn status_codes_classify_without_retry() {
        use axum::http::StatusCode;
        let base = serve(
            Router::new()
                .route("/bad", get(|| async { (StatusCode::BAD_REQUEST, "") }))
                .route("/auth", get(|| async { (StatusCode::UNAUTHORIZED, "") }))
                .route("/forbidden", get(|| async { (StatusCode::FORBIDDEN, "") }))
                .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "") }))
                .route(
                    "/invalid",
                    get(|| async {
                        (
                            StatusCode::UNPROCESSABLE_ENTITY,
                            axum::Json(serde_json::json!({ "message": "Title can't be blank" })),
                        )
                    }),
                )
                .route("/boom", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "") }))
                .route("/weird", get(|| async { (StatusCode::IM_A_TEAPOT, "") })),
        )
        .await;

        let client = fast_client();
        let cases = [
            ("/bad", ErrorKind::BadRequest, "Invalid request."),
            ("/auth", ErrorKind::Unauthorized, "Authentication required."),
            ("/forbidden", ErrorKind::Forbidden, "Access denied."),
            ("/missing", ErrorKind::NotFound, "Requested resource not found."),
            ("/invalid", ErrorKind::Unprocessable, "Title can't be blank"),
            (
                "/boom",
                ErrorKind::Server,
                "Server error occurred. Please contact the administrator.",
            ),
            ("/weird", ErrorKind::Unknown, "Unknown error occurred."),
        ];
        for (path, kind, message) in cases {
            let err = client
                .get(&format!("{base}{path}"), RequestOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.kind, kind, "{path}");
            assert_eq!(err.message, message, "{path}");
        }
    }

    #[tokio::test]
    async fn connection_refused_exhausts_retries() {
        // Bind then drop to get a port nothing is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let start = std::time::Instant::now();
        let err = fast_client()
            .get(&format!("http://{addr}/"), RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConnectionFailed);
        assert_eq!(
            err.message,
            "Service connection failed. Please try again later."
        );
        assert!(err.detail.is_some());
        // 3 retries at 50ms each.
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn retry_recovers_once_service_comes_up() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        // Bring the service up while the client is sleeping between attempts.
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            let router = Router::new().route(
                "/",
                get(|| async { axum::Json(serde_json::json!({ "success": true })) }),
            );
            axum::serve(listener, router).await.unwrap();
        });

        let client = ServiceClient::new()
            .with_timeout(Duration::from_millis(500))
            .with_retries(5, RetryDelay::Fixed(Duration::from_millis(100)));
        let value = client
            .get(&format!("http://{addr}/"), RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(value["success"], true);
    }

    #[tokio::test]
    async fn caller_headers_replace_defaults() {
        let base = serve(Router::new().route(
            "/echo",
            get(|headers: axum::http::HeaderMap| async move {
                let accept: Vec<String> = headers
                    .get_all("accept")
                    .iter()
                    .map(|v| v.to_str().unwrap().to_string())
                    .collect();
                axum::Json(serde_json::json!({ "accept": accept }))
            }),
        ))
        .await;

        let options = RequestOptions {
            headers: vec![(
                "Accept".to_string(),
                "application/vnd.api+json".to_string(),
            )],
            ..Default::default()
        };
        let value = fast_client()
            .get(&format!("{base}/echo"), options)
            .await
            .unwrap();
        // One value, the caller's, not the default stacked alongside it.
        assert_eq!(
            value["accept"],
            serde_json::json!(["application/vnd.api+json"])
        );
    }

    #[tokio::test]
    async fn unprocessable_body_is_preserved() {
        use axum::http::StatusCode;
        let base = serve(Router::new().route(
            "/t",
            get(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    axum::Json(serde_json::json!({
                        "errors": ["Cannot transition from pending to completed"]
                    })),
                )
            }),
        ))
        .await;
        let err = fast_client()
            .get(&format!("{base}/t"), RequestOptions::default())
            .await
            .unwrap_err();
        let errors = err.error_list().unwrap();
        assert!(errors[0].as_str().unwrap().contains("Cannot transition"));
    }
}
