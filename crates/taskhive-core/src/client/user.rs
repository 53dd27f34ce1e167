use std::time::Duration;

use serde_json::{json, Value};

use crate::auth::{AuthError, AuthUser};
use crate::client::{ClientResult, RequestOptions, RetryDelay, ServiceClient};

/// Timeout for auth round-trips; shorter than the general default since
/// verification sits on every authenticated request's critical path.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the User Service: registration, login, logout, and the
/// session-verification call every other service depends on.
#[derive(Debug, Clone)]
pub struct UserServiceClient {
    client: ServiceClient,
    base_url: String,
}

impl UserServiceClient {
    /// Verification retries back off linearly rather than at a fixed
    /// delay, since auth is called far more often than anything else.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: ServiceClient::new()
                .with_timeout(VERIFY_TIMEOUT)
                .with_retries(3, RetryDelay::Linear(Duration::from_secs(1))),
            base_url: base_url.into(),
        }
    }

    /// Replace the underlying resilient client (tests use short delays).
    pub fn with_client(mut self, client: ServiceClient) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health_check(&self) -> ClientResult {
        self.client
            .get(
                &format!("{}/api/v1/health", self.base_url),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        password_confirmation: &str,
    ) -> ClientResult {
        self.client
            .post(
                &format!("{}/api/v1/auth/register", self.base_url),
                RequestOptions::default().with_body(json!({
                    "name": name,
                    "email": email,
                    "password": password,
                    "password_confirmation": password_confirmation,
                })),
            )
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult {
        self.client
            .post(
                &format!("{}/api/v1/auth/login", self.base_url),
                RequestOptions::default().with_body(json!({
                    "email": email,
                    "password": password,
                })),
            )
            .await
    }

    pub async fn logout(&self, token: &str) -> ClientResult {
        self.client
            .post(
                &format!("{}/api/v1/auth/logout", self.base_url),
                RequestOptions::bearer(token),
            )
            .await
    }

    pub async fn get_user(&self, user_id: i64) -> ClientResult {
        self.client
            .get(
                &format!("{}/api/v1/users/{user_id}", self.base_url),
                RequestOptions::default(),
            )
            .await
    }

    /// Resolve a session token into a verified identity.
    ///
    /// The only source of truth for session validity is this round trip;
    /// there is no local token validation anywhere. Transport failure is
    /// reported as [`AuthError::Unavailable`], never conflated with an
    /// invalid token.
    pub async fn verify_session(&self, token: &str) -> Result<AuthUser, AuthError> {
        let result = self
            .client
            .get(
                &format!("{}/api/v1/auth/verify", self.base_url),
                RequestOptions::bearer(token),
            )
            .await;

        match result {
            Ok(body) => parse_verified_user(&body).ok_or(AuthError::InvalidToken),
            Err(e) if e.is_unavailable() => {
                tracing::error!(error = ?e.detail, "user service unreachable during verification");
                Err(AuthError::Unavailable)
            }
            Err(e) => Err(AuthError::from_verify_message(&e.message)),
        }
    }
}

fn parse_verified_user(body: &Value) -> Option<AuthUser> {
    if body.get("success").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    let user = body.get("user")?;
    Some(AuthUser {
        id: user.get("id")?.as_i64()?,
        email: user.get("email")?.as_str()?.to_string(),
        name: user.get("name")?.as_str()?.to_string(),
    })
}
