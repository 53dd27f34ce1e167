use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use taskhive_core::auth::{AuthError, AuthUser};
use taskhive_core::client::UserServiceClient;

use crate::error::ApiError;

/// Cookie used by browser-facing services.
pub const SESSION_COOKIE: &str = "session_token";

/// Select the inbound token: `Authorization: Bearer` wins, then the
/// `session_token` cookie. `None` means no candidate at all, which is a
/// distinct condition from an invalid token.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers, SESSION_COOKIE))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix(prefix.as_str()))
                .map(str::to_string)
        })
        .filter(|t| !t.is_empty())
}

/// Verified identity for the current request. Populated exactly once by
/// [`require_auth`]; handlers take this instead of re-verifying.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::from(AuthError::MissingToken))
    }
}

/// Middleware for routes where authentication is mandatory: resolves the
/// token through one live User Service round trip and stores the identity
/// in request extensions for the rest of the request.
pub async fn require_auth(
    State(verifier): State<Arc<UserServiceClient>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers()).ok_or(AuthError::MissingToken)?;
    let user = verifier.verify_session(&token).await?;
    req.extensions_mut().insert(user);
    req.extensions_mut().insert(SessionToken(token));
    Ok(next.run(req).await)
}

/// The raw token the current request authenticated with, for forwarding
/// to sibling services.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(|| ApiError::from(AuthError::MissingToken))
    }
}
