use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use taskhive_http::{extract_token, ApiError, SESSION_COOKIE};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

/// POST /login — proxy to the User Service, then own the browser cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(input): Json<LoginInput>,
) -> Result<Response, ApiError> {
    let body = state.users.login(&input.email, &input.password).await?;
    respond_with_session(body, state.production, StatusCode::OK)
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RegisterInput>,
) -> Result<Response, ApiError> {
    let body = state
        .users
        .register(
            &input.name,
            &input.email,
            &input.password,
            &input.password_confirmation,
        )
        .await?;
    respond_with_session(body, state.production, StatusCode::CREATED)
}

/// POST /logout — best effort upstream; the local cookie is cleared even
/// when the User Service can't be reached.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_token(&headers) {
        if let Err(e) = state.users.logout(&token).await {
            tracing::warn!(error = %e, "logout call to user service failed");
        }
    }

    (
        [(header::SET_COOKIE, clear_cookie())],
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
        .into_response()
}

fn respond_with_session(
    body: Value,
    production: bool,
    status: StatusCode,
) -> Result<Response, ApiError> {
    let token = body
        .get("session_token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::internal("auth response missing session token"))?;

    Ok((
        status,
        [(header::SET_COOKIE, session_cookie(&token, production))],
        Json(body),
    )
        .into_response())
}

pub(crate) fn session_cookie(token: &str, production: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if production {
        cookie.push_str("; Secure");
    }
    cookie
}

pub(crate) fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
