use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use taskhive_core::model::{
    hash_password, validate_register_input, verify_password, RegisterInput, Session, User,
    UserProfile,
};
use taskhive_core::HiveError;
use taskhive_http::{extract_token, ApiError, SESSION_COOKIE};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// POST /api/v1/auth/register — create an account and log it in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RegisterInput>,
) -> Result<Response, ApiError> {
    if let Err(errors) = validate_register_input(&input) {
        return Err(register_failure(errors));
    }

    let password_hash = hash_password(&input.password)?;
    let user = state
        .store
        .create_user(
            input.name.trim().to_string(),
            input.email.trim().to_lowercase(),
            password_hash,
        )
        .await
        .map_err(|e| match e {
            HiveError::InvalidInput(msg) => register_failure(vec![msg]),
            other => other.into(),
        })?;

    let session = Session::new(user.id);
    let cookie = session_cookie(&session.token, state.production);
    let body = session_body(&user, &session.token);
    state.store.insert_session(session).await?;

    tracing::info!(user_id = user.id, "account registered");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(body),
    )
        .into_response())
}

/// POST /api/v1/auth/login — one live session per account: any prior
/// sessions are destroyed before the new one is issued.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(input): Json<LoginInput>,
) -> Result<Response, ApiError> {
    let user = state
        .store
        .find_by_email(input.email.trim().to_lowercase())
        .await?;

    let user = match user {
        Some(u) if verify_password(&input.password, &u.password_hash).unwrap_or(false) => u,
        _ => return Err(ApiError::unauthorized("Invalid email or password")),
    };

    state.store.destroy_sessions_for_user(user.id).await?;
    let session = Session::new(user.id);
    let cookie = session_cookie(&session.token, state.production);
    let body = session_body(&user, &session.token);
    state.store.insert_session(session).await?;

    tracing::info!(user_id = user.id, "login");

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (session, _user) = authenticate(&state, &headers).await?;
    state.store.delete_session(session.token).await?;

    Ok((
        [(header::SET_COOKIE, clear_cookie())],
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
        .into_response())
}

/// GET /api/v1/auth/verify — the endpoint every other service calls to
/// turn a token into an identity. A successful verification slides the
/// session expiry forward by the full TTL.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let (session, user) = authenticate(&state, &headers).await?;

    state
        .store
        .extend_session(session.token, Session::renewed_expiry(Utc::now()))
        .await?;

    Ok(Json(success_body(&user)))
}

// ── helpers ────────────────────────────────────────────────────────────

/// Resolve the inbound token to a live session and its user. Each failure
/// mode has its own message so callers can distinguish them; an expired
/// session is deleted the moment it is seen.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<(Session, User), ApiError> {
    let token = extract_token(headers)
        .ok_or_else(|| ApiError::unauthorized("No session token provided"))?;

    let session = state
        .store
        .find_session(token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid session token"))?;

    if !session.is_valid(Utc::now()) {
        state.store.delete_session(session.token).await?;
        return Err(ApiError::unauthorized("Session expired"));
    }

    let user = state
        .store
        .get_user(session.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid session token"))?;

    Ok((session, user))
}

fn success_body(user: &User) -> Value {
    json!({ "success": true, "user": UserProfile::from(user) })
}

/// Login and registration additionally return the token in the body so
/// browser-facing proxies can manage their own cookie.
fn session_body(user: &User, token: &str) -> Value {
    json!({
        "success": true,
        "user": UserProfile::from(user),
        "session_token": token,
    })
}

fn register_failure(errors: Vec<String>) -> ApiError {
    ApiError::new(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "success": false, "errors": errors }),
    )
}

fn session_cookie(token: &str, production: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if production {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
