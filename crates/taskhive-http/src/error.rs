use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};

use taskhive_core::auth::AuthError;
use taskhive_core::client::{ClientError, ErrorKind};
use taskhive_core::model::FieldErrors;
use taskhive_core::HiveError;

/// API-boundary error: a status code plus the exact JSON body to render.
///
/// Body shapes follow the service contracts: auth failures are
/// `{success:false, error}`, validation failures are `{errors:[...]}` (or
/// field-keyed for the File Service), not-found is `{error}`.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, json!({ "error": message.into() }))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            json!({ "success": false, "error": message.into() }),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, json!({ "error": message.into() }))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            json!({ "success": false, "error": message.into() }),
        )
    }

    /// 422 with a flat list of human-readable messages.
    pub fn validation(errors: Vec<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, json!({ "errors": errors }))
    }

    /// 422 with field-keyed messages (File Service shape).
    pub fn field_errors(errors: FieldErrors) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, json!({ "errors": errors.0 }))
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "success": false, "error": message.into() }),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(error = %message, "internal server error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "error": "Internal server error" }),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<HiveError> for ApiError {
    fn from(e: HiveError) -> Self {
        match e {
            HiveError::NotFound(msg) => Self::not_found(msg),
            HiveError::InvalidInput(msg) => Self::validation(vec![msg]),
            HiveError::Transition(err) => Self::validation(vec![err.to_string()]),
            HiveError::Conflict(msg) => Self::conflict(msg),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken => Self::unauthorized("Authentication required"),
            AuthError::Unavailable => Self::service_unavailable(e.to_string()),
            other => Self::unauthorized(other.to_string()),
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        let status = match e.kind {
            ErrorKind::ConnectionFailed => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::BAD_GATEWAY,
        };
        // Prefer the sibling's own error body so messages survive the hop.
        let body = e
            .body
            .clone()
            .unwrap_or_else(|| json!({ "success": false, "error": e.message }));
        Self::new(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_status_codes() {
        assert_eq!(
            ApiError::from(AuthError::MissingToken).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidToken).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::SessionExpired).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Unavailable).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn transition_error_renders_as_422_list() {
        use taskhive_core::model::{StatusError, TaskStatus};
        let api: ApiError = HiveError::from(StatusError {
            from: TaskStatus::Pending,
            to: TaskStatus::Completed,
        })
        .into();
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api.body["errors"][0]
            .as_str()
            .unwrap()
            .contains("Cannot transition"));
    }

    #[test]
    fn missing_token_body_shape() {
        let api = ApiError::from(AuthError::MissingToken);
        assert_eq!(api.body["success"], false);
        assert_eq!(api.body["error"], "Authentication required");
    }
}
