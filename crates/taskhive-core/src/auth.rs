use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity resolved by the Auth Verification Protocol. Carried through a
/// request explicitly (axum request extensions) after a single live
/// verification call; never re-verified within the same request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

/// Why a request's identity claim could not be resolved.
///
/// `Unavailable` is deliberately distinct from the token failures: the
/// User Service being unreachable maps to 503, not 401.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No session token provided")]
    MissingToken,
    #[error("Invalid session token")]
    InvalidToken,
    #[error("Session expired")]
    SessionExpired,
    #[error("User service unavailable")]
    Unavailable,
}

impl AuthError {
    /// Classify the `error` string a verification endpoint returned.
    pub fn from_verify_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("expired") {
            Self::SessionExpired
        } else if lower.contains("no session token") {
            Self::MissingToken
        } else {
            Self::InvalidToken
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_messages_classify() {
        assert_eq!(
            AuthError::from_verify_message("Session expired"),
            AuthError::SessionExpired
        );
        assert_eq!(
            AuthError::from_verify_message("No session token provided"),
            AuthError::MissingToken
        );
        assert_eq!(
            AuthError::from_verify_message("Invalid session token"),
            AuthError::InvalidToken
        );
        assert_eq!(
            AuthError::from_verify_message("something else"),
            AuthError::InvalidToken
        );
    }
}
