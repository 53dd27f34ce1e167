pub mod auth;
pub mod error;
pub mod health;

pub use auth::{
    extract_token, require_auth, CurrentUser, SessionToken, SESSION_COOKIE,
};
pub use error::ApiError;
pub use health::{DependencyHealth, HealthStatus};
