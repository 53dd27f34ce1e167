use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{HiveError, Result};

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 8;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

/// A registered account. The password hash never leaves the User Service;
/// wire responses use [`UserProfile`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The identity shape returned over the wire: no password material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Input for registration. Email is lowercased before storage.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub password_confirmation: Option<String>,
}

/// Validate registration input, collecting every failure so callers can
/// surface them as a 422 list.
pub fn validate_register_input(input: &RegisterInput) -> std::result::Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let name = input.name.trim();
    if name.len() < MIN_NAME_LENGTH || name.len() > MAX_NAME_LENGTH {
        errors.push(format!(
            "Name must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters"
        ));
    }

    if input.email.trim().is_empty() {
        errors.push("Email can't be blank".to_string());
    } else if !email_regex().is_match(input.email.trim()) {
        errors.push("Email is invalid".to_string());
    }

    if input.password.len() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "Password is too short (minimum is {MIN_PASSWORD_LENGTH} characters)"
        ));
    }

    if let Some(ref confirmation) = input.password_confirmation {
        if confirmation != &input.password {
            errors.push("Password confirmation doesn't match Password".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Hash a password with Argon2id into PHC string format.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HiveError::InvalidInput(format!("failed to hash password: {e}")))
}

/// Verify a plaintext password against a stored PHC-format hash.
///
/// Returns `Ok(false)` on mismatch; `Err` only for a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = argon2::PasswordHash::new(hash)
        .map_err(|e| HiveError::InvalidInput(format!("invalid password hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(HiveError::InvalidInput(format!("verify error: {e}"))),
    }
}
