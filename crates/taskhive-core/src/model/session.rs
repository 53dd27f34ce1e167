use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long a session stays valid, and the window it is renewed by on
/// every successful verification.
pub const SESSION_TTL_HOURS: i64 = 24;

/// One authenticated login. Owned exclusively by the User Service; other
/// services only ever see the opaque `token` string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
            created_at: now,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Expiry after an extension-on-use, always `now + 24h`.
    pub fn renewed_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(SESSION_TTL_HOURS)
    }
}
