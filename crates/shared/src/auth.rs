//! Caller identity carried in access tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: i32,
    /// Club role: `admin`, `coach` or `athlete`.
    pub role: String,
    /// Athlete profile linked to the user, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub athlete_id: Option<i32>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: i32,
        role: &str,
        athlete_id: Option<i32>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id,
            role: role.to_string(),
            athlete_id,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> i32 {
        self.sub
    }
}
