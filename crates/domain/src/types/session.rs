//! Access-token session state and token-endpoint payloads

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_REFRESH_SKEW_SECS;
use crate::errors::{ArmisError, Result};

/// Cached bearer token and the instant after which it must not be used.
///
/// Created empty, replaced as a whole by each successful authentication and
/// never persisted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: String,
    token_expiry: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session from a freshly issued token.
    ///
    /// The stored expiry is `server_expiry - 5m`.
    pub fn issued(access_token: String, server_expiry: DateTime<Utc>) -> Self {
        Self {
            access_token,
            token_expiry: Some(server_expiry - Duration::seconds(TOKEN_REFRESH_SKEW_SECS)),
        }
    }

    /// Token is present and `now < token_expiry`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.token_expiry.is_some_and(|expiry| now < expiry)
    }

    /// Raw token, empty before the first authentication.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Skew-adjusted expiry, `None` before the first authentication.
    pub fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.token_expiry
    }

    /// Seconds of validity left at `now`, `None` when unauthenticated.
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.token_expiry.map(|expiry| (expiry - now).num_seconds())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &if self.access_token.is_empty() { "" } else { "[REDACTED]" })
            .field("token_expiry", &self.token_expiry)
            .finish()
    }
}

/// `data` of the token endpoint response.
///
/// The expiry is kept as the raw string so that a malformed timestamp is
/// reported as [`ArmisError::TimeParse`] rather than a decode failure.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenData {
    /// Sent verbatim as `Authorization`
    pub access_token: String,
    /// RFC3339 expiry as reported by the server
    pub expiration_utc: String,
}

impl AccessTokenData {
    /// Parse `expiration_utc` as RFC3339 (nanosecond precision accepted).
    pub fn expiry(&self) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.expiration_utc)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|e| {
                ArmisError::TimeParse(format!(
                    "invalid expiration_utc {:?}: {}",
                    self.expiration_utc, e
                ))
            })
    }
}

impl fmt::Debug for AccessTokenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenData")
            .field("access_token", &"[REDACTED]")
            .field("expiration_utc", &self.expiration_utc)
            .finish()
    }
}
