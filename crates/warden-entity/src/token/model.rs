//! Durable token rows.
//!
//! Both tables are keyed by the SHA-256 fingerprint of the raw token; the
//! token itself is never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// A persisted refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    /// Row identifier.
    pub id: Uuid,
    /// Owning account.
    #[sqlx(rename = "user_id")]
    pub account_id: Uuid,
    /// Fingerprint of the raw refresh token.
    pub token_hash: String,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Whether the record is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the record is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Why an access token was revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "revocation_reason", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RevocationReason {
    /// Explicit logout by the holder.
    Logout,
    /// Inactivity cutoff reached.
    Timeout,
}

impl RevocationReason {
    /// Return the reason as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A revoked access token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlacklistEntry {
    /// Row identifier.
    pub id: Uuid,
    /// Account the token was issued to.
    #[sqlx(rename = "user_id")]
    pub account_id: Uuid,
    /// Fingerprint of the revoked access token.
    pub token_hash: String,
    /// When the token would have expired on its own.
    pub expires_at: DateTime<Utc>,
    /// When the token was revoked.
    pub created_at: DateTime<Utc>,
    /// Why the token was revoked.
    pub reason: RevocationReason,
}
