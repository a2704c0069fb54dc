//! Claim sets carried by access and refresh tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_entity::account::{Account, AccountRole};

/// Distinguishes access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token for API requests.
    Access,
    /// Long-lived refresh token for obtaining a new pair.
    Refresh,
}

/// The authoritative record of one live session.
///
/// Embedded in every access token and mirrored in the ephemeral store,
/// where the activity fields are kept current. The field names are the
/// wire contract consumed by the authorization layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Owning account.
    pub account_id: Uuid,
    /// Tenant of the owning account.
    pub tenant_id: Uuid,
    /// Role at issuance.
    pub role: AccountRole,
    /// Login identifier.
    pub email: String,
    /// Last address the session was used from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Last user agent the session was used with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Last validated use.
    pub last_activity: DateTime<Utc>,
    /// Login time.
    pub created_at: DateTime<Utc>,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
    /// Always [`TokenType::Access`].
    pub token_type: TokenType,
}

impl ClaimSet {
    /// Fresh access claims for an account, valid for `ttl` from `now`.
    pub fn for_account(account: &Account, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            account_id: account.id,
            tenant_id: account.tenant_id,
            role: account.role,
            email: account.email.clone(),
            ip_address: None,
            user_agent: None,
            last_activity: now,
            created_at: now,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Access,
        }
    }

    /// Token expiry as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Whether more than `timeout` has passed since the last activity.
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_activity > timeout
    }

    /// Record a use. Empty or missing client details keep the previous values.
    pub fn touch(&mut self, now: DateTime<Utc>, ip_address: Option<&str>, user_agent: Option<&str>) {
        self.last_activity = now;
        if let Some(ip) = ip_address.filter(|ip| !ip.is_empty()) {
            self.ip_address = Some(ip.to_string());
        }
        if let Some(agent) = user_agent.filter(|agent| !agent.is_empty()) {
            self.user_agent = Some(agent.to_string());
        }
    }
}

/// Claims of a refresh token. Deliberately minimal: everything else is
/// re-read from the principal store on rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Owning account.
    pub sub: Uuid,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
    /// Always [`TokenType::Refresh`].
    pub token_type: TokenType,
}

impl RefreshClaims {
    /// Refresh claims for an account, valid for `ttl` from `now`.
    pub fn for_account(account_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: account_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Refresh,
        }
    }

    /// Token expiry as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}
