//! JWT token creation (access + refresh).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;
use uuid::Uuid;

use warden_core::config::AuthConfig;
use warden_core::error::AppError;
use warden_entity::account::Account;

use super::claims::{ClaimSet, RefreshClaims};
use crate::error::AuthError;

/// Signs access and refresh tokens with the server's HMAC secret.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    ///
    /// Fails if a token lifetime does not fit a timestamp offset.
    pub fn new(config: &AuthConfig) -> Result<Self, AppError> {
        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: lifetime(config.access_ttl(), "auth.jwt_access_ttl_minutes")?,
            refresh_ttl: lifetime(config.refresh_ttl(), "auth.jwt_refresh_ttl_hours")?,
        })
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Fresh access claims for an account logging in at `now`.
    pub fn access_claims(&self, account: &Account, now: DateTime<Utc>) -> ClaimSet {
        ClaimSet::for_account(account, now, self.access_ttl)
    }

    /// Sign an access token carrying the given claims.
    pub fn issue(&self, claims: &ClaimSet) -> Result<String, AuthError> {
        self.sign(claims)
    }

    /// Sign a new refresh token for an account.
    pub fn issue_refresh(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(String, RefreshClaims), AuthError> {
        let claims = RefreshClaims::for_account(account_id, now, self.refresh_ttl);
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))
    }
}

/// Convert a configured lifetime into a chrono offset.
pub(crate) fn lifetime(value: std::time::Duration, setting: &str) -> Result<Duration, AppError> {
    Duration::from_std(value)
        .map_err(|_| AppError::configuration(format!("{setting} is out of range")))
}
