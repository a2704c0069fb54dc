//! Session lifecycle manager: login, refresh, logout, and per-request
//! session validation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use warden_core::config::{AuthConfig, SessionConfig};
use warden_core::error::AppError;
use warden_entity::account::Account;
use warden_entity::token::{AuthTokens, RevocationReason};

use crate::error::AuthError;
use crate::jwt::encoder::lifetime;
use crate::jwt::{ClaimSet, JwtDecoder, JwtEncoder, fingerprint};
use crate::password::PasswordHasher;
use crate::principal::{PrincipalStore, TenantGate};
use crate::store::{ActiveSession, TokenRepository};

use super::cleanup::{RetentionSweeper, SweeperHandle};

/// Reachability of both backing stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HealthReport {
    /// Durable token store answered.
    pub durable: bool,
    /// Ephemeral session store answered.
    pub ephemeral: bool,
}

impl HealthReport {
    /// Both stores answered.
    pub fn is_healthy(&self) -> bool {
        self.durable && self.ephemeral
    }
}

/// Manages the complete session lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    /// JWT encoder for token generation.
    jwt_encoder: Arc<JwtEncoder>,
    /// JWT decoder for token verification.
    jwt_decoder: Arc<JwtDecoder>,
    /// Durable and ephemeral token persistence.
    tokens: Arc<TokenRepository>,
    /// Account lookup.
    principals: Arc<dyn PrincipalStore>,
    /// Tenant status check.
    tenants: Arc<dyn TenantGate>,
    /// Password hasher.
    password_hasher: PasswordHasher,
    /// Inactivity cutoff for `start_session`.
    idle_timeout: Duration,
    /// Auth configuration.
    auth_config: AuthConfig,
    /// Session configuration.
    session_config: SessionConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("access_ttl_minutes", &self.auth_config.jwt_access_ttl_minutes)
            .field("refresh_ttl_hours", &self.auth_config.jwt_refresh_ttl_hours)
            .field("session_config", &self.session_config)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager with all required dependencies.
    ///
    /// Both configuration sections are validated first; an invalid one is
    /// a configuration error.
    pub fn new(
        tokens: Arc<TokenRepository>,
        principals: Arc<dyn PrincipalStore>,
        tenants: Arc<dyn TenantGate>,
        auth_config: AuthConfig,
        session_config: SessionConfig,
    ) -> Result<Self, AppError> {
        auth_config.validate()?;
        session_config.validate()?;

        Ok(Self {
            jwt_encoder: Arc::new(JwtEncoder::new(&auth_config)?),
            jwt_decoder: Arc::new(JwtDecoder::new(&auth_config)),
            tokens,
            principals,
            tenants,
            password_hasher: PasswordHasher::new(),
            idle_timeout: lifetime(
                session_config.idle_timeout(),
                "session.idle_timeout_minutes",
            )?,
            auth_config,
            session_config,
        })
    }

    /// The token repository this manager writes through.
    pub fn tokens(&self) -> &Arc<TokenRepository> {
        &self.tokens
    }

    /// Performs the complete login flow:
    ///
    /// 1. Find the account by identifier
    /// 2. Verify the secret
    /// 3. Reject inactive accounts
    /// 4. Check the owning tenant
    /// 5. Issue and persist a token pair
    /// 6. Stamp last login (best-effort)
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<AuthTokens, AuthError> {
        // Step 1: Find account
        let account = self
            .principals
            .find_by_identifier(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Step 2: Verify password
        if !self
            .password_hasher
            .verify_password(secret, &account.password_hash)?
        {
            warn!(account_id = %account.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        // Step 3: Check account status
        if !account.can_login() {
            warn!(account_id = %account.id, "Login rejected: account inactive");
            return Err(AuthError::AccountInactive);
        }

        // Step 4: Check tenant
        self.ensure_tenant(&account).await?;

        // Step 5: Issue tokens
        let tokens = self.issue_tokens(&account, Utc::now()).await?;

        // Step 6: Update last login
        if let Err(e) = self.principals.record_login(account.id).await {
            warn!(account_id = %account.id, error = %e, "Failed to update last login");
        }

        info!(
            account_id = %account.id,
            tenant_id = %account.tenant_id,
            "Login successful"
        );
        Ok(tokens)
    }

    /// Rotates a refresh token into a new token pair.
    ///
    /// The presented refresh record is consumed before anything is issued,
    /// so of several concurrent calls with the same token only one can
    /// succeed. An expired record is consumed too.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        // Step 1: Verify the token itself
        let claims = match self.jwt_decoder.verify_refresh(refresh_token) {
            Ok(claims) => Some(claims),
            Err(AuthError::Expired) => None,
            Err(e) => {
                debug!(error = %e, "Refresh rejected by codec");
                return Err(AuthError::InvalidRefreshToken);
            }
        };

        // Step 2: Consume the durable record
        let record = self
            .tokens
            .take_refresh(refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let Some(claims) = claims else {
            debug!(account_id = %record.account_id, "Discarded expired refresh token");
            return Err(AuthError::InvalidRefreshToken);
        };
        let now = Utc::now();
        if record.is_expired_at(now) {
            debug!(account_id = %record.account_id, "Discarded expired refresh record");
            return Err(AuthError::InvalidRefreshToken);
        }
        if record.account_id != claims.sub {
            warn!(
                account_id = %record.account_id,
                "Refresh record does not match token subject"
            );
            return Err(AuthError::InvalidRefreshToken);
        }

        // Step 3: Re-read the account
        let account = self
            .principals
            .find_by_id(record.account_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;
        if !account.can_login() {
            return Err(AuthError::AccountInactive);
        }
        self.ensure_tenant(&account).await?;

        // Step 4: Issue the next pair
        let tokens = self.issue_tokens(&account, now).await?;
        info!(account_id = %account.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Revokes an access token and drops its live session.
    ///
    /// The revocation must be recorded; removing the claim set is
    /// best-effort. Calling this twice for one token is harmless.
    pub async fn logout(&self, account_id: Uuid, access_token: &str) -> Result<(), AuthError> {
        let expires_at = Utc::now() + self.jwt_encoder.access_ttl();
        self.tokens
            .blacklist(account_id, access_token, expires_at, RevocationReason::Logout)
            .await?;

        let fp = fingerprint(access_token);
        if let Err(e) = self.tokens.delete_claims(&fp).await {
            warn!(
                account_id = %account_id,
                fingerprint = %fp,
                error = %e,
                "Failed to delete session claims on logout"
            );
        }

        info!(account_id = %account_id, fingerprint = %fp, "Logged out");
        Ok(())
    }

    /// Verifies an access token and checks it against the blacklist,
    /// without consulting or touching the live session.
    pub async fn validate_token(&self, access_token: &str) -> Result<ClaimSet, AuthError> {
        let claims = self
            .jwt_decoder
            .verify_access(access_token)
            .map_err(AuthError::into_invalid_token)?;

        if self.tokens.is_blacklisted(access_token).await? {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    /// Per-request session check and heartbeat.
    ///
    /// Returns the live claim set with its activity fields updated.
    pub async fn start_session(
        &self,
        access_token: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<ClaimSet, AuthError> {
        // Step 1-2: Signature, expiry, revocation
        let token_claims = self.validate_token(access_token).await?;

        // Step 3: Live claim set
        let fp = fingerprint(access_token);
        let stored = self
            .tokens
            .get_claims(&fp)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        // Step 4: Ownership
        if stored.account_id != token_claims.account_id {
            warn!(fingerprint = %fp, "Session claims belong to another account");
            return Err(AuthError::SessionMismatch);
        }

        // Step 5: Inactivity cutoff
        let now = Utc::now();
        if stored.is_idle(now, self.idle_timeout) {
            self.expire_idle(access_token, &fp, &stored, token_claims.expires_at())
                .await;
            return Err(AuthError::SessionTimedOut);
        }

        // Step 6: Touch
        match self
            .tokens
            .touch_claims(&fp, ip_address, user_agent, now)
            .await
        {
            Ok(Some(claims)) => Ok(claims),
            Ok(None) => Err(AuthError::SessionNotFound),
            Err(e) => {
                warn!(fingerprint = %fp, error = %e, "Failed to touch session claims");
                let mut claims = stored;
                claims.touch(now, ip_address, user_agent);
                Ok(claims)
            }
        }
    }

    /// Every live session of an account, newest first.
    pub async fn get_sessions(&self, account_id: Uuid) -> Result<Vec<ActiveSession>, AuthError> {
        Ok(self.tokens.list_claims(account_id).await?)
    }

    /// Ends one session of an account, identified by fingerprint.
    pub async fn terminate_session(
        &self,
        account_id: Uuid,
        session_fingerprint: &str,
    ) -> Result<(), AuthError> {
        let claims = self
            .tokens
            .get_claims(session_fingerprint)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        if claims.account_id != account_id {
            warn!(
                account_id = %account_id,
                fingerprint = %session_fingerprint,
                "Refused to terminate another account's session"
            );
            return Err(AuthError::SessionMismatch);
        }

        self.tokens.delete_claims(session_fingerprint).await?;
        info!(account_id = %account_id, fingerprint = %session_fingerprint, "Session terminated");
        Ok(())
    }

    /// Ends every session of an account, optionally sparing one.
    ///
    /// Returns the number of sessions ended.
    pub async fn terminate_all_sessions(
        &self,
        account_id: Uuid,
        except_fingerprint: Option<&str>,
    ) -> Result<usize, AuthError> {
        let removed = self
            .tokens
            .delete_all_except(account_id, except_fingerprint)
            .await?;
        info!(
            account_id = %account_id,
            removed,
            kept = except_fingerprint.is_some(),
            "Terminated account sessions"
        );
        Ok(removed)
    }

    /// Invalidates every credential of an account: refresh records,
    /// blacklist rows, and live sessions. Used after deactivation or a
    /// password change.
    ///
    /// Live sessions are removed before durable rows, so a failure part-way
    /// never leaves a blacklisted token's session usable again.
    ///
    /// Returns the number of live sessions ended.
    pub async fn revoke_account(&self, account_id: Uuid) -> Result<usize, AuthError> {
        let sessions = self.tokens.delete_all_except(account_id, None).await?;
        let rows = self.tokens.delete_all_for_account(account_id).await?;
        info!(
            account_id = %account_id,
            durable_rows = rows,
            sessions,
            "Revoked all account credentials"
        );
        Ok(sessions)
    }

    /// Checks both stores. Never fails; an erroring store reports `false`.
    pub async fn health_check(&self) -> HealthReport {
        let (durable, ephemeral) =
            tokio::join!(self.tokens.durable_health(), self.tokens.ephemeral_health());
        HealthReport {
            durable: durable.unwrap_or_else(|e| {
                warn!(error = %e, "Durable store health check failed");
                false
            }),
            ephemeral: ephemeral.unwrap_or_else(|e| {
                warn!(error = %e, "Ephemeral store health check failed");
                false
            }),
        }
    }

    /// Starts the retention sweeper for this manager's stores.
    pub fn start_sweeper(&self) -> SweeperHandle {
        RetentionSweeper::new(self.tokens.clone(), &self.session_config).spawn()
    }

    async fn ensure_tenant(&self, account: &Account) -> Result<(), AuthError> {
        if self.tenants.can_access(account.tenant_id).await? {
            Ok(())
        } else {
            warn!(
                account_id = %account.id,
                tenant_id = %account.tenant_id,
                "Tenant not available"
            );
            Err(AuthError::TenantUnavailable)
        }
    }

    async fn issue_tokens(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<AuthTokens, AuthError> {
        let claims = self.jwt_encoder.access_claims(account, now);
        let access_token = self.jwt_encoder.issue(&claims)?;
        let (refresh_token, refresh_claims) = self.jwt_encoder.issue_refresh(account.id, now)?;

        self.tokens
            .put_claims(
                &fingerprint(&access_token),
                &claims,
                self.session_config.absolute_timeout(),
            )
            .await?;
        self.tokens
            .store_refresh(account.id, &refresh_token, refresh_claims.expires_at())
            .await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            expires_in: self.auth_config.access_ttl().as_secs(),
        })
    }

    async fn expire_idle(
        &self,
        access_token: &str,
        fp: &str,
        claims: &ClaimSet,
        token_expires_at: DateTime<Utc>,
    ) {
        if let Err(e) = self.tokens.delete_claims(fp).await {
            warn!(fingerprint = %fp, error = %e, "Failed to delete idle session claims");
        }
        if let Err(e) = self
            .tokens
            .blacklist(
                claims.account_id,
                access_token,
                token_expires_at,
                RevocationReason::Timeout,
            )
            .await
        {
            warn!(fingerprint = %fp, error = %e, "Failed to blacklist idle session token");
        }
        info!(
            account_id = %claims.account_id,
            fingerprint = %fp,
            "Session timed out due to inactivity"
        );
    }
}
