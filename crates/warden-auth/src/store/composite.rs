//! Single handle over the durable and ephemeral stores.
//!
//! Raw tokens are reduced to fingerprints here before they reach the
//! durable store. Nothing else happens in this layer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_entity::token::{RefreshTokenRecord, RevocationReason};

use super::durable::DurableTokenStore;
use super::session::{ActiveSession, OrphanSweep, SessionStore};
use crate::jwt::{ClaimSet, fingerprint};

/// Coordinates refresh records, revocations, and live sessions.
#[derive(Debug, Clone)]
pub struct TokenRepository {
    durable: Arc<dyn DurableTokenStore>,
    sessions: SessionStore,
}

impl TokenRepository {
    /// Combine a durable store and a session store.
    pub fn new(durable: Arc<dyn DurableTokenStore>, sessions: SessionStore) -> Self {
        Self { durable, sessions }
    }

    // ── Durable: raw tokens in, fingerprints stored ─────────────────

    /// Persist a refresh token.
    pub async fn store_refresh(
        &self,
        account_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.durable
            .store_refresh(account_id, &fingerprint(token), expires_at)
            .await
    }

    /// Read an unexpired refresh record.
    pub async fn get_refresh(&self, token: &str) -> AppResult<Option<RefreshTokenRecord>> {
        self.durable.get_refresh(&fingerprint(token)).await
    }

    /// Consume a refresh record, expired or not.
    pub async fn take_refresh(&self, token: &str) -> AppResult<Option<RefreshTokenRecord>> {
        self.durable.take_refresh(&fingerprint(token)).await
    }

    /// Remove a refresh record.
    pub async fn delete_refresh(&self, token: &str) -> AppResult<bool> {
        self.durable.delete_refresh(&fingerprint(token)).await
    }

    /// Revoke an access token until `expires_at`.
    pub async fn blacklist(
        &self,
        account_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
        reason: RevocationReason,
    ) -> AppResult<()> {
        self.durable
            .blacklist(account_id, &fingerprint(token), expires_at, reason)
            .await
    }

    /// Whether an access token is revoked.
    pub async fn is_blacklisted(&self, token: &str) -> AppResult<bool> {
        self.durable.is_blacklisted(&fingerprint(token)).await
    }

    /// Remove every durable row of an account.
    pub async fn delete_all_for_account(&self, account_id: Uuid) -> AppResult<u64> {
        self.durable.delete_all_for_account(account_id).await
    }

    /// Delete expired refresh records.
    pub async fn sweep_expired_refresh(&self) -> AppResult<u64> {
        self.durable.sweep_expired_refresh().await
    }

    /// Delete expired blacklist entries.
    pub async fn sweep_expired_blacklist(&self) -> AppResult<u64> {
        self.durable.sweep_expired_blacklist().await
    }

    // ── Ephemeral: keyed by fingerprint ─────────────────────────────

    /// Store a live claim set.
    pub async fn put_claims(
        &self,
        fingerprint: &str,
        claims: &ClaimSet,
        ttl: Duration,
    ) -> AppResult<()> {
        self.sessions.put_claims(fingerprint, claims, ttl).await
    }

    /// Read a live claim set.
    pub async fn get_claims(&self, fingerprint: &str) -> AppResult<Option<ClaimSet>> {
        self.sessions.get_claims(fingerprint).await
    }

    /// Record activity on a live claim set.
    pub async fn touch_claims(
        &self,
        fingerprint: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ClaimSet>> {
        self.sessions
            .touch_claims(fingerprint, ip_address, user_agent, now)
            .await
    }

    /// Remove a live claim set.
    pub async fn delete_claims(&self, fingerprint: &str) -> AppResult<()> {
        self.sessions.delete_claims(fingerprint).await
    }

    /// List an account's live sessions.
    pub async fn list_claims(&self, account_id: Uuid) -> AppResult<Vec<ActiveSession>> {
        self.sessions.list_claims(account_id).await
    }

    /// Delete an account's live sessions except `keep`.
    pub async fn delete_all_except(
        &self,
        account_id: Uuid,
        keep: Option<&str>,
    ) -> AppResult<usize> {
        self.sessions.delete_all_except(account_id, keep).await
    }

    /// Prune stale session index entries.
    pub async fn sweep_orphans(&self) -> AppResult<OrphanSweep> {
        self.sessions.sweep_orphans().await
    }

    // ── Health ──────────────────────────────────────────────────────

    /// Health check of the durable store.
    pub async fn durable_health(&self) -> AppResult<bool> {
        self.durable.health_check().await
    }

    /// Health check of the ephemeral store.
    pub async fn ephemeral_health(&self) -> AppResult<bool> {
        self.sessions.health_check().await
    }
}
