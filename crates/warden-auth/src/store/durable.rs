//! Durable token store seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_database::repositories::token::TokenRecordRepository;
use warden_entity::token::{RefreshTokenRecord, RevocationReason};

/// Persistence for refresh records and revoked access tokens.
///
/// Every method takes a token fingerprint, never a raw token.
#[async_trait]
pub trait DurableTokenStore: Send + Sync + std::fmt::Debug {
    /// Persist a refresh record.
    async fn store_refresh(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Read an unexpired refresh record without consuming it.
    async fn get_refresh(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>>;

    /// Remove a refresh record and return it, expired or not.
    ///
    /// Of several concurrent callers for one fingerprint, at most one
    /// receives `Some`.
    async fn take_refresh(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>>;

    /// Remove a refresh record. Returns whether one existed.
    async fn delete_refresh(&self, token_hash: &str) -> AppResult<bool>;

    /// Revoke an access token until `expires_at`. Idempotent.
    async fn blacklist(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        reason: RevocationReason,
    ) -> AppResult<()>;

    /// Whether an unexpired revocation exists.
    async fn is_blacklisted(&self, token_hash: &str) -> AppResult<bool>;

    /// Remove every refresh and blacklist row of an account.
    async fn delete_all_for_account(&self, account_id: Uuid) -> AppResult<u64>;

    /// Delete expired refresh records.
    async fn sweep_expired_refresh(&self) -> AppResult<u64>;

    /// Delete expired blacklist entries.
    async fn sweep_expired_blacklist(&self) -> AppResult<u64>;

    /// Whether the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

#[async_trait]
impl DurableTokenStore for TokenRecordRepository {
    async fn store_refresh(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        TokenRecordRepository::store_refresh(self, account_id, token_hash, expires_at).await
    }

    async fn get_refresh(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        self.find_refresh(token_hash).await
    }

    async fn take_refresh(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        TokenRecordRepository::take_refresh(self, token_hash).await
    }

    async fn delete_refresh(&self, token_hash: &str) -> AppResult<bool> {
        TokenRecordRepository::delete_refresh(self, token_hash).await
    }

    async fn blacklist(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        reason: RevocationReason,
    ) -> AppResult<()> {
        TokenRecordRepository::blacklist(self, account_id, token_hash, expires_at, reason).await
    }

    async fn is_blacklisted(&self, token_hash: &str) -> AppResult<bool> {
        TokenRecordRepository::is_blacklisted(self, token_hash).await
    }

    async fn delete_all_for_account(&self, account_id: Uuid) -> AppResult<u64> {
        TokenRecordRepository::delete_all_for_account(self, account_id).await
    }

    async fn sweep_expired_refresh(&self) -> AppResult<u64> {
        self.delete_expired_refresh().await
    }

    async fn sweep_expired_blacklist(&self) -> AppResult<u64> {
        self.delete_expired_blacklist().await
    }

    async fn health_check(&self) -> AppResult<bool> {
        TokenRecordRepository::health_check(self).await
    }
}
