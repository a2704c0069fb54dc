//! In-process durable store on dashmaps.
//!
//! Used by tests and single-node deployments without Postgres. Nothing
//! survives a restart.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;
use uuid::Uuid;

use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_entity::token::{BlacklistEntry, RefreshTokenRecord, RevocationReason};

use super::durable::DurableTokenStore;

/// [`DurableTokenStore`] kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDurableStore {
    refresh: Arc<DashMap<String, RefreshTokenRecord>>,
    blacklist: Arc<DashMap<String, BlacklistEntry>>,
}

impl MemoryDurableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh records held, expired ones included.
    pub fn refresh_len(&self) -> usize {
        self.refresh.len()
    }

    /// Blacklist entries held, expired ones included.
    pub fn blacklist_len(&self) -> usize {
        self.blacklist.len()
    }
}

#[async_trait]
impl DurableTokenStore for MemoryDurableStore {
    async fn store_refresh(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        match self.refresh.entry(token_hash.to_string()) {
            Entry::Occupied(_) => Err(AppError::conflict("Refresh token already stored")),
            Entry::Vacant(slot) => {
                slot.insert(RefreshTokenRecord {
                    id: Uuid::new_v4(),
                    account_id,
                    token_hash: token_hash.to_string(),
                    expires_at,
                    created_at: Utc::now(),
                });
                Ok(())
            }
        }
    }

    async fn get_refresh(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        let now = Utc::now();
        Ok(self
            .refresh
            .get(token_hash)
            .map(|record| record.clone())
            .filter(|record| !record.is_expired_at(now)))
    }

    async fn take_refresh(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        Ok(self.refresh.remove(token_hash).map(|(_, record)| record))
    }

    async fn delete_refresh(&self, token_hash: &str) -> AppResult<bool> {
        Ok(self.refresh.remove(token_hash).is_some())
    }

    async fn blacklist(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        reason: RevocationReason,
    ) -> AppResult<()> {
        self.blacklist
            .entry(token_hash.to_string())
            .or_insert_with(|| BlacklistEntry {
                id: Uuid::new_v4(),
                account_id,
                token_hash: token_hash.to_string(),
                expires_at,
                created_at: Utc::now(),
                reason,
            });
        Ok(())
    }

    async fn is_blacklisted(&self, token_hash: &str) -> AppResult<bool> {
        let now = Utc::now();
        Ok(self
            .blacklist
            .get(token_hash)
            .is_some_and(|entry| entry.expires_at > now))
    }

    async fn delete_all_for_account(&self, account_id: Uuid) -> AppResult<u64> {
        let before = self.refresh.len() + self.blacklist.len();
        self.refresh.retain(|_, record| record.account_id != account_id);
        self.blacklist.retain(|_, entry| entry.account_id != account_id);
        let after = self.refresh.len() + self.blacklist.len();
        Ok(before.saturating_sub(after) as u64)
    }

    async fn sweep_expired_refresh(&self) -> AppResult<u64> {
        let now = Utc::now();
        let before = self.refresh.len();
        self.refresh.retain(|_, record| !record.is_expired_at(now));
        let rows = before.saturating_sub(self.refresh.len()) as u64;
        if rows > 0 {
            info!(rows, "Cleaned up expired refresh tokens");
        }
        Ok(rows)
    }

    async fn sweep_expired_blacklist(&self) -> AppResult<u64> {
        let now = Utc::now();
        let before = self.blacklist.len();
        self.blacklist.retain(|_, entry| entry.expires_at > now);
        let rows = before.saturating_sub(self.blacklist.len()) as u64;
        if rows > 0 {
            info!(rows, "Cleaned up expired blacklisted tokens");
        }
        Ok(rows)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
