//! Ephemeral session store: live claim sets plus the per-account index.
//!
//! The index is a hint. Every read through it tolerates members whose
//! claim set has already expired and removes them as it goes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use warden_cache::CacheManager;
use warden_cache::keys;
use warden_core::result::AppResult;
use warden_core::traits::CacheProvider;

use crate::jwt::ClaimSet;

/// One live session as shown to its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    /// Fingerprint of the session's access token; the handle for termination.
    pub fingerprint: String,
    /// The live claim set.
    #[serde(flatten)]
    pub claims: ClaimSet,
}

/// Outcome of one orphan sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrphanSweep {
    /// Per-account indexes visited.
    pub indexes_scanned: usize,
    /// Index members removed because their claim set was gone.
    pub entries_removed: usize,
}

/// Claim sets and session indexes kept in the cache.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cache: Arc<CacheManager>,
    index_grace: Duration,
    scan_batch: usize,
}

impl SessionStore {
    /// Create a store over a cache manager.
    ///
    /// `index_grace` is added to each claim TTL when extending the owning
    /// account's index; `scan_batch` is the page size for orphan sweeps.
    pub fn new(cache: Arc<CacheManager>, index_grace: Duration, scan_batch: usize) -> Self {
        Self {
            cache,
            index_grace,
            scan_batch: scan_batch.max(1),
        }
    }

    /// Store a claim set for `ttl` and register it in the account index.
    pub async fn put_claims(
        &self,
        fingerprint: &str,
        claims: &ClaimSet,
        ttl: Duration,
    ) -> AppResult<()> {
        self.cache
            .set_json(&keys::session_claims(fingerprint), claims, ttl)
            .await?;

        let index = keys::account_sessions(claims.account_id);
        self.cache.set_add(&index, fingerprint).await?;
        if let Err(e) = self.cache.expire(&index, ttl + self.index_grace).await {
            warn!(
                account_id = %claims.account_id,
                error = %e,
                "Failed to extend session index TTL"
            );
        }
        Ok(())
    }

    /// Read a live claim set.
    pub async fn get_claims(&self, fingerprint: &str) -> AppResult<Option<ClaimSet>> {
        self.cache.get_json(&keys::session_claims(fingerprint)).await
    }

    /// Record activity on a live claim set without extending its TTL.
    ///
    /// Returns the updated claims, or `None` if the claim set is gone.
    pub async fn touch_claims(
        &self,
        fingerprint: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ClaimSet>> {
        let key = keys::session_claims(fingerprint);
        let Some(mut claims) = self.cache.get_json::<ClaimSet>(&key).await? else {
            return Ok(None);
        };
        claims.touch(now, ip_address, user_agent);
        if self.cache.replace_json(&key, &claims).await? {
            Ok(Some(claims))
        } else {
            Ok(None)
        }
    }

    /// Remove a claim set and its index entry. Absence is not an error.
    pub async fn delete_claims(&self, fingerprint: &str) -> AppResult<()> {
        let key = keys::session_claims(fingerprint);
        let owner = self
            .cache
            .get_json::<ClaimSet>(&key)
            .await?
            .map(|claims| claims.account_id);
        self.cache.delete(&key).await?;

        if let Some(account_id) = owner {
            self.unindex(account_id, fingerprint).await;
        }
        Ok(())
    }

    /// Every live session of an account, newest first.
    pub async fn list_claims(&self, account_id: Uuid) -> AppResult<Vec<ActiveSession>> {
        let members = self
            .cache
            .set_members(&keys::account_sessions(account_id))
            .await?;

        let mut sessions = Vec::with_capacity(members.len());
        for fingerprint in members {
            match self.get_claims(&fingerprint).await {
                Ok(Some(claims)) => sessions.push(ActiveSession {
                    fingerprint,
                    claims,
                }),
                Ok(None) => self.unindex(account_id, &fingerprint).await,
                Err(e) => warn!(
                    account_id = %account_id,
                    fingerprint = %fingerprint,
                    error = %e,
                    "Skipping unreadable session"
                ),
            }
        }

        sessions.sort_by(|a, b| b.claims.created_at.cmp(&a.claims.created_at));
        Ok(sessions)
    }

    /// Delete every session of an account except `keep`.
    ///
    /// Returns how many sessions were removed. Without `keep` the index
    /// itself is dropped as well.
    pub async fn delete_all_except(
        &self,
        account_id: Uuid,
        keep: Option<&str>,
    ) -> AppResult<usize> {
        let index = keys::account_sessions(account_id);
        let members = self.cache.set_members(&index).await?;

        let mut removed = 0;
        for fingerprint in members.iter().filter(|fp| Some(fp.as_str()) != keep) {
            self.cache.delete(&keys::session_claims(fingerprint)).await?;
            if keep.is_some() {
                self.unindex(account_id, fingerprint).await;
            }
            removed += 1;
        }

        if keep.is_none() {
            self.cache.delete(&index).await?;
        }

        debug!(account_id = %account_id, removed, "Deleted account sessions");
        Ok(removed)
    }

    /// Prune index members whose claim set no longer exists.
    pub async fn sweep_orphans(&self) -> AppResult<OrphanSweep> {
        let indexes = self
            .cache
            .scan_keys(&keys::account_sessions_pattern(), self.scan_batch)
            .await?;

        let mut sweep = OrphanSweep::default();
        for index in indexes {
            let Some(account_id) = keys::parse_account_sessions(&index) else {
                continue;
            };
            sweep.indexes_scanned += 1;

            let members = match self.cache.set_members(&index).await {
                Ok(members) => members,
                Err(e) => {
                    warn!(index = %index, error = %e, "Failed to read session index");
                    continue;
                }
            };
            for fingerprint in members {
                match self.cache.exists(&keys::session_claims(&fingerprint)).await {
                    Ok(true) => {}
                    Ok(false) => {
                        self.unindex(account_id, &fingerprint).await;
                        sweep.entries_removed += 1;
                    }
                    Err(e) => warn!(
                        fingerprint = %fingerprint,
                        error = %e,
                        "Failed to check session liveness"
                    ),
                }
            }
        }
        Ok(sweep)
    }

    /// Whether the cache is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.cache.health_check().await
    }

    async fn unindex(&self, account_id: Uuid, fingerprint: &str) {
        if let Err(e) = self
            .cache
            .set_remove(&keys::account_sessions(account_id), fingerprint)
            .await
        {
            warn!(
                account_id = %account_id,
                fingerprint = %fingerprint,
                error = %e,
                "Failed to remove session index entry"
            );
        }
    }
}
