//! In-memory cache implementation using the moka crate.
//!
//! Every entry carries its own deadline. Moka's per-entry expiry reads that
//! deadline on insert and on update, so an overwrite that copies the
//! deadline forward keeps the remaining TTL, as `SET ... KEEPTTL` does.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tracing::debug;

use warden_core::config::cache::MemoryCacheConfig;
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::cache::CacheProvider;

#[derive(Debug, Clone)]
enum Stored {
    Text(String),
    Set(Arc<HashSet<String>>),
}

/// A cached value and the instant it stops being visible.
#[derive(Debug, Clone)]
struct Slot {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Slot {
    fn text(value: &str, ttl: Duration) -> Self {
        Self {
            value: Stored::Text(value.to_string()),
            expires_at: Some(Instant::now() + ttl),
        }
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|at| at.saturating_duration_since(now))
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Hands each slot's own deadline to moka.
struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Slot,
        created_at: Instant,
    ) -> Option<Duration> {
        value.remaining(created_at)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Slot,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.remaining(updated_at)
    }
}

/// In-memory cache provider using moka.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: Cache<String, Slot>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(SlotExpiry)
            .build();

        Self { cache }
    }

    fn wrong_type(key: &str) -> AppError {
        AppError::cache(format!("Key '{key}' holds the wrong kind of value"))
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        match self.cache.get(key).await {
            Some(Slot {
                value: Stored::Text(value),
                ..
            }) => Ok(Some(value)),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.cache
            .insert(key.to_string(), Slot::text(value, ttl))
            .await;
        Ok(())
    }

    async fn set_keep_ttl(&self, key: &str, value: &str) -> AppResult<bool> {
        let result = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) => Op::Put(Slot {
                        value: Stored::Text(value.to_string()),
                        expires_at: entry.into_value().expires_at,
                    }),
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        Ok(self
            .cache
            .get(key)
            .await
            .and_then(|slot| slot.remaining(Instant::now())))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let result = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) => Op::Put(Slot {
                        expires_at: Some(Instant::now() + ttl),
                        ..entry.into_value()
                    }),
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn set_add(&self, key: &str, member: &str) -> AppResult<()> {
        let result = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current.map(|entry| entry.into_value()) {
                    None => Op::Put(Slot {
                        value: Stored::Set(Arc::new(HashSet::from([member.to_string()]))),
                        expires_at: None,
                    }),
                    Some(Slot {
                        value: Stored::Set(members),
                        expires_at,
                    }) => {
                        let mut members = Arc::unwrap_or_clone(members);
                        members.insert(member.to_string());
                        Op::Put(Slot {
                            value: Stored::Set(Arc::new(members)),
                            expires_at,
                        })
                    }
                    Some(_) => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Unchanged(_) => Err(Self::wrong_type(key)),
            _ => Ok(()),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()> {
        let result = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current.map(|entry| entry.into_value()) {
                    Some(Slot {
                        value: Stored::Set(members),
                        expires_at,
                    }) => {
                        let mut members = Arc::unwrap_or_clone(members);
                        members.remove(member);
                        // Redis drops a set once its last member goes.
                        if members.is_empty() {
                            Op::Remove
                        } else {
                            Op::Put(Slot {
                                value: Stored::Set(Arc::new(members)),
                                expires_at,
                            })
                        }
                    }
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Unchanged(_) => Err(Self::wrong_type(key)),
            _ => Ok(()),
        }
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        match self.cache.get(key).await {
            Some(Slot {
                value: Stored::Set(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn scan_keys(&self, pattern: &str, _batch: usize) -> AppResult<Vec<String>> {
        let now = Instant::now();
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, slot)| slot.is_live(now) && glob_matches(pattern, key))
            .map(|(key, _)| key.to_string())
            .collect();
        debug!(pattern, count = keys.len(), "Scanned in-memory keys");
        Ok(keys)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// Match `key` against a pattern whose only wildcard is `*`.
fn glob_matches(pattern: &str, key: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return key.is_empty();
    };
    let Some(mut rest) = key.strip_prefix(first) else {
        return false;
    };
    let segments: Vec<&str> = parts.collect();
    let Some((last, middle)) = segments.split_last() else {
        return rest.is_empty();
    };
    for segment in middle {
        match rest.find(segment) {
            Some(pos) => rest = &rest[pos + segment.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
