//! Cache provider trait for pluggable ephemeral-store backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for ephemeral-store backends (Redis or in-memory).
///
/// All values are serialized as strings (JSON). The cache provider
/// is responsible for key prefixing and TTL enforcement. Keys passed in
/// and returned from [`CacheProvider::scan_keys`] are always unprefixed.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Overwrite an existing value without touching its remaining TTL.
    ///
    /// Returns `false` when the key is absent or already expired; nothing
    /// is written in that case.
    async fn set_keep_ttl(&self, key: &str, value: &str) -> AppResult<bool>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether a key exists in the cache.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Remaining lifetime of a key. `None` if the key is absent or has no expiry.
    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>>;

    /// Set the TTL on an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// Add a member to the set stored at `key`, creating it if needed.
    async fn set_add(&self, key: &str, member: &str) -> AppResult<()>;

    /// Remove a member from the set stored at `key`.
    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()>;

    /// All members of the set stored at `key`. Empty if the set is absent.
    async fn set_members(&self, key: &str) -> AppResult<Vec<String>>;

    /// All live keys matching a glob pattern (only `*` wildcards), fetched
    /// `batch` keys per round trip.
    async fn scan_keys(&self, pattern: &str, batch: usize) -> AppResult<Vec<String>>;

    /// Check that the cache backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
