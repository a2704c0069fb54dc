//! Shared test helpers for integration tests.
//!
//! Everything runs in process: the in-memory cache provider, the in-memory
//! durable store, and dashmap-backed account and tenant collaborators.
//! The cache and the account store can be told to fail chosen calls.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use warden_auth::jwt::{ClaimSet, JwtEncoder, fingerprint};
use warden_auth::password::PasswordHasher;
use warden_auth::principal::{PrincipalStore, TenantGate};
use warden_auth::session::SessionManager;
use warden_auth::store::{MemoryDurableStore, SessionStore, TokenRepository};
use warden_cache::CacheManager;
use warden_cache::keys;
use warden_cache::memory::MemoryCacheProvider;
use warden_core::config::{AuthConfig, MemoryCacheConfig, SessionConfig};
use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_core::traits::CacheProvider;
use warden_entity::account::{Account, AccountRole};
use warden_entity::tenant::TenantStatus;

/// Password used for every seeded account.
pub const PASSWORD: &str = "correct horse battery staple";

const SECRET: &str = "integration-test-secret-0123456789abcdef";

/// In-memory cache that fails the operations it is told to.
#[derive(Debug)]
pub struct FaultyCache {
    inner: MemoryCacheProvider,
    failing: DashSet<&'static str>,
}

impl FaultyCache {
    fn new() -> Self {
        Self {
            inner: MemoryCacheProvider::new(&MemoryCacheConfig::default()),
            failing: DashSet::new(),
        }
    }

    /// Make every call to `op` fail until healed.
    pub fn fail(&self, op: &'static str) {
        self.failing.insert(op);
    }

    /// Let every operation through again.
    pub fn heal_all(&self) {
        self.failing.clear();
    }

    fn check(&self, op: &'static str) -> AppResult<()> {
        if self.failing.contains(op) {
            Err(AppError::cache(format!("cache {op} unavailable")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheProvider for FaultyCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.check("get")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.check("set")?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_keep_ttl(&self, key: &str, value: &str) -> AppResult<bool> {
        self.check("set_keep_ttl")?;
        self.inner.set_keep_ttl(key, value).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.check("delete")?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.check("exists")?;
        self.inner.exists(key).await
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        self.check("ttl")?;
        self.inner.ttl(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.check("expire")?;
        self.inner.expire(key, ttl).await
    }

    async fn set_add(&self, key: &str, member: &str) -> AppResult<()> {
        self.check("set_add")?;
        self.inner.set_add(key, member).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()> {
        self.check("set_remove")?;
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        self.check("set_members")?;
        self.inner.set_members(key).await
    }

    async fn scan_keys(&self, pattern: &str, batch: usize) -> AppResult<Vec<String>> {
        self.check("scan_keys")?;
        self.inner.scan_keys(pattern, batch).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.check("health_check")?;
        self.inner.health_check().await
    }
}

/// In-memory accounts keyed by id.
#[derive(Debug, Default)]
pub struct MemoryPrincipals {
    accounts: DashMap<Uuid, Account>,
    logins: DashMap<Uuid, u32>,
    fail_record_login: AtomicBool,
}

impl MemoryPrincipals {
    /// Successful logins recorded for an account.
    pub fn login_count(&self, id: Uuid) -> u32 {
        self.logins.get(&id).map(|n| *n).unwrap_or(0)
    }

    /// Make `record_login` fail from now on.
    pub fn fail_record_login(&self) {
        self.fail_record_login.store(true, Ordering::SeqCst);
    }

    /// Flip an account's active flag.
    pub fn set_active(&self, id: Uuid, active: bool) {
        if let Some(mut account) = self.accounts.get_mut(&id) {
            account.is_active = active;
        }
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipals {
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.email.eq_ignore_ascii_case(identifier))
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        if self.fail_record_login.load(Ordering::SeqCst) {
            return Err(AppError::new(ErrorKind::Database, "users table locked"));
        }
        *self.logins.entry(id).or_insert(0) += 1;
        Ok(())
    }
}

/// In-memory tenant statuses.
#[derive(Debug, Default)]
pub struct MemoryTenants {
    statuses: DashMap<Uuid, TenantStatus>,
}

impl MemoryTenants {
    /// Set a tenant's status.
    pub fn set_status(&self, id: Uuid, status: TenantStatus) {
        self.statuses.insert(id, status);
    }
}

#[async_trait]
impl TenantGate for MemoryTenants {
    async fn can_access(&self, tenant_id: Uuid) -> AppResult<bool> {
        Ok(self
            .statuses
            .get(&tenant_id)
            .is_some_and(|status| status.can_access()))
    }
}

/// A session manager wired over in-memory stores.
pub struct TestApp {
    /// The manager under test.
    pub manager: SessionManager,
    /// Ephemeral store, for inspecting or rewriting claim sets.
    pub cache: Arc<CacheManager>,
    /// The cache provider underneath, for injecting failures.
    pub faults: Arc<FaultyCache>,
    /// Durable store, for inspecting rows.
    pub durable: Arc<MemoryDurableStore>,
    /// Account collaborator.
    pub principals: Arc<MemoryPrincipals>,
    /// Tenant collaborator.
    pub tenants: Arc<MemoryTenants>,
    /// Session configuration in effect.
    pub session_config: SessionConfig,
}

impl TestApp {
    /// Create a new test application with default session settings.
    pub fn new() -> Self {
        Self::with_session_config(SessionConfig::default())
    }

    /// Create a new test application with custom session settings.
    pub fn with_session_config(session_config: SessionConfig) -> Self {
        Self::try_with_session_config(session_config).expect("valid session manager config")
    }

    /// Create a new test application, surfacing configuration errors.
    pub fn try_with_session_config(session_config: SessionConfig) -> AppResult<Self> {
        let faults = Arc::new(FaultyCache::new());
        let cache = Arc::new(CacheManager::from_provider(faults.clone()));
        let durable = Arc::new(MemoryDurableStore::new());
        let sessions = SessionStore::new(
            Arc::clone(&cache),
            session_config.index_grace(),
            session_config.sweeper_batch_size,
        );
        let tokens = Arc::new(TokenRepository::new(durable.clone(), sessions));
        let principals = Arc::new(MemoryPrincipals::default());
        let tenants = Arc::new(MemoryTenants::default());

        let manager = SessionManager::new(
            tokens,
            principals.clone(),
            tenants.clone(),
            AuthConfig::with_secret(SECRET),
            session_config.clone(),
        )?;

        Ok(Self {
            manager,
            cache,
            faults,
            durable,
            principals,
            tenants,
            session_config,
        })
    }

    /// Seed an account in a fresh active tenant.
    pub fn create_account(&self, email: &str) -> Account {
        let tenant_id = Uuid::new_v4();
        self.tenants.set_status(tenant_id, TenantStatus::Active);
        self.create_account_in(tenant_id, email, true)
    }

    /// Seed an account in the given tenant.
    pub fn create_account_in(&self, tenant_id: Uuid, email: &str, active: bool) -> Account {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            tenant_id,
            email: email.to_string(),
            password_hash: PasswordHasher::new()
                .hash_password(PASSWORD)
                .expect("hash password"),
            first_name: "Test".to_string(),
            last_name: "Account".to_string(),
            role: AccountRole::Member,
            is_active: active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.principals.accounts.insert(account.id, account.clone());
        account
    }

    /// Overwrite the stored claim set of an access token, keeping its TTL.
    pub async fn rewrite_claims(&self, access_token: &str, edit: impl FnOnce(&mut ClaimSet)) {
        let key = keys::session_claims(&fingerprint(access_token));
        let mut claims: ClaimSet = self
            .cache
            .get_json(&key)
            .await
            .expect("read claims")
            .expect("claims present");
        edit(&mut claims);
        assert!(self.cache.replace_json(&key, &claims).await.expect("write claims"));
    }

    /// An encoder signing with the manager's secret, for minting tokens
    /// the manager would not issue itself.
    pub fn encoder(&self) -> JwtEncoder {
        JwtEncoder::new(&AuthConfig::with_secret(SECRET)).expect("valid auth config")
    }

    /// Idle cutoff in effect, as a chrono duration.
    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_config.idle_timeout()).expect("idle timeout")
    }

    /// Absolute session lifetime in effect.
    pub fn absolute_timeout(&self) -> Duration {
        self.session_config.absolute_timeout()
    }
}
