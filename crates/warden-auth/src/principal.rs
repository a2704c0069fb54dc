//! Seams to the account and tenant collaborators.
//!
//! The session manager only needs to look accounts up, stamp logins, and
//! ask whether a tenant may be served. Postgres-backed implementations live
//! here; tests supply their own.

use async_trait::async_trait;
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_database::repositories::account::AccountRepository;
use warden_database::repositories::tenant::TenantRepository;
use warden_entity::account::Account;

/// Account lookup used by login and refresh.
#[async_trait]
pub trait PrincipalStore: Send + Sync + std::fmt::Debug {
    /// Find an account by its login identifier.
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<Account>>;

    /// Find an account by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Record a successful login.
    async fn record_login(&self, id: Uuid) -> AppResult<()>;
}

/// Tenant status check used by login and refresh.
#[async_trait]
pub trait TenantGate: Send + Sync + std::fmt::Debug {
    /// Whether the tenant may currently be served. Unknown tenants may not.
    async fn can_access(&self, tenant_id: Uuid) -> AppResult<bool>;
}

#[async_trait]
impl PrincipalStore for AccountRepository {
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<Account>> {
        self.find_by_email(identifier).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        AccountRepository::find_by_id(self, id).await
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        self.update_last_login(id).await
    }
}

#[async_trait]
impl TenantGate for TenantRepository {
    async fn can_access(&self, tenant_id: Uuid) -> AppResult<bool> {
        Ok(self
            .find_status(tenant_id)
            .await?
            .is_some_and(|status| status.can_access()))
    }
}
