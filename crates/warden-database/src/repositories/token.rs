//! Refresh-token and blacklist repository.
//!
//! Every method takes a token fingerprint, never the raw token.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_entity::token::{RefreshTokenRecord, RevocationReason};

/// Durable persistence for refresh tokens and revoked access tokens.
#[derive(Debug, Clone)]
pub struct TokenRecordRepository {
    pool: PgPool,
}

impl TokenRecordRepository {
    /// Create a new token record repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a refresh token fingerprint.
    pub async fn store_refresh(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to store refresh token", e)
        })?;
        Ok(())
    }

    /// Find an unexpired refresh token.
    pub async fn find_refresh(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT id, user_id, token_hash, expires_at, created_at FROM refresh_tokens \
             WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to get refresh token", e))
    }

    /// Atomically delete a refresh token and return the removed row.
    ///
    /// Expired rows are removed too; the caller decides what an expired row
    /// means. Of several concurrent callers, at most one gets `Some`.
    pub async fn take_refresh(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "DELETE FROM refresh_tokens WHERE token_hash = $1 \
             RETURNING id, user_id, token_hash, expires_at, created_at",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to consume refresh token", e)
        })
    }

    /// Delete a refresh token. Returns `true` if a row was removed.
    pub async fn delete_refresh(&self, token_hash: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete refresh token", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a revoked access token. A duplicate fingerprint is a no-op.
    pub async fn blacklist(
        &self,
        account_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        reason: RevocationReason,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO blacklisted_tokens (id, user_id, token_hash, expires_at, created_at, reason) \
             VALUES ($1, $2, $3, $4, NOW(), $5) \
             ON CONFLICT (token_hash) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to blacklist token", e))?;
        Ok(())
    }

    /// Whether an unexpired blacklist entry exists for the fingerprint.
    pub async fn is_blacklisted(&self, token_hash: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM blacklisted_tokens \
             WHERE token_hash = $1 AND expires_at > NOW())",
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check token blacklist", e)
        })
    }

    /// Remove every refresh and blacklist row of an account.
    ///
    /// Both deletes run in one transaction. Returns the number of rows removed.
    pub async fn delete_all_for_account(&self, account_id: Uuid) -> AppResult<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let refresh = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    "Failed to delete account refresh tokens",
                    e,
                )
            })?;

        let blacklist = sqlx::query("DELETE FROM blacklisted_tokens WHERE user_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    "Failed to delete account blacklisted tokens",
                    e,
                )
            })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit token purge", e)
        })?;

        Ok(refresh.rows_affected() + blacklist.rows_affected())
    }

    /// Delete refresh tokens past their expiry.
    pub async fn delete_expired_refresh(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    "Failed to delete expired refresh tokens",
                    e,
                )
            })?;
        let rows = result.rows_affected();
        if rows > 0 {
            info!(rows, "Cleaned up expired refresh tokens");
        }
        Ok(rows)
    }

    /// Delete blacklist entries past their expiry.
    pub async fn delete_expired_blacklist(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM blacklisted_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    "Failed to delete expired blacklisted tokens",
                    e,
                )
            })?;
        let rows = result.rows_affected();
        if rows > 0 {
            info!(rows, "Cleaned up expired blacklisted tokens");
        }
        Ok(rows)
    }

    /// Round-trip a trivial query to confirm the pool is usable.
    pub async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|one| one == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Database health check failed", e))
    }
}
