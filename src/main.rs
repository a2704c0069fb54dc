//! Warden Server — session and token core for multi-tenant services
//!
//! Main entry point that wires the stores together, starts the retention
//! sweeper, and runs until a shutdown signal arrives.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use warden_auth::principal::{PrincipalStore, TenantGate};
use warden_auth::session::SessionManager;
use warden_auth::store::{DurableTokenStore, SessionStore, TokenRepository};
use warden_cache::CacheManager;
use warden_core::config::AppConfig;
use warden_core::error::AppError;
use warden_database::DatabasePool;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("WARDEN_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Warden");

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;
    warden_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Initialize cache ─────────────────────────────────
    tracing::info!(provider = %config.cache.provider, "Initializing cache");
    let cache = Arc::new(CacheManager::new(&config.cache).await?);

    // ── Step 3: Token stores ─────────────────────────────────────
    let durable: Arc<dyn DurableTokenStore> = Arc::new(db.token_records());
    let sessions = SessionStore::new(
        Arc::clone(&cache),
        config.session.index_grace(),
        config.session.sweeper_batch_size,
    );
    let tokens = Arc::new(TokenRepository::new(durable, sessions));

    // ── Step 4: Principal store and tenant gate ──────────────────
    let principals: Arc<dyn PrincipalStore> = Arc::new(db.accounts());
    let tenants: Arc<dyn TenantGate> = Arc::new(db.tenants());

    // ── Step 5: Session manager ──────────────────────────────────
    let session_manager = SessionManager::new(
        tokens,
        principals,
        tenants,
        config.auth.clone(),
        config.session.clone(),
    )?;

    let health = session_manager.health_check().await;
    if !health.is_healthy() {
        return Err(AppError::service_unavailable(format!(
            "Store health check failed (durable: {}, ephemeral: {})",
            health.durable, health.ephemeral
        )));
    }

    // ── Step 6: Retention sweeper ────────────────────────────────
    let sweeper = session_manager.start_sweeper();
    tracing::info!("Warden ready");

    // ── Step 7: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    sweeper.shutdown().await;
    db.close().await;

    tracing::info!("Warden shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
