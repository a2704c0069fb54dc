//! Integration tests for login, per-request session checks, logout, and
//! inactivity timeout.

mod helpers;

use chrono::Utc;
use uuid::Uuid;

use warden_auth::error::{AuthError, TokenFault};
use warden_auth::jwt::fingerprint;
use warden_core::config::SessionConfig;
use warden_core::error::ErrorKind;
use warden_entity::tenant::TenantStatus;

use helpers::{PASSWORD, TestApp};

#[tokio::test]
async fn test_login_then_start_session() {
    let app = TestApp::new();
    let account = app.create_account("alice@example.com");

    let tokens = app
        .manager
        .login("alice@example.com", PASSWORD)
        .await
        .unwrap();
    assert!(!tokens.access_token.is_empty());
    assert!(!tokens.refresh_token.is_empty());
    assert_eq!(tokens.expires_in, 15 * 60);
    assert_eq!(app.principals.login_count(account.id), 1);

    let claims = app
        .manager
        .start_session(&tokens.access_token, Some("203.0.113.7"), Some("test-agent"))
        .await
        .unwrap();
    assert_eq!(claims.account_id, account.id);
    assert_eq!(claims.tenant_id, account.tenant_id);
    assert_eq!(claims.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(claims.user_agent.as_deref(), Some("test-agent"));
}

#[tokio::test]
async fn test_login_succeeds_when_last_login_stamp_fails() {
    let app = TestApp::new();
    let account = app.create_account("stamp@example.com");
    app.principals.fail_record_login();

    let tokens = app
        .manager
        .login("stamp@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(app.principals.login_count(account.id), 0);

    let claims = app
        .manager
        .start_session(&tokens.access_token, None, None)
        .await
        .unwrap();
    assert_eq!(claims.account_id, account.id);
}

#[tokio::test]
async fn test_login_stores_claims_under_fingerprint() {
    let app = TestApp::new();
    let account = app.create_account("fp@example.com");
    let tokens = app.manager.login("fp@example.com", PASSWORD).await.unwrap();

    let sessions = app.manager.get_sessions(account.id).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].fingerprint, fingerprint(&tokens.access_token));
    assert_eq!(sessions[0].claims.account_id, account.id);
    assert_eq!(app.durable.refresh_len(), 1);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = TestApp::new();
    app.create_account("bob@example.com");

    let wrong_secret = app.manager.login("bob@example.com", "nope").await;
    assert!(matches!(wrong_secret, Err(AuthError::InvalidCredentials)));

    let unknown = app.manager.login("nobody@example.com", PASSWORD).await;
    assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_login_rejects_inactive_account() {
    let app = TestApp::new();
    let tenant = Uuid::new_v4();
    app.tenants.set_status(tenant, TenantStatus::Active);
    app.create_account_in(tenant, "dormant@example.com", false);

    let result = app.manager.login("dormant@example.com", PASSWORD).await;
    assert!(matches!(result, Err(AuthError::AccountInactive)));
    assert_eq!(app.durable.refresh_len(), 0);
}

#[tokio::test]
async fn test_login_rejects_unavailable_tenant() {
    let app = TestApp::new();
    let tenant = Uuid::new_v4();
    app.tenants.set_status(tenant, TenantStatus::Suspended);
    app.create_account_in(tenant, "suspended@example.com", true);

    let result = app.manager.login("suspended@example.com", PASSWORD).await;
    assert!(matches!(result, Err(AuthError::TenantUnavailable)));

    let orphan = app.create_account_in(Uuid::new_v4(), "orphan@example.com", true);
    let result = app.manager.login(&orphan.email, PASSWORD).await;
    assert!(matches!(result, Err(AuthError::TenantUnavailable)));
}

#[tokio::test]
async fn test_start_session_rejects_garbage_token() {
    let app = TestApp::new();
    let result = app.manager.start_session("garbage", None, None).await;
    assert!(matches!(
        result,
        Err(AuthError::InvalidToken(TokenFault::Malformed))
    ));
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::new();
    app.create_account("mix@example.com");
    let tokens = app.manager.login("mix@example.com", PASSWORD).await.unwrap();

    let result = app
        .manager
        .start_session(&tokens.refresh_token, None, None)
        .await;
    assert!(matches!(result, Err(AuthError::InvalidToken(_))));
}

#[tokio::test]
async fn test_logout_then_start_session_fails() {
    let app = TestApp::new();
    let account = app.create_account("carol@example.com");
    let tokens = app
        .manager
        .login("carol@example.com", PASSWORD)
        .await
        .unwrap();

    app.manager
        .logout(account.id, &tokens.access_token)
        .await
        .unwrap();

    let result = app
        .manager
        .start_session(&tokens.access_token, None, None)
        .await;
    assert!(matches!(
        result,
        Err(AuthError::Revoked) | Err(AuthError::SessionNotFound)
    ));
    assert!(result.unwrap_err().is_session_invalid());
    assert!(matches!(
        app.manager.validate_token(&tokens.access_token).await,
        Err(AuthError::Revoked)
    ));
    assert!(app.manager.get_sessions(account.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_logout_succeeds_when_claims_delete_fails() {
    let app = TestApp::new();
    let account = app.create_account("sticky@example.com");
    let tokens = app
        .manager
        .login("sticky@example.com", PASSWORD)
        .await
        .unwrap();

    app.faults.fail("delete");
    app.manager
        .logout(account.id, &tokens.access_token)
        .await
        .unwrap();

    // The claim set survived, but the blacklist still refuses the token.
    assert_eq!(app.manager.get_sessions(account.id).await.unwrap().len(), 1);
    let result = app
        .manager
        .start_session(&tokens.access_token, None, None)
        .await;
    assert!(matches!(result, Err(AuthError::Revoked)));
    assert!(matches!(
        app.manager.validate_token(&tokens.access_token).await,
        Err(AuthError::Revoked)
    ));
}

#[tokio::test]
async fn test_logout_twice_is_harmless() {
    let app = TestApp::new();
    let account = app.create_account("dave@example.com");
    let tokens = app.manager.login("dave@example.com", PASSWORD).await.unwrap();

    app.manager
        .logout(account.id, &tokens.access_token)
        .await
        .unwrap();
    app.manager
        .logout(account.id, &tokens.access_token)
        .await
        .unwrap();
    assert_eq!(app.durable.blacklist_len(), 1);
}

#[tokio::test]
async fn test_concurrent_logouts_both_succeed() {
    let app = TestApp::new();
    let account = app.create_account("race@example.com");
    let tokens = app.manager.login("race@example.com", PASSWORD).await.unwrap();

    let (first, second) = tokio::join!(
        app.manager.logout(account.id, &tokens.access_token),
        app.manager.logout(account.id, &tokens.access_token),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn test_idle_session_times_out_and_stays_dead() {
    let app = TestApp::new();
    app.create_account("erin@example.com");
    let tokens = app.manager.login("erin@example.com", PASSWORD).await.unwrap();

    let stale = Utc::now() - app.idle_timeout() - chrono::Duration::minutes(1);
    app.rewrite_claims(&tokens.access_token, |claims| {
        claims.last_activity = stale;
    })
    .await;

    let first = app
        .manager
        .start_session(&tokens.access_token, None, None)
        .await;
    assert!(matches!(first, Err(AuthError::SessionTimedOut)));

    for _ in 0..2 {
        let again = app
            .manager
            .start_session(&tokens.access_token, None, None)
            .await;
        assert!(again.unwrap_err().is_session_invalid());
    }
}

#[tokio::test]
async fn test_activity_inside_idle_window_keeps_session() {
    let app = TestApp::new();
    app.create_account("frank@example.com");
    let tokens = app.manager.login("frank@example.com", PASSWORD).await.unwrap();

    let recent = Utc::now() - app.idle_timeout() + chrono::Duration::minutes(5);
    app.rewrite_claims(&tokens.access_token, |claims| {
        claims.last_activity = recent;
    })
    .await;

    let claims = app
        .manager
        .start_session(&tokens.access_token, Some("198.51.100.1"), None)
        .await
        .unwrap();
    assert!(claims.last_activity > recent);

    let again = app
        .manager
        .start_session(&tokens.access_token, Some(""), None)
        .await
        .unwrap();
    assert_eq!(again.ip_address.as_deref(), Some("198.51.100.1"));
}

#[tokio::test]
async fn test_start_session_survives_touch_failure() {
    let app = TestApp::new();
    let account = app.create_account("touchy@example.com");
    let tokens = app
        .manager
        .login("touchy@example.com", PASSWORD)
        .await
        .unwrap();

    app.faults.fail("set_keep_ttl");
    let claims = app
        .manager
        .start_session(&tokens.access_token, Some("192.0.2.4"), Some("curl/8.5"))
        .await
        .unwrap();
    assert_eq!(claims.account_id, account.id);
    assert_eq!(claims.ip_address.as_deref(), Some("192.0.2.4"));

    app.faults.heal_all();
    let stored = app.manager.get_sessions(account.id).await.unwrap();
    assert!(stored[0].claims.ip_address.is_none());
}

#[tokio::test]
async fn test_session_mismatch_is_detected() {
    let app = TestApp::new();
    let alice = app.create_account("m1@example.com");
    let mallory = app.create_account("m2@example.com");
    let tokens = app.manager.login("m1@example.com", PASSWORD).await.unwrap();

    app.rewrite_claims(&tokens.access_token, |claims| {
        claims.account_id = mallory.id;
    })
    .await;

    let result = app
        .manager
        .start_session(&tokens.access_token, None, None)
        .await;
    assert!(matches!(result, Err(AuthError::SessionMismatch)));
    assert_ne!(alice.id, mallory.id);
}

#[tokio::test]
async fn test_health_check_reports_both_stores() {
    let app = TestApp::new();
    let report = app.manager.health_check().await;
    assert!(report.durable);
    assert!(report.ephemeral);
    assert!(report.is_healthy());
}

#[tokio::test]
async fn test_zero_sweeper_timeout_is_rejected() {
    let config = SessionConfig {
        sweeper_timeout_seconds: 0,
        ..SessionConfig::default()
    };
    let err = TestApp::try_with_session_config(config)
        .err()
        .expect("config rejected");
    assert_eq!(err.kind, ErrorKind::Configuration);
}
