//! Integration tests for refresh token rotation and account revocation.

mod helpers;

use chrono::{Duration, Utc};
use futures::future::join_all;

use warden_auth::error::AuthError;
use warden_auth::jwt::fingerprint;
use warden_auth::store::DurableTokenStore;
use warden_entity::tenant::TenantStatus;

use helpers::{PASSWORD, TestApp};

#[tokio::test]
async fn test_refresh_issues_new_pair() {
    let app = TestApp::new();
    let account = app.create_account("r1@example.com");
    let first = app.manager.login("r1@example.com", PASSWORD).await.unwrap();

    let second = app.manager.refresh(&first.refresh_token).await.unwrap();
    assert_ne!(second.access_token, first.access_token);
    assert_ne!(second.refresh_token, first.refresh_token);

    let claims = app
        .manager
        .start_session(&second.access_token, None, None)
        .await
        .unwrap();
    assert_eq!(claims.account_id, account.id);
    assert_eq!(app.durable.refresh_len(), 1);
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let app = TestApp::new();
    app.create_account("r2@example.com");
    let tokens = app.manager.login("r2@example.com", PASSWORD).await.unwrap();

    app.manager.refresh(&tokens.refresh_token).await.unwrap();
    for _ in 0..2 {
        let reuse = app.manager.refresh(&tokens.refresh_token).await;
        assert!(matches!(reuse, Err(AuthError::InvalidRefreshToken)));
    }
}

#[tokio::test]
async fn test_concurrent_refresh_has_one_winner() {
    let app = TestApp::new();
    app.create_account("r3@example.com");
    let tokens = app.manager.login("r3@example.com", PASSWORD).await.unwrap();

    let results = join_all((0..8).map(|_| app.manager.refresh(&tokens.refresh_token))).await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AuthError::InvalidRefreshToken))
    );
}

#[tokio::test]
async fn test_concurrent_refresh_across_tasks() {
    let app = TestApp::new();
    app.create_account("r4@example.com");
    let tokens = app.manager.login("r4@example.com", PASSWORD).await.unwrap();

    let a = tokio::spawn({
        let manager = app.manager.clone();
        let token = tokens.refresh_token.clone();
        async move { manager.refresh(&token).await }
    });
    let b = tokio::spawn({
        let manager = app.manager.clone();
        let token = tokens.refresh_token.clone();
        async move { manager.refresh(&token).await }
    });

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
}

#[tokio::test]
async fn test_expired_refresh_token_is_rejected_and_consumed() {
    let app = TestApp::new();
    let account = app.create_account("stale@example.com");

    let (stale, _) = app
        .encoder()
        .issue_refresh(account.id, Utc::now() - Duration::days(8))
        .unwrap();
    app.durable
        .store_refresh(account.id, &fingerprint(&stale), Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(app.durable.refresh_len(), 1);

    let result = app.manager.refresh(&stale).await;
    assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    assert_eq!(app.durable.refresh_len(), 0);
    assert!(app.manager.get_sessions(account.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let app = TestApp::new();
    app.create_account("r5@example.com");
    let tokens = app.manager.login("r5@example.com", PASSWORD).await.unwrap();

    let result = app.manager.refresh(&tokens.access_token).await;
    assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    assert!(app.manager.refresh(&tokens.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_refresh_rechecks_account_and_tenant() {
    let app = TestApp::new();
    let account = app.create_account("r6@example.com");
    let tokens = app.manager.login("r6@example.com", PASSWORD).await.unwrap();

    app.tenants
        .set_status(account.tenant_id, TenantStatus::Canceled);
    let result = app.manager.refresh(&tokens.refresh_token).await;
    assert!(matches!(result, Err(AuthError::TenantUnavailable)));

    app.tenants.set_status(account.tenant_id, TenantStatus::Active);
    let tokens = app.manager.login("r6@example.com", PASSWORD).await.unwrap();
    app.principals.set_active(account.id, false);
    let result = app.manager.refresh(&tokens.refresh_token).await;
    assert!(matches!(result, Err(AuthError::AccountInactive)));
}

#[tokio::test]
async fn test_revoke_account_kills_everything() {
    let app = TestApp::new();
    let account = app.create_account("r7@example.com");
    let other = app.create_account("bystander@example.com");

    let first = app.manager.login("r7@example.com", PASSWORD).await.unwrap();
    let second = app.manager.login("r7@example.com", PASSWORD).await.unwrap();
    let bystander = app
        .manager
        .login("bystander@example.com", PASSWORD)
        .await
        .unwrap();
    app.manager
        .logout(account.id, &first.access_token)
        .await
        .unwrap();

    let ended = app.manager.revoke_account(account.id).await.unwrap();
    assert_eq!(ended, 1);

    for access in [&first.access_token, &second.access_token] {
        let result = app.manager.start_session(access, None, None).await;
        assert!(result.unwrap_err().is_session_invalid());
    }
    for refresh in [&first.refresh_token, &second.refresh_token] {
        let result = app.manager.refresh(refresh).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }
    assert!(app.manager.get_sessions(account.id).await.unwrap().is_empty());

    let claims = app
        .manager
        .start_session(&bystander.access_token, None, None)
        .await
        .unwrap();
    assert_eq!(claims.account_id, other.id);
}

#[tokio::test]
async fn test_failed_revoke_keeps_logged_out_token_revoked() {
    let app = TestApp::new();
    let account = app.create_account("r9@example.com");
    let tokens = app.manager.login("r9@example.com", PASSWORD).await.unwrap();

    // Logout leaves the claim set behind; only the blacklist row refuses it.
    app.faults.fail("delete");
    app.manager
        .logout(account.id, &tokens.access_token)
        .await
        .unwrap();

    app.faults.fail("set_members");
    assert!(app.manager.revoke_account(account.id).await.is_err());
    app.faults.heal_all();

    assert_eq!(app.durable.blacklist_len(), 1);
    assert_eq!(app.durable.refresh_len(), 1);
    let result = app
        .manager
        .start_session(&tokens.access_token, None, None)
        .await;
    assert!(matches!(result, Err(AuthError::Revoked)));
}

#[tokio::test]
async fn test_sweeper_run_once_over_live_state() {
    let app = TestApp::new();
    let account = app.create_account("r8@example.com");
    let tokens = app.manager.login("r8@example.com", PASSWORD).await.unwrap();

    let sweeper = warden_auth::session::RetentionSweeper::new(
        app.manager.tokens().clone(),
        &app.session_config,
    );
    let report = sweeper.run_once().await;
    assert_eq!(report.failures, 0);
    assert_eq!(report.refresh_removed, 0);
    assert_eq!(report.orphans_removed, 0);

    let claims = app
        .manager
        .start_session(&tokens.access_token, None, None)
        .await
        .unwrap();
    assert_eq!(claims.account_id, account.id);
}
