//! Integration tests for listing and terminating an account's sessions.

mod helpers;

use warden_auth::error::AuthError;
use warden_auth::jwt::fingerprint;

use helpers::{PASSWORD, TestApp};

async fn login_n(app: &TestApp, email: &str, n: usize) -> Vec<warden_entity::token::AuthTokens> {
    let mut tokens = Vec::with_capacity(n);
    for _ in 0..n {
        tokens.push(app.manager.login(email, PASSWORD).await.unwrap());
    }
    tokens
}

#[tokio::test]
async fn test_get_sessions_lists_every_device() {
    let app = TestApp::new();
    let account = app.create_account("inv1@example.com");
    let tokens = login_n(&app, "inv1@example.com", 3).await;

    let sessions = app.manager.get_sessions(account.id).await.unwrap();
    assert_eq!(sessions.len(), 3);
    for t in &tokens {
        let fp = fingerprint(&t.access_token);
        assert!(sessions.iter().any(|s| s.fingerprint == fp));
    }
    assert!(sessions.iter().all(|s| s.claims.account_id == account.id));
}

#[tokio::test]
async fn test_terminate_session_ends_only_that_session() {
    let app = TestApp::new();
    let account = app.create_account("inv2@example.com");
    let tokens = login_n(&app, "inv2@example.com", 2).await;

    app.manager
        .terminate_session(account.id, &fingerprint(&tokens[0].access_token))
        .await
        .unwrap();

    let ended = app
        .manager
        .start_session(&tokens[0].access_token, None, None)
        .await;
    assert!(matches!(ended, Err(AuthError::SessionNotFound)));
    assert!(app
        .manager
        .start_session(&tokens[1].access_token, None, None)
        .await
        .is_ok());

    let again = app
        .manager
        .terminate_session(account.id, &fingerprint(&tokens[0].access_token))
        .await;
    assert!(matches!(again, Err(AuthError::SessionNotFound)));
}

#[tokio::test]
async fn test_terminate_session_refuses_foreign_session() {
    let app = TestApp::new();
    let owner = app.create_account("owner@example.com");
    let intruder = app.create_account("intruder@example.com");
    let tokens = app.manager.login("owner@example.com", PASSWORD).await.unwrap();
    let fp = fingerprint(&tokens.access_token);

    let result = app.manager.terminate_session(intruder.id, &fp).await;
    assert!(matches!(result, Err(AuthError::SessionMismatch)));

    assert_eq!(app.manager.get_sessions(owner.id).await.unwrap().len(), 1);
    assert!(app
        .manager
        .start_session(&tokens.access_token, None, None)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_terminate_all_keeps_current_session() {
    let app = TestApp::new();
    let account = app.create_account("inv3@example.com");
    let tokens = login_n(&app, "inv3@example.com", 4).await;
    let keep = fingerprint(&tokens[2].access_token);

    let removed = app
        .manager
        .terminate_all_sessions(account.id, Some(keep.as_str()))
        .await
        .unwrap();
    assert_eq!(removed, 3);

    let sessions = app.manager.get_sessions(account.id).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].fingerprint, keep);

    for (i, t) in tokens.iter().enumerate() {
        let result = app.manager.start_session(&t.access_token, None, None).await;
        assert_eq!(result.is_ok(), i == 2, "session {i}");
    }
}

#[tokio::test]
async fn test_terminate_all_without_keep_clears_everything() {
    let app = TestApp::new();
    let account = app.create_account("inv4@example.com");
    let neighbour = app.create_account("inv5@example.com");
    login_n(&app, "inv4@example.com", 3).await;
    login_n(&app, "inv5@example.com", 1).await;

    let removed = app
        .manager
        .terminate_all_sessions(account.id, None)
        .await
        .unwrap();
    assert_eq!(removed, 3);
    assert!(app.manager.get_sessions(account.id).await.unwrap().is_empty());
    assert_eq!(app.manager.get_sessions(neighbour.id).await.unwrap().len(), 1);

    let removed = app
        .manager
        .terminate_all_sessions(account.id, None)
        .await
        .unwrap();
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn test_refresh_after_terminate_still_rotates() {
    let app = TestApp::new();
    let account = app.create_account("inv6@example.com");
    let tokens = app.manager.login("inv6@example.com", PASSWORD).await.unwrap();

    app.manager
        .terminate_all_sessions(account.id, None)
        .await
        .unwrap();

    let next = app.manager.refresh(&tokens.refresh_token).await.unwrap();
    assert!(app
        .manager
        .start_session(&next.access_token, None, None)
        .await
        .is_ok());
    assert_eq!(app.manager.get_sessions(account.id).await.unwrap().len(), 1);
}
