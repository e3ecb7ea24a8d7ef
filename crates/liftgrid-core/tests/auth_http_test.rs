use std::sync::Arc;

use chrono::{Duration, Utc};
use liftgrid_core::auth::{
    AccessToken, AuthError, AuthFailure, AuthResult, AuthState, Credential, CredentialManager,
    CredentialStore, ManualSurface, OAuthClient, OAuthConfig, SqliteCredentialStore, TokenSource,
    loopback_redirect_uri,
};
use liftgrid_test_utils::{FakeGoogle, create_test_pool};

fn config(fake: &FakeGoogle) -> OAuthConfig {
    OAuthConfig {
        token_url: fake.token_url(),
        revoke_url: Some(fake.revoke_url()),
        auth_url: format!("{}/auth", fake.base_url()),
        ..OAuthConfig::google("client-id", Some("secret".into()))
    }
}

async fn manager_with(
    fake: &FakeGoogle,
    store: Arc<SqliteCredentialStore>,
) -> CredentialManager {
    let config = config(fake);
    CredentialManager::new(
        config.clone(),
        Arc::new(OAuthClient::new(reqwest::Client::new(), config)),
        store,
        Arc::new(ManualSurface::new(loopback_redirect_uri(8085))),
    )
}

#[tokio::test]
async fn manual_code_flow_persists_to_sqlite() {
    let fake = FakeGoogle::start().await;
    let store = Arc::new(SqliteCredentialStore::new(create_test_pool().await));
    let manager = manager_with(&fake, store.clone()).await;

    let first = manager.authenticate().await.unwrap();
    assert!(matches!(
        first,
        AuthResult::Failed(AuthFailure::RedirectRequired { ref auth_url }) if auth_url.contains("client_id=client-id")
    ));

    let result = manager.handle_auth_code("pasted-code").await.unwrap();
    assert!(matches!(
        result,
        AuthResult::Authorized {
            source: TokenSource::Exchanged,
            ..
        }
    ));
    assert_eq!(fake.code_exchanges(), 1);

    let persisted = store.load().await.expect("credential persisted");
    assert_eq!(persisted.refresh_token.as_deref(), Some("fake-refresh-token"));
    assert!(persisted.is_valid());
}

#[tokio::test]
async fn second_process_reuses_cached_credential() {
    let fake = FakeGoogle::start().await;
    let pool = create_test_pool().await;

    let first = manager_with(&fake, Arc::new(SqliteCredentialStore::new(pool.clone()))).await;
    first.handle_auth_code("code").await.unwrap();

    let second = manager_with(&fake, Arc::new(SqliteCredentialStore::new(pool))).await;
    let token = second.get_valid_token().await.unwrap();
    assert_eq!(token.secret(), "fake-access-1");
    assert_eq!(second.state(), AuthState::Authorized);
    assert_eq!(fake.refreshes(), 0);
}

#[tokio::test]
async fn expired_cache_is_refreshed_over_http() {
    let fake = FakeGoogle::start().await;
    let store = Arc::new(SqliteCredentialStore::new(create_test_pool().await));
    store
        .save(&Credential {
            access_token: AccessToken::new("old"),
            refresh_token: Some("cached-refresh".into()),
            expiry: Utc::now() - Duration::minutes(10),
        })
        .await
        .unwrap();

    let manager = manager_with(&fake, store.clone()).await;
    let result = manager.authenticate().await.unwrap();
    assert!(matches!(
        result,
        AuthResult::Authorized {
            source: TokenSource::Refreshed,
            ..
        }
    ));
    assert_eq!(fake.refreshes(), 1);

    let persisted = store.load().await.unwrap();
    assert_eq!(persisted.access_token.secret(), "fake-access-1");
    assert_eq!(persisted.refresh_token.as_deref(), Some("cached-refresh"));
}

#[tokio::test]
async fn rotated_refresh_token_is_stored() {
    let fake = FakeGoogle::start().await;
    fake.rotate_refresh_token("rotated");
    let store = Arc::new(SqliteCredentialStore::new(create_test_pool().await));
    store
        .save(&Credential {
            access_token: AccessToken::new("old"),
            refresh_token: Some("cached-refresh".into()),
            expiry: Utc::now() - Duration::minutes(10),
        })
        .await
        .unwrap();

    let manager = manager_with(&fake, store.clone()).await;
    manager.refresh().await.unwrap();
    assert_eq!(
        store.load().await.unwrap().refresh_token.as_deref(),
        Some("rotated")
    );
}

#[tokio::test]
async fn provider_denial_on_exchange_is_classified() {
    let fake = FakeGoogle::start().await;
    fake.reject_tokens(400, r#"{"error":"access_denied","error_description":"denied"}"#);
    let store = Arc::new(SqliteCredentialStore::new(create_test_pool().await));
    let manager = manager_with(&fake, store.clone()).await;

    let result = manager.handle_auth_code("code").await.unwrap();
    assert_eq!(result, AuthResult::Failed(AuthFailure::AccessDenied));
    assert_eq!(manager.state(), AuthState::Unauthenticated);
    assert!(store.load().await.is_none());
}

#[tokio::test]
async fn unreachable_token_endpoint_is_transport_error() {
    let fake = FakeGoogle::start().await;
    let mut config = config(&fake);
    // Nothing listens on port 9 of the loopback interface.
    config.token_url = "http://127.0.0.1:9/token".into();
    let manager = CredentialManager::new(
        config.clone(),
        Arc::new(OAuthClient::new(reqwest::Client::new(), config)),
        Arc::new(SqliteCredentialStore::new(create_test_pool().await)),
        Arc::new(ManualSurface::new(loopback_redirect_uri(8085))),
    );

    let err = manager.handle_auth_code("code").await.unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)), "got {err:?}");
    assert_eq!(manager.state(), AuthState::Unauthenticated);
}

#[tokio::test]
async fn logout_revokes_and_clears() {
    let fake = FakeGoogle::start().await;
    let store = Arc::new(SqliteCredentialStore::new(create_test_pool().await));
    let manager = manager_with(&fake, store.clone()).await;
    manager.handle_auth_code("code").await.unwrap();

    manager.logout().await.unwrap();
    assert_eq!(fake.revocations(), 1);
    assert!(store.load().await.is_none());
    assert!(matches!(
        manager.get_valid_token().await,
        Err(AuthError::ReauthorizationRequired)
    ));
}
