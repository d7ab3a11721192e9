//! Session lifecycle tests against a fake backend.
//!
//! These tests verify that:
//! 1. Bootstrap restores a session from a valid stored token
//! 2. Bootstrap discards a token the backend does not accept
//! 3. Login and register store the issued token and never touch the store on failure
//! 4. Logout always ends anonymous with an empty store
//! 5. Session mutations are serialized

use std::time::Duration;

use axum::{
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use learngenix_core::models::{Role, UserIdentity};
use learngenix_core::{MemoryTokenStore, SessionError, SessionState, TokenStore};
use serde_json::json;

mod common;

use common::{ana_json, route, session, spawn_backend, Recorder};

/// Backend whose `/auth/me` answers with `status` and `body`.
fn me_router(recorder: Recorder, status: StatusCode, body: &'static str) -> Router {
    Router::new().route(
        &route("/auth/me"),
        get(move |method: Method, uri: Uri, headers: HeaderMap| {
            let recorder = recorder.clone();
            async move {
                recorder.record(&method, &uri, &headers, "");
                (status, [("content-type", "application/json")], body)
            }
        }),
    )
}

/// Backend with a login endpoint that accepts `ana@x.com` / `secret`.
fn login_router(recorder: Recorder, token: &'static str, delay: Duration) -> Router {
    Router::new().route(
        &route("/auth/login"),
        post(move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
            let recorder = recorder.clone();
            async move {
                recorder.record(&method, &uri, &headers, &body);
                tokio::time::sleep(delay).await;
                if body.contains("username=ana%40x.com") && body.contains("password=secret") {
                    Json(json!({
                        "access_token": token,
                        "token_type": "bearer",
                        "user": ana_json()
                    }))
                    .into_response()
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"detail": "Invalid credentials"})),
                    )
                        .into_response()
                }
            }
        }),
    )
}

fn register_router(recorder: Recorder) -> Router {
    Router::new().route(
        &route("/auth/register"),
        post(move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
            let recorder = recorder.clone();
            async move {
                recorder.record(&method, &uri, &headers, &body);
                let request: serde_json::Value = match serde_json::from_str(&body) {
                    Ok(v) => v,
                    Err(_) => return StatusCode::UNPROCESSABLE_ENTITY.into_response(),
                };
                if request["email"] == "taken@x.com" {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"detail": "El email ya está registrado"})),
                    )
                        .into_response();
                }
                Json(json!({
                    "access_token": "tok123",
                    "token_type": "bearer",
                    "user": {
                        "id": "2",
                        "name": request["name"],
                        "email": request["email"],
                        "role": request["role"]
                    }
                }))
                .into_response()
            }
        }),
    )
}

#[tokio::test]
async fn test_bootstrap_restores_identity_from_stored_token() {
    let recorder = Recorder::default();
    let body = r#"{"id":"1","name":"Ana","email":"ana@x.com","role":"student"}"#;
    let base = spawn_backend(me_router(recorder.clone(), StatusCode::OK, body)).await;
    let (manager, store) = session(&base, MemoryTokenStore::with_token("stored-token"));

    assert!(manager.is_loading());
    let state = manager.bootstrap().await;

    let expected = UserIdentity::new("1", "Ana", "ana@x.com", Role::Student);
    assert_eq!(state, SessionState::Authenticated(expected.clone()));
    assert_eq!(manager.current_user(), Some(expected));
    assert!(!manager.is_loading());
    assert_eq!(store.get().unwrap().as_deref(), Some("stored-token"));
    assert_eq!(
        recorder.last().authorization.as_deref(),
        Some("Bearer stored-token")
    );
}

#[tokio::test]
async fn test_bootstrap_with_rejected_token_purges_it() {
    let recorder = Recorder::default();
    let base = spawn_backend(me_router(
        recorder.clone(),
        StatusCode::UNAUTHORIZED,
        r#"{"detail":"Could not validate credentials"}"#,
    ))
    .await;
    let (manager, store) = session(&base, MemoryTokenStore::with_token("expired"));

    assert_eq!(manager.bootstrap().await, SessionState::Anonymous);
    assert_eq!(store.get().unwrap(), None);
    assert_eq!(recorder.count(), 1);

    // Nothing stored now, so a second bootstrap stays local
    assert_eq!(manager.bootstrap().await, SessionState::Anonymous);
    assert_eq!(recorder.count(), 1);
}

#[tokio::test]
async fn test_bootstrap_with_malformed_identity_purges_token() {
    let recorder = Recorder::default();
    let base = spawn_backend(me_router(
        recorder.clone(),
        StatusCode::OK,
        r#"{"id":"1","name":"Ana"}"#,
    ))
    .await;
    let (manager, store) = session(&base, MemoryTokenStore::with_token("tok"));

    assert_eq!(manager.bootstrap().await, SessionState::Anonymous);
    assert_eq!(store.get().unwrap(), None);
}

#[tokio::test]
async fn test_bootstrap_without_token_skips_backend() {
    let recorder = Recorder::default();
    let base = spawn_backend(me_router(recorder.clone(), StatusCode::OK, "{}")).await;
    let (manager, store) = session(&base, MemoryTokenStore::new());

    assert_eq!(manager.bootstrap().await, SessionState::Anonymous);
    assert_eq!(store.get().unwrap(), None);
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn test_login_stores_returned_token() {
    let recorder = Recorder::default();
    let base = spawn_backend(login_router(recorder.clone(), "fresh-token", Duration::ZERO)).await;
    let (manager, store) = session(&base, MemoryTokenStore::new());
    manager.bootstrap().await;

    let user = manager.login("ana@x.com", "secret").await.unwrap();

    assert_eq!(user.name, "Ana");
    assert_eq!(store.get().unwrap().as_deref(), Some("fresh-token"));
    assert_eq!(manager.state(), SessionState::Authenticated(user));

    let request = recorder.last();
    assert_eq!(request.method, Method::POST);
    assert_eq!(
        request.content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(request.body, "username=ana%40x.com&password=secret");
}

#[tokio::test]
async fn test_failed_login_surfaces_detail_and_keeps_store() {
    let recorder = Recorder::default();
    let base = spawn_backend(login_router(recorder.clone(), "unused", Duration::ZERO)).await;

    // Empty store stays empty
    let (manager, store) = session(&base, MemoryTokenStore::new());
    manager.bootstrap().await;
    let err = manager.login("ana@x.com", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(matches!(err, SessionError::Api(ref e) if e.is_auth_failure()));
    assert_eq!(store.get().unwrap(), None);
    assert_eq!(manager.state(), SessionState::Anonymous);

    // An existing token is not touched either
    let (manager, store) = session(&base, MemoryTokenStore::with_token("previous"));
    let err = manager.login("ana@x.com", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(store.get().unwrap().as_deref(), Some("previous"));
}

#[tokio::test]
async fn test_register_stores_token_and_role() {
    let recorder = Recorder::default();
    let base = spawn_backend(register_router(recorder.clone())).await;
    let (manager, store) = session(&base, MemoryTokenStore::new());
    manager.bootstrap().await;

    let user = manager
        .register("Bob", "b@x.com", "hunter22", Role::Teacher)
        .await
        .unwrap();

    assert_eq!(store.get().unwrap().as_deref(), Some("tok123"));
    assert_eq!(user.role, Role::Teacher);
    assert!(user.can_manage_exercises());
    assert_eq!(manager.current_user().map(|u| u.role), Some(Role::Teacher));

    let request = recorder.last();
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
    let sent: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        sent,
        json!({"email": "b@x.com", "name": "Bob", "password": "hunter22", "role": "teacher"})
    );
}

#[tokio::test]
async fn test_register_rejection_keeps_state() {
    let base = spawn_backend(register_router(Recorder::default())).await;
    let (manager, store) = session(&base, MemoryTokenStore::new());
    manager.bootstrap().await;

    let err = manager
        .register("Eve", "taken@x.com", "pw", Role::Student)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "El email ya está registrado");
    assert_eq!(store.get().unwrap(), None);
    assert_eq!(manager.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_login_while_authenticated_replaces_session() {
    let recorder = Recorder::default();
    let router = me_router(
        recorder.clone(),
        StatusCode::OK,
        r#"{"id":"2","name":"Bob","email":"b@x.com","role":"teacher"}"#,
    )
    .merge(login_router(recorder.clone(), "ana-token", Duration::ZERO));
    let base = spawn_backend(router).await;
    let (manager, store) = session(&base, MemoryTokenStore::with_token("bob-token"));

    let restored = manager.bootstrap().await;
    assert_eq!(restored.current_user().map(|u| u.id.as_str()), Some("2"));

    manager.login("ana@x.com", "secret").await.unwrap();
    assert_eq!(manager.current_user().map(|u| u.id), Some("1".to_string()));
    assert_eq!(store.get().unwrap().as_deref(), Some("ana-token"));

    // Bob's token went to /auth/me but not to the login endpoint
    let login = recorder.last();
    assert!(login.path.ends_with("/auth/login"));
    assert!(login.authorization.is_none());
}

#[tokio::test]
async fn test_logout_after_login() {
    let base = spawn_backend(login_router(Recorder::default(), "tok", Duration::ZERO)).await;
    let (manager, store) = session(&base, MemoryTokenStore::new());
    manager.bootstrap().await;
    manager.login("ana@x.com", "secret").await.unwrap();

    manager.logout().await;

    assert_eq!(manager.state(), SessionState::Anonymous);
    assert_eq!(store.get().unwrap(), None);
}

#[tokio::test]
async fn test_logout_waits_for_pending_login() {
    let base = spawn_backend(login_router(
        Recorder::default(),
        "slow-token",
        Duration::from_millis(300),
    ))
    .await;
    let (manager, store) = session(&base, MemoryTokenStore::new());
    let manager = std::sync::Arc::new(manager);
    manager.bootstrap().await;

    let login = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.login("ana@x.com", "secret").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.logout().await;

    // Logout ran after the login finished, so it wins
    assert!(login.await.unwrap().is_ok());
    assert_eq!(manager.state(), SessionState::Anonymous);
    assert_eq!(store.get().unwrap(), None);
}

#[tokio::test]
async fn test_subscribers_see_transitions() {
    let base = spawn_backend(login_router(Recorder::default(), "tok", Duration::ZERO)).await;
    let (manager, _store) = session(&base, MemoryTokenStore::new());
    let mut rx = manager.subscribe();
    assert!(rx.borrow_and_update().is_loading());

    manager.bootstrap().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), SessionState::Anonymous);

    manager.login("ana@x.com", "secret").await.unwrap();
    assert!(rx.borrow_and_update().is_authenticated());
}

#[tokio::test]
async fn test_request_timeout_is_a_network_failure() {
    let router = Router::new().route(
        &route("/auth/me"),
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(ana_json())
        }),
    );
    let base = spawn_backend(router).await;
    let store = std::sync::Arc::new(MemoryTokenStore::with_token("tok"));
    let config = learngenix_core::ApiConfig::new(&base).with_timeout(Duration::from_millis(300));
    let api = learngenix_core::ApiClient::new(config, store.clone()).unwrap();

    let err = api.current_user().await.unwrap_err();
    assert!(err.is_network_failure());

    let manager = learngenix_core::SessionManager::new(api);
    assert_eq!(manager.bootstrap().await, SessionState::Anonymous);
    assert_eq!(store.get().unwrap(), None);
}
