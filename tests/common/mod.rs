// Shared helpers for API integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bitview::accounts::{AccountService, AccountStore};
use bitview::api::{create_app, AppState};
use bitview::auth::{PasswordHasher, SessionTokens};
use bitview::config::{PasswordConfig, ServerConfig, UpstreamConfig};
use bitview::credentials::CredentialCipher;
use bitview::upstream::{BitbucketClient, UpstreamProxy};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<AccountStore>,
    pub sessions: Arc<SessionTokens>,
}

/// Full application wired to an in-memory store and the given upstream URL.
pub fn create_test_app(upstream_base_url: &str) -> TestApp {
    let store = Arc::new(AccountStore::new(":memory:").unwrap());
    let cipher = Arc::new(CredentialCipher::from_key(&[5u8; 32]).unwrap());
    let sessions = Arc::new(SessionTokens::new(JWT_SECRET, 3600));
    let hasher = Arc::new(
        PasswordHasher::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap(),
    );
    let client = BitbucketClient::new(&UpstreamConfig {
        base_url: upstream_base_url.to_string(),
        timeout_seconds: 5,
        user_agent: "bitview-test".to_string(),
    })
    .unwrap();

    let state = AppState {
        accounts: AccountService::new(
            Arc::clone(&store),
            hasher,
            Arc::clone(&sessions),
            Arc::clone(&cipher),
        ),
        proxy: UpstreamProxy::new(Arc::clone(&store), cipher, Arc::new(client)),
        sessions: Arc::clone(&sessions),
    };

    TestApp {
        router: create_app(state, &ServerConfig::default()),
        store,
        sessions,
    }
}

/// Send a request and return status plus parsed JSON body (Null when empty).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", token);
    }

    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

/// Sign up and log in, returning the session token.
pub async fn sign_up_and_login(app: &Router, username: &str, password: &str) -> String {
    let credentials = serde_json::json!({ "username": username, "password": password });

    let (status, _) = send(app, "POST", "/users/signup", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, "POST", "/users/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);

    body["token"].as_str().unwrap().to_string()
}
