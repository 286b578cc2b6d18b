//! Unit tests for the account service

use super::*;
use crate::auth::{AuthError, PasswordHasher, SessionTokens};
use crate::config::PasswordConfig;
use crate::credentials::CredentialCipher;
use std::sync::Arc;

const JWT_SECRET: &str = "account-tests-secret";

struct Fixture {
    service: AccountService,
    store: Arc<AccountStore>,
    sessions: Arc<SessionTokens>,
    cipher: Arc<CredentialCipher>,
}

fn create_fixture() -> Fixture {
    let store = Arc::new(AccountStore::new(":memory:").unwrap());
    let hasher = Arc::new(
        PasswordHasher::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap(),
    );
    let sessions = Arc::new(SessionTokens::new(JWT_SECRET, 3600));
    let cipher = Arc::new(CredentialCipher::from_key(&[3u8; 32]).unwrap());

    let service = AccountService::new(
        Arc::clone(&store),
        hasher,
        Arc::clone(&sessions),
        Arc::clone(&cipher),
    );

    Fixture {
        service,
        store,
        sessions,
        cipher,
    }
}

#[test]
fn test_sign_up_then_login() {
    let f = create_fixture();

    let account = f.service.sign_up("alice", "secret1").unwrap();
    assert_eq!(account.username, "alice");
    assert_ne!(account.password_hash, "secret1");

    let token = f.service.login("alice", "secret1").unwrap();
    assert_eq!(f.sessions.verify(&token), Ok(account.id));
}

#[test]
fn test_sign_up_duplicate_username() {
    let f = create_fixture();
    let original = f.service.sign_up("alice", "secret1").unwrap();

    let result = f.service.sign_up("alice", "other-password");
    assert!(matches!(result, Err(AccountError::Conflict(_))));

    // Original account and password still in effect
    let stored = f.store.find_by_username("alice").unwrap().unwrap();
    assert_eq!(stored, original);
    assert!(f.service.login("alice", "secret1").is_ok());
    assert!(f.service.login("alice", "other-password").is_err());
}

#[test]
fn test_sign_up_requires_fields() {
    let f = create_fixture();

    assert!(matches!(
        f.service.sign_up("", "secret1"),
        Err(AccountError::Validation(_))
    ));
    assert!(matches!(
        f.service.sign_up("alice", ""),
        Err(AccountError::Validation(_))
    ));
    assert_eq!(f.store.count().unwrap(), 0);
}

#[test]
fn test_login_unknown_user_and_wrong_password_identical() {
    let f = create_fixture();
    f.service.sign_up("alice", "secret1").unwrap();

    let unknown = f.service.login("bob", "secret1").unwrap_err();
    let wrong = f.service.login("alice", "wrong").unwrap_err();

    assert_eq!(unknown, AccountError::Auth(AuthError::InvalidCredentials));
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[test]
fn test_change_password() {
    let f = create_fixture();
    let account = f.service.sign_up("alice", "secret1").unwrap();

    f.service.change_password(account.id, "secret2").unwrap();

    assert!(f.service.login("alice", "secret1").is_err());
    assert!(f.service.login("alice", "secret2").is_ok());
}

#[test]
fn test_change_password_rejects_empty() {
    let f = create_fixture();
    let account = f.service.sign_up("alice", "secret1").unwrap();

    let result = f.service.change_password(account.id, "");
    assert!(matches!(result, Err(AccountError::Validation(_))));
    assert!(f.service.login("alice", "secret1").is_ok());
}

#[test]
fn test_change_password_unknown_account() {
    let f = create_fixture();

    let result = f.service.change_password(404, "secret2");
    assert_eq!(result, Err(AccountError::Auth(AuthError::InvalidToken)));
}

#[test]
fn test_current_user_without_upstream() {
    let f = create_fixture();
    let account = f.service.sign_up("alice", "secret1").unwrap();

    let user = f.service.current_user(account.id).unwrap();
    assert_eq!(
        user,
        CurrentUser {
            username: "alice".to_string(),
            upstream_username: None,
        }
    );

    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"username": "alice", "bitBucketUsername": null})
    );
}

#[test]
fn test_set_upstream_credentials_encrypts() {
    let f = create_fixture();
    let account = f.service.sign_up("alice", "secret1").unwrap();

    f.service
        .set_upstream_credentials(account.id, "alice-bb", "bbpass")
        .unwrap();

    let stored = f.store.find_by_id(account.id).unwrap().unwrap();
    let (username, encrypted) = stored.upstream_credentials().unwrap();
    assert_eq!(username, "alice-bb");
    assert_ne!(encrypted.ciphertext, "bbpass");
    assert_eq!(f.cipher.decrypt(encrypted).unwrap(), "bbpass");

    let user = f.service.current_user(account.id).unwrap();
    assert_eq!(user.upstream_username.as_deref(), Some("alice-bb"));
}

#[test]
fn test_set_upstream_credentials_requires_both() {
    let f = create_fixture();
    let account = f.service.sign_up("alice", "secret1").unwrap();

    assert!(matches!(
        f.service.set_upstream_credentials(account.id, "alice-bb", ""),
        Err(AccountError::Validation(_))
    ));
    assert!(matches!(
        f.service.set_upstream_credentials(account.id, "", "bbpass"),
        Err(AccountError::Validation(_))
    ));

    let stored = f.store.find_by_id(account.id).unwrap().unwrap();
    assert!(stored.upstream_credentials().is_none());
    assert!(stored.upstream_username.is_none());
}

#[test]
fn test_account_view_has_no_secrets() {
    let f = create_fixture();
    let account = f.service.sign_up("alice", "secret1").unwrap();

    let json = serde_json::to_string(&AccountView::from(&account)).unwrap();
    assert!(json.contains("\"username\":\"alice\""));
    assert!(json.contains("\"bitBucketUsername\":null"));
    assert!(!json.contains("argon2"));
    assert!(!json.contains("password"));
}
