//! Local accounts: persistence and the sign-up / login flows.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::credentials::EncryptedSecret;

mod service;
mod store;

pub use service::{AccountError, AccountService};
pub use store::AccountStore;

#[cfg(test)]
mod tests;

/// A local user record.
///
/// # Security
/// - `password_hash` and `upstream_password` never leave the server; use
///   [`AccountView`] or [`CurrentUser`] for responses
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Bitbucket username, once set
    pub upstream_username: Option<String>,
    /// Encrypted Bitbucket password, once set
    pub upstream_password: Option<EncryptedSecret>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Both upstream fields, if the account has them.
    pub fn upstream_credentials(&self) -> Option<(&str, &EncryptedSecret)> {
        match (&self.upstream_username, &self.upstream_password) {
            (Some(username), Some(password)) => Some((username.as_str(), password)),
            _ => None,
        }
    }
}

/// Account as returned by sign-up (no secrets)
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AccountView {
    pub id: i64,
    pub username: String,
    #[serde(rename = "bitBucketUsername")]
    pub upstream_username: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            upstream_username: account.upstream_username.clone(),
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}

/// Profile returned by GET /users/currentUser
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CurrentUser {
    pub username: String,
    #[serde(rename = "bitBucketUsername")]
    pub upstream_username: Option<String>,
}

/// Account store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Username uniqueness constraint violated
    UsernameTaken,
    /// Any other SQLite failure
    Database(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UsernameTaken => write!(f, "Username already exists"),
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
