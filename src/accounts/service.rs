use super::{Account, AccountStore, CurrentUser, StoreError};
use crate::auth::{AuthError, HashError, PasswordHasher, SessionTokens};
use crate::credentials::{CipherError, CredentialCipher};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sign-up, login and profile operations on local accounts.
///
/// Every method taking an `account_id` expects it to come from a verified
/// session token.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<AccountStore>,
    hasher: Arc<PasswordHasher>,
    sessions: Arc<SessionTokens>,
    cipher: Arc<CredentialCipher>,
}

impl AccountService {
    pub fn new(
        store: Arc<AccountStore>,
        hasher: Arc<PasswordHasher>,
        sessions: Arc<SessionTokens>,
        cipher: Arc<CredentialCipher>,
    ) -> Self {
        Self {
            store,
            hasher,
            sessions,
            cipher,
        }
    }

    /// Register a new account. Does not log the caller in.
    pub fn sign_up(&self, username: &str, password: &str) -> Result<Account, AccountError> {
        require_non_empty("username", username)?;
        require_non_empty("password", password)?;

        let password_hash = self.hasher.hash(password)?;
        let account = self.store.create(username, &password_hash)?;

        info!(account_id = account.id, username = %account.username, "Account created");
        Ok(account)
    }

    /// Check credentials and issue a session token.
    ///
    /// An unknown username and a wrong password fail the same way, and both
    /// run one Argon2 verification.
    pub fn login(&self, username: &str, password: &str) -> Result<String, AccountError> {
        require_non_empty("username", username)?;
        require_non_empty("password", password)?;

        let account = self.store.find_by_username(username)?;

        let verified = match &account {
            Some(account) => self.hasher.verify(password, &account.password_hash),
            None => self.hasher.verify_decoy(password),
        };

        match account {
            Some(account) if verified => {
                let token = self.sessions.issue(account.id)?;
                info!(account_id = account.id, "Login succeeded");
                Ok(token)
            }
            _ => {
                warn!(username = %username, "Login failed");
                Err(AccountError::Auth(AuthError::InvalidCredentials))
            }
        }
    }

    /// Re-hash and overwrite the local password.
    pub fn change_password(&self, account_id: i64, new_password: &str) -> Result<(), AccountError> {
        require_non_empty("password", new_password)?;

        let password_hash = self.hasher.hash(new_password)?;
        if !self.store.update_password_hash(account_id, &password_hash)? {
            return Err(stale_session(account_id));
        }

        info!(account_id, "Password changed");
        Ok(())
    }

    /// Profile of the session's account, without secrets.
    pub fn current_user(&self, account_id: i64) -> Result<CurrentUser, AccountError> {
        let account = self.load(account_id)?;

        Ok(CurrentUser {
            username: account.username,
            upstream_username: account.upstream_username,
        })
    }

    /// Encrypt and store Bitbucket credentials, replacing any previous pair.
    pub fn set_upstream_credentials(
        &self,
        account_id: i64,
        upstream_username: &str,
        upstream_password: &str,
    ) -> Result<(), AccountError> {
        require_non_empty("bitBucketUsername", upstream_username)?;
        require_non_empty("bitBucketPassword", upstream_password)?;

        let encrypted = self.cipher.encrypt(upstream_password)?;
        if !self
            .store
            .set_upstream_credentials(account_id, upstream_username, &encrypted)?
        {
            return Err(stale_session(account_id));
        }

        info!(
            account_id,
            upstream_username = %upstream_username,
            "Upstream credentials stored"
        );
        Ok(())
    }

    /// Load the session's account.
    pub fn load(&self, account_id: i64) -> Result<Account, AccountError> {
        self.store
            .find_by_id(account_id)?
            .ok_or_else(|| stale_session(account_id))
    }
}

/// A verified token whose account is gone is treated as an invalid session.
fn stale_session(account_id: i64) -> AccountError {
    debug!(account_id, "Session refers to unknown account");
    AccountError::Auth(AuthError::InvalidToken)
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AccountError> {
    if value.is_empty() {
        return Err(AccountError::Validation(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

/// Account service errors
#[derive(Debug, Clone, PartialEq)]
pub enum AccountError {
    /// Missing or malformed input
    Validation(String),
    /// Username already exists
    Conflict(String),
    /// Bad login or unusable session
    Auth(AuthError),
    /// Upstream password could not be encrypted
    Cipher(CipherError),
    /// Password hashing failed
    Hash(HashError),
    /// Account store failure
    Persistence(String),
}

impl std::fmt::Display for AccountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountError::Validation(msg) => write!(f, "Invalid request: {}", msg),
            AccountError::Conflict(msg) => write!(f, "{}", msg),
            AccountError::Auth(e) => write!(f, "{}", e),
            AccountError::Cipher(e) => write!(f, "{}", e),
            AccountError::Hash(e) => write!(f, "{}", e),
            AccountError::Persistence(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AccountError {}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UsernameTaken => AccountError::Conflict(e.to_string()),
            StoreError::Database(_) => AccountError::Persistence(e.to_string()),
        }
    }
}

impl From<AuthError> for AccountError {
    fn from(e: AuthError) -> Self {
        AccountError::Auth(e)
    }
}

impl From<CipherError> for AccountError {
    fn from(e: CipherError) -> Self {
        AccountError::Cipher(e)
    }
}

impl From<HashError> for AccountError {
    fn from(e: HashError) -> Self {
        AccountError::Hash(e)
    }
}
