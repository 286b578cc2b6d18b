use super::{Commit, Page, Repository, UpstreamClient, UpstreamCredentials, UpstreamError};
use crate::accounts::{AccountStore, StoreError};
use crate::auth::AuthError;
use crate::credentials::{CipherError, CredentialCipher};
use std::sync::Arc;
use tracing::{debug, warn};

/// Forwards repository and commit listings to Bitbucket on behalf of an
/// account, using its stored (encrypted) Bitbucket credentials.
///
/// No caching, retries, or rate limiting: every call goes upstream.
#[derive(Clone)]
pub struct UpstreamProxy {
    accounts: Arc<AccountStore>,
    cipher: Arc<CredentialCipher>,
    client: Arc<dyn UpstreamClient>,
}

impl UpstreamProxy {
    pub fn new(
        accounts: Arc<AccountStore>,
        cipher: Arc<CredentialCipher>,
        client: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            accounts,
            cipher,
            client,
        }
    }

    /// One page (1-based) of the account's repositories, most recently updated first.
    pub async fn list_repositories(
        &self,
        account_id: i64,
        page: u32,
    ) -> Result<Page<Repository>, ProxyError> {
        if page == 0 {
            return Err(ProxyError::Validation("page must be 1 or greater".to_string()));
        }

        let credentials = self.credentials_for(account_id)?;
        debug!(account_id, page, "Listing Bitbucket repositories");

        self.client
            .list_repositories(&credentials, page)
            .await
            .map_err(|e| upstream_failure(account_id, e))
    }

    /// Commit history of one repository, newest first.
    pub async fn list_commits(
        &self,
        account_id: i64,
        repo_name: &str,
    ) -> Result<Page<Commit>, ProxyError> {
        if repo_name.trim().is_empty() {
            return Err(ProxyError::Validation(
                "repository name must not be empty".to_string(),
            ));
        }

        let credentials = self.credentials_for(account_id)?;
        debug!(account_id, repo = %repo_name, "Listing Bitbucket commits");

        self.client
            .list_commits(&credentials, repo_name)
            .await
            .map_err(|e| upstream_failure(account_id, e))
    }

    /// Load the account and decrypt its Bitbucket password.
    fn credentials_for(&self, account_id: i64) -> Result<UpstreamCredentials, ProxyError> {
        let account = self
            .accounts
            .find_by_id(account_id)?
            .ok_or(ProxyError::Auth(AuthError::InvalidToken))?;

        let (username, encrypted) = account
            .upstream_credentials()
            .ok_or(ProxyError::NoUpstreamCredentials)?;

        let password = self.cipher.decrypt(encrypted).map_err(|e| {
            warn!(account_id, error = %e, "Failed to decrypt stored Bitbucket password");
            ProxyError::Cipher(e)
        })?;

        Ok(UpstreamCredentials {
            username: username.to_string(),
            password,
        })
    }
}

fn upstream_failure(account_id: i64, e: UpstreamError) -> ProxyError {
    warn!(account_id, status = ?e.status(), error = %e, "Bitbucket request failed");
    ProxyError::Upstream(e)
}

/// Upstream proxy errors
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyError {
    /// Bad page number or repository name
    Validation(String),
    /// Session's account no longer exists
    Auth(AuthError),
    /// Account has no Bitbucket credentials stored
    NoUpstreamCredentials,
    /// Stored password could not be decrypted
    Cipher(CipherError),
    /// Account store failure
    Persistence(String),
    /// Bitbucket call failed
    Upstream(UpstreamError),
}

impl std::fmt::Display for ProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyError::Validation(msg) => write!(f, "Invalid request: {}", msg),
            ProxyError::Auth(e) => write!(f, "{}", e),
            ProxyError::NoUpstreamCredentials => {
                write!(f, "Bitbucket credentials have not been set")
            }
            ProxyError::Cipher(e) => write!(f, "{}", e),
            ProxyError::Persistence(msg) => write!(f, "{}", msg),
            ProxyError::Upstream(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProxyError {}

impl From<StoreError> for ProxyError {
    fn from(e: StoreError) -> Self {
        ProxyError::Persistence(e.to_string())
    }
}
