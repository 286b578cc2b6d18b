use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{Commit, Page, Repository, UpstreamClient, UpstreamCredentials, UpstreamError};
use crate::config::UpstreamConfig;

/// HTTP client for the Bitbucket Cloud REST API (2.0).
///
/// Authenticates every request with HTTP Basic auth using the account's
/// Bitbucket username and (decrypted) password.
pub struct BitbucketClient {
    http_client: Client,
    base_url: String,
}

impl BitbucketClient {
    /// Create a client from configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http_client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| UpstreamError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        credentials: &UpstreamCredentials,
    ) -> Result<Page<T>, UpstreamError> {
        debug!(url = %url, "Bitbucket request");

        let response = self
            .http_client
            .get(url)
            .query(query)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let response = check_response_status(response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        serde_json::from_slice::<Page<T>>(&body).map_err(|e| UpstreamError::Schema(e.to_string()))
    }
}

#[async_trait]
impl UpstreamClient for BitbucketClient {
    async fn list_repositories(
        &self,
        credentials: &UpstreamCredentials,
        page: u32,
    ) -> Result<Page<Repository>, UpstreamError> {
        let url = format!(
            "{}/repositories/{}",
            self.base_url,
            urlencoding::encode(&credentials.username)
        );
        let query = [("page", page.to_string()), ("sort", "-updated_on".to_string())];

        self.get_page(&url, &query, credentials).await
    }

    async fn list_commits(
        &self,
        credentials: &UpstreamCredentials,
        repo_slug: &str,
    ) -> Result<Page<Commit>, UpstreamError> {
        let url = format!(
            "{}/repositories/{}/{}/commits",
            self.base_url,
            urlencoding::encode(&credentials.username),
            urlencoding::encode(repo_slug)
        );
        let query = [("sort", "-date".to_string())];

        self.get_page(&url, &query, credentials).await
    }
}

/// Bitbucket error body: `{"type": "error", "error": {"message": "..."}}`
#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Turn a non-2xx response into `UpstreamError::Rejected`, keeping Bitbucket's
/// own message when the body has one.
async fn check_response_status(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown error").to_string());

    Err(UpstreamError::Rejected {
        status: status.as_u16(),
        message,
    })
}
