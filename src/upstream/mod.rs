//! Pass-through access to the Bitbucket Cloud API.
//!
//! [`UpstreamProxy`] resolves a session's stored Bitbucket credentials and
//! forwards list queries through an [`UpstreamClient`]. Responses are
//! checked against typed envelopes but otherwise returned unmodified: every
//! field the upstream sends survives a deserialize/serialize round trip.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod bitbucket;
mod proxy;

pub use bitbucket::BitbucketClient;
pub use proxy::{ProxyError, UpstreamProxy};

/// Bitbucket paginated response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of values (not sent for commit listings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Current page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Values per page
    pub pagelen: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    pub values: Vec<T>,
}

/// Bitbucket repository.
///
/// Fields not named here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Bitbucket commit.
///
/// Fields not named here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Decrypted Bitbucket credentials for one upstream call.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for UpstreamCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Read-only Bitbucket API surface used by the proxy.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// One page of the user's repositories, most recently updated first.
    async fn list_repositories(
        &self,
        credentials: &UpstreamCredentials,
        page: u32,
    ) -> Result<Page<Repository>, UpstreamError>;

    /// Commit history of one of the user's repositories, newest first.
    async fn list_commits(
        &self,
        credentials: &UpstreamCredentials,
        repo_slug: &str,
    ) -> Result<Page<Commit>, UpstreamError>;
}

/// Upstream API errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Bitbucket answered with a non-success status
    Rejected { status: u16, message: String },
    /// Connection, TLS, or timeout failure
    Transport(String),
    /// Response body did not match the expected schema
    Schema(String),
}

impl UpstreamError {
    /// Upstream HTTP status, when Bitbucket answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamError::Rejected { status, message } => {
                write!(f, "Bitbucket API error {}: {}", status, message)
            }
            UpstreamError::Transport(msg) => write!(f, "Bitbucket API unreachable: {}", msg),
            UpstreamError::Schema(msg) => {
                write!(f, "Unexpected Bitbucket API response: {}", msg)
            }
        }
    }
}

impl std::error::Error for UpstreamError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_page_passes_through_unknown_fields() {
        let json = serde_json::json!({
            "pagelen": 10,
            "size": 23,
            "page": 1,
            "next": "https://api.bitbucket.org/2.0/repositories/alice-bb?page=2",
            "values": [{
                "uuid": "{0b2f5a4e-1d2c-4c39-9a3a-0a7e2f1c9d11}",
                "name": "widgets",
                "full_name": "alice-bb/widgets",
                "slug": "widgets",
                "updated_on": "2019-12-09T02:28:44.000000+00:00",
                "is_private": true,
                "links": {"html": {"href": "https://bitbucket.org/alice-bb/widgets"}}
            }]
        });

        let page: Page<Repository> = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(page.size, Some(23));
        assert_eq!(page.values[0].full_name, "alice-bb/widgets");
        assert_eq!(page.values[0].extra["is_private"], true);

        assert_eq!(serde_json::to_value(&page).unwrap(), json);
    }

    #[test]
    fn test_commit_page_without_size() {
        let json = serde_json::json!({
            "pagelen": 30,
            "values": [{
                "hash": "4f2c1e9",
                "date": "2019-12-09T02:28:44+00:00",
                "message": "Initial commit\n",
                "author": {"raw": "Alice <alice@example.com>"}
            }]
        });

        let page: Page<Commit> = serde_json::from_value(json.clone()).unwrap();
        assert!(page.size.is_none());
        assert_eq!(page.values[0].hash, "4f2c1e9");

        assert_eq!(serde_json::to_value(&page).unwrap(), json);
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        // values must be a list of objects with the named fields
        let missing_values = serde_json::json!({"pagelen": 10});
        assert!(serde_json::from_value::<Page<Repository>>(missing_values).is_err());

        let bad_item = serde_json::json!({"pagelen": 10, "values": [{"name": "x"}]});
        assert!(serde_json::from_value::<Page<Repository>>(bad_item).is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = UpstreamCredentials {
            username: "alice-bb".to_string(),
            password: "bbpass".to_string(),
        };

        let debug = format!("{:?}", credentials);
        assert!(debug.contains("alice-bb"));
        assert!(!debug.contains("bbpass"));
    }

    #[test]
    fn test_error_status() {
        let rejected = UpstreamError::Rejected {
            status: 404,
            message: "Repository not found".to_string(),
        };
        assert_eq!(rejected.status(), Some(404));
        assert_eq!(UpstreamError::Transport("timeout".to_string()).status(), None);
    }
}
