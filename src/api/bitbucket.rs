//! Bitbucket endpoints under `/bitbucket`.
//!
//! Repository and commit listings are fetched live on every request with
//! the session account's stored credentials.

use crate::api::auth_middleware::{require_session, AuthenticatedAccount};
use crate::api::error::ApiError;
use crate::api::AppState;
use crate::upstream::{Commit, Page, Repository};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Request body for POST /bitbucket/setBitbucketCredentials
#[derive(Deserialize)]
pub struct SetCredentialsRequest {
    #[serde(rename = "bitBucketUsername")]
    pub username: String,
    #[serde(rename = "bitBucketPassword")]
    pub password: String,
}

/// Create Bitbucket API router (every route requires a session)
pub fn create_bitbucket_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/bitbucket/setBitbucketCredentials", post(set_credentials))
        .route("/bitbucket/repos", get(list_first_page))
        .route("/bitbucket/repos/:page", get(list_repos))
        .route("/bitbucket/commits/:repoName", get(list_commits))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ))
        .with_state(state)
}

/// POST /bitbucket/setBitbucketCredentials - Store encrypted Bitbucket credentials
async fn set_credentials(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
    body: Result<Json<SetCredentialsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;

    state
        .accounts
        .set_upstream_credentials(account_id, &request.username, &request.password)?;
    Ok(Json(json!({})))
}

/// GET /bitbucket/repos - First page of repositories
async fn list_first_page(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
) -> Result<Json<Page<Repository>>, ApiError> {
    let page = state.proxy.list_repositories(account_id, 1).await?;
    Ok(Json(page))
}

/// GET /bitbucket/repos/:page - One page of repositories, most recently updated first
async fn list_repos(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
    Path(page): Path<String>,
) -> Result<Json<Page<Repository>>, ApiError> {
    let page = parse_page(&page)?;

    let page = state.proxy.list_repositories(account_id, page).await?;
    Ok(Json(page))
}

/// GET /bitbucket/commits/:repoName - Commit history, newest first
async fn list_commits(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
    Path(repo_name): Path<String>,
) -> Result<Json<Page<Commit>>, ApiError> {
    let commits = state.proxy.list_commits(account_id, &repo_name).await?;
    Ok(Json(commits))
}

/// Parse a 1-based page number from the URL
fn parse_page(raw: &str) -> Result<u32, ApiError> {
    match raw.parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(ApiError::Validation(format!(
            "Invalid page '{}' (expected a positive integer)",
            raw
        ))),
    }
}
