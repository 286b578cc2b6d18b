//! Local account endpoints under `/users`.

use crate::accounts::{AccountView, CurrentUser};
use crate::api::auth_middleware::{require_session, AuthenticatedAccount};
use crate::api::error::ApiError;
use crate::api::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Request body for POST /users/signup and POST /users/login
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Response for POST /users/login
#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Request body for POST /users/changePassword
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

/// Create users API router
pub fn create_users_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/users/changePassword", post(change_password))
        .route("/users/currentUser", get(current_user))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ));

    Router::new()
        .route("/users/signup", post(sign_up))
        .route("/users/login", post(login))
        .merge(protected)
        .with_state(state)
}

/// POST /users/signup - Register a new account
async fn sign_up(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AccountView>, ApiError> {
    let Json(request) = body?;

    let account = state.accounts.sign_up(&request.username, &request.password)?;
    Ok(Json(AccountView::from(&account)))
}

/// POST /users/login - Exchange username/password for a session token
async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = body?;

    let token = state.accounts.login(&request.username, &request.password)?;
    Ok(Json(LoginResponse { token }))
}

/// POST /users/changePassword - Replace the session account's password
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;

    state.accounts.change_password(account_id, &request.password)?;
    Ok(Json(json!({})))
}

/// GET /users/currentUser - Profile of the session account
async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
) -> Result<Json<CurrentUser>, ApiError> {
    debug!(account_id, "Current user lookup");

    let user = state.accounts.current_user(account_id)?;
    Ok(Json(user))
}
