// HTTP API: /users, /bitbucket, /health

pub mod auth_middleware;
pub mod bitbucket;
pub mod error;
pub mod users;

pub use auth_middleware::{require_session, AuthenticatedAccount};
pub use bitbucket::create_bitbucket_router;
pub use error::ApiError;
pub use users::create_users_router;

use crate::accounts::AccountService;
use crate::auth::SessionTokens;
use crate::config::ServerConfig;
use crate::upstream::UpstreamProxy;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state for all routers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub proxy: UpstreamProxy,
    pub sessions: Arc<SessionTokens>,
}

/// Create the full application router
pub fn create_app(state: AppState, server: &ServerConfig) -> Router {
    let state = Arc::new(state);

    let app = Router::new()
        .route("/health", get(health))
        .merge(create_users_router(Arc::clone(&state)))
        .merge(create_bitbucket_router(state));

    if server.cors_allow_any_origin {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    }
}

/// GET /health - Liveness probe
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
