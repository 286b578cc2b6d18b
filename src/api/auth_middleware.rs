use crate::api::error::ApiError;
use crate::api::AppState;
use crate::auth::{extract_session_token, AuthError, SessionTokens, TokenError};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;


/// Account id resolved from a verified session token.
///
/// Inserted into request extensions by [`require_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount(pub i64);

/// Why a request was refused by the session gate
#[derive(Debug, PartialEq)]
pub enum GateError {
    /// Missing or malformed Authorization header
    Header(TokenError),
    /// Token failed verification
    Token(AuthError),
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateError::Header(e) => write!(f, "{}", e),
            GateError::Token(e) => write!(f, "{}", e),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Header(e) => e.into(),
            GateError::Token(e) => e.into(),
        }
    }
}

/// Resolve the account behind a request's session token
///
/// # Flow
/// 1. Extract the token from the Authorization header (raw or Bearer)
/// 2. Verify signature and expiration
/// 3. Return the `userId` claim
pub fn authenticate(headers: &HeaderMap, sessions: &SessionTokens) -> Result<i64, GateError> {
    let token = extract_session_token(headers).map_err(GateError::Header)?;
    sessions.verify(&token).map_err(GateError::Token)
}

/// Session gate for protected routes.
///
/// Rejects with 401 before the handler runs; on success the handler can
/// extract `Extension<AuthenticatedAccount>`.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(req.headers(), &state.sessions) {
        Ok(account_id) => {
            req.extensions_mut().insert(AuthenticatedAccount(account_id));
            next.run(req).await
        }
        Err(e) => {
            debug!(path = %req.uri().path(), reason = %e, "Rejected unauthenticated request");
            ApiError::from(e).into_response()
        }
    }
}
