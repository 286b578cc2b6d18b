//! Mapping of service errors to HTTP responses.

use crate::accounts::AccountError;
use crate::auth::{AuthError, TokenError};
use crate::upstream::ProxyError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(rename = "upstreamStatus", skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
}

/// Application error types
#[derive(Debug, PartialEq)]
pub enum ApiError {
    /// 400: missing or malformed input
    Validation(String),
    /// 409: duplicate username
    Conflict(String),
    /// 401: never says whether the username exists
    Unauthorized(String),
    /// 412: operation needs Bitbucket credentials that are not set
    Config(String),
    /// 502: Bitbucket call failed
    Upstream {
        status: Option<u16>,
        message: String,
    },
    /// 500: detail is logged, not returned
    Internal(String),
}

const UNAUTHORIZED: &str = "Unauthorized";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, upstream_status) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Config(msg) => (StatusCode::PRECONDITION_FAILED, msg, None),
            ApiError::Upstream { status, message } => (StatusCode::BAD_GATEWAY, message, status),
            ApiError::Internal(detail) => {
                error!(error = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            upstream_status,
        });

        (status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::Unauthorized(e.to_string()),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                ApiError::Unauthorized(UNAUTHORIZED.to_string())
            }
            AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(_: TokenError) -> Self {
        ApiError::Unauthorized(UNAUTHORIZED.to_string())
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Validation(msg) => ApiError::Validation(msg),
            AccountError::Conflict(msg) => ApiError::Conflict(msg),
            AccountError::Auth(auth) => auth.into(),
            AccountError::Cipher(_) | AccountError::Hash(_) | AccountError::Persistence(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(e: ProxyError) -> Self {
        match e {
            ProxyError::Validation(msg) => ApiError::Validation(msg),
            ProxyError::Auth(auth) => auth.into(),
            ProxyError::NoUpstreamCredentials => ApiError::Config(e.to_string()),
            ProxyError::Upstream(upstream) => ApiError::Upstream {
                status: upstream.status(),
                message: upstream.to_string(),
            },
            ProxyError::Cipher(_) | ProxyError::Persistence(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
