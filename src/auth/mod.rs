//! Session authentication primitives.
//!
//! - [`session`]: HS256 session tokens carrying the account id
//! - [`password`]: Argon2id hashing of local login passwords
//! - [`extract_session_token`]: reads the token from the `Authorization` header

use axum::http::HeaderMap;

pub mod password;
pub mod session;

pub use password::{HashError, PasswordHasher};
pub use session::{AuthError, SessionClaims, SessionTokens};


/// Extract the session token from the HTTP Authorization header
///
/// The browser client sends the raw token (`Authorization: <token>`);
/// the standard `Authorization: Bearer <token>` form is accepted as well.
pub fn extract_session_token(headers: &HeaderMap) -> Result<String, TokenError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::InvalidFormat)?;

    parse_session_token(auth_header)
}

/// Parse the token out of an Authorization header value
///
/// Internal helper for extract_session_token
fn parse_session_token(header_value: &str) -> Result<String, TokenError> {
    let value = header_value.trim();

    if value.is_empty() {
        return Err(TokenError::Empty);
    }

    let token = match value.split_once(' ') {
        Some((scheme, rest)) => {
            if !scheme.eq_ignore_ascii_case("bearer") {
                return Err(TokenError::InvalidFormat);
            }
            rest.trim()
        }
        None => value,
    };

    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    // A JWT never contains whitespace
    if token.contains(char::is_whitespace) {
        return Err(TokenError::InvalidFormat);
    }

    Ok(token.to_string())
}

/// Token extraction errors
#[derive(Debug, PartialEq, Clone)]
pub enum TokenError {
    /// Authorization header not present
    Missing,
    /// Not valid header text, or an unsupported scheme
    InvalidFormat,
    /// Token is empty string
    Empty,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Missing => write!(f, "Authorization token not provided"),
            TokenError::InvalidFormat => write!(f, "Invalid authorization token format"),
            TokenError::Empty => write!(f, "Authorization token is empty"),
        }
    }
}

impl std::error::Error for TokenError {}
