//! Session token issuing and verification.
//!
//! Tokens are HS256 JWTs signed with `JWT_SECRET`. The `userId` claim is the
//! account id; `exp` is always set from the configured validity window.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Unique token id
    pub jti: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

/// Issues and verifies session tokens with a single static secret.
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionTokens {
    /// Create an issuer/verifier from the signing secret and token lifetime.
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let ttl_seconds = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::try_seconds(ttl_seconds).unwrap_or(Duration::MAX),
        }
    }

    /// Issue a token for an account, valid from now.
    pub fn issue(&self, account_id: i64) -> Result<String, AuthError> {
        self.issue_at(account_id, Utc::now())
    }

    /// Issue a token as if it had been created at `issued_at`.
    pub fn issue_at(&self, account_id: i64, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let claims = SessionClaims {
            user_id: account_id,
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Verify a token and return its claims.
    pub fn verify_claims(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    /// Verify a token and return the account id it was issued for.
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        self.verify_claims(token).map(|claims| claims.user_id)
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad signature, wrong algorithm, or malformed token
    InvalidToken,
    /// Token `exp` is in the past
    TokenExpired,
    /// Login with unknown username or wrong password
    InvalidCredentials,
    /// Token could not be produced
    Internal(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Invalid session token"),
            AuthError::TokenExpired => write!(f, "Session token expired"),
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::Internal(msg) => write!(f, "Failed to issue session token: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}
