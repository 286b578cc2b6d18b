//! Encryption of upstream (Bitbucket) passwords at rest.
//!
//! The account store never sees a plaintext upstream password: the account
//! service encrypts it here before persisting, and the upstream proxy
//! decrypts it right before authenticating against Bitbucket.
//!
//! # Security
//!
//! - AES-256-GCM, authenticated (tampering is detected)
//! - Each value has a unique random nonce
//! - Key is 32 bytes, base64 in `CRYPTO_SECRET`, kept in memory only

use serde::{Deserialize, Serialize};

mod encryption;

pub use encryption::{validate_key, CredentialCipher};

/// Ciphertext and the nonce it was sealed with, both base64-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    pub ciphertext: String,
    pub nonce: String,
}

/// Credential cipher errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Secret missing, not base64, or not 32 bytes
    InvalidKey(String),
    /// Ciphertext or nonce could not be decoded
    Malformed(String),
    /// AEAD seal failed
    EncryptionFailed,
    /// Wrong key or tampered data
    DecryptionFailed,
}

impl std::fmt::Display for CipherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CipherError::InvalidKey(msg) => write!(f, "Invalid encryption key: {}", msg),
            CipherError::Malformed(msg) => write!(f, "Malformed encrypted value: {}", msg),
            CipherError::EncryptionFailed => write!(f, "Encryption failed"),
            CipherError::DecryptionFailed => {
                write!(f, "Decryption failed (wrong key or corrupted data)")
            }
        }
    }
}

impl std::error::Error for CipherError {}
