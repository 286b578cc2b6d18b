//! AES-256-GCM encryption for stored upstream passwords.
//!
//! Each password is encrypted with its own random nonce. The key is a
//! 32-byte value supplied base64-encoded through `CRYPTO_SECRET`.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::{CipherError, EncryptedSecret};

/// Size of the encryption key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// Validates that the secret is exactly 32 bytes when base64 decoded.
///
/// # Returns
/// * `Ok(Vec<u8>)` - Decoded key bytes (32 bytes)
/// * `Err(CipherError::InvalidKey)` - If key is invalid length or invalid base64
pub fn validate_key(key_base64: &str) -> Result<Vec<u8>, CipherError> {
    let key_bytes = BASE64
        .decode(key_base64.trim())
        .map_err(|e| CipherError::InvalidKey(format!("not valid base64: {}", e)))?;

    if key_bytes.len() != KEY_SIZE {
        return Err(CipherError::InvalidKey(format!(
            "must be {} bytes (256 bits), got {} bytes",
            KEY_SIZE,
            key_bytes.len()
        )));
    }

    Ok(key_bytes)
}

/// Symmetric cipher for upstream passwords.
///
/// Built once at startup from the configured secret and shared read-only.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Creates a cipher from a base64-encoded 32-byte secret.
    pub fn from_base64(secret: &str) -> Result<Self, CipherError> {
        let key = validate_key(secret)?;
        Self::from_key(&key)
    }

    /// Creates a cipher from raw key bytes.
    pub fn from_key(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_SIZE {
            return Err(CipherError::InvalidKey(format!(
                "must be {} bytes, got {}",
                KEY_SIZE,
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// Encrypts plaintext with a fresh random nonce.
    ///
    /// Both halves of the result are base64 so they can be stored as TEXT.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret, CipherError> {
        // Never reuse a nonce under the same key
        let nonce_bytes = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext_bytes = self
            .cipher
            .encrypt(&nonce_bytes, plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        Ok(EncryptedSecret {
            ciphertext: BASE64.encode(&ciphertext_bytes),
            nonce: BASE64.encode(&nonce_bytes),
        })
    }

    /// Decrypts a value produced by [`CredentialCipher::encrypt`].
    ///
    /// Fails on malformed input, a wrong key, or tampered ciphertext.
    pub fn decrypt(&self, secret: &EncryptedSecret) -> Result<String, CipherError> {
        let ciphertext_bytes = BASE64
            .decode(&secret.ciphertext)
            .map_err(|_| CipherError::Malformed("ciphertext is not valid base64".to_string()))?;
        let nonce_bytes = BASE64
            .decode(&secret.nonce)
            .map_err(|_| CipherError::Malformed("nonce is not valid base64".to_string()))?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(CipherError::Malformed(format!(
                "invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }

        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext_bytes = self
            .cipher
            .decrypt(nonce, ciphertext_bytes.as_ref())
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext_bytes)
            .map_err(|_| CipherError::Malformed("decrypted data is not valid UTF-8".to_string()))
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialCipher { .. }")
    }
}
