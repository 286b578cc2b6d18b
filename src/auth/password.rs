//! Local login password hashing (Argon2id, PHC string format).

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::config::PasswordConfig;

/// Hashes and verifies local passwords.
///
/// Holds a decoy hash made with the same parameters so a login for an
/// unknown username can run the same verification work as a wrong password.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    decoy_hash: String,
}

impl PasswordHasher {
    /// Build a hasher with the configured Argon2 cost parameters.
    pub fn new(config: &PasswordConfig) -> Result<Self, HashError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| HashError::InvalidParams(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy_hash = hash_with(&argon2, "decoy-password-never-matches")?;

        Ok(Self { argon2, decoy_hash })
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        hash_with(&self.argon2, password)
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// Unparseable hashes never verify.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Run a verification against the decoy hash and report failure.
    ///
    /// Used when the account lookup finds nothing.
    pub fn verify_decoy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.decoy_hash);
        false
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError::HashFailed(e.to_string()))
}

/// Error type for password hashing operations
#[derive(Debug, Clone, PartialEq)]
pub enum HashError {
    /// Argon2 cost parameters rejected
    InvalidParams(String),
    /// Hashing failed
    HashFailed(String),
}

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashError::InvalidParams(msg) => write!(f, "Invalid password hash parameters: {}", msg),
            HashError::HashFailed(msg) => write!(f, "Hash failed: {}", msg),
        }
    }
}

impl std::error::Error for HashError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_is_argon2id() {
        let hasher = fast_hasher();
        let hash = hasher.hash("secret1").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("secret1"));
    }

    #[test]
    fn test_verify_correct_and_wrong_password() {
        let hasher = fast_hasher();
        let hash = hasher.hash("secret1").unwrap();

        assert!(hasher.verify("secret1", &hash));
        assert!(!hasher.verify("secret2", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn test_same_password_different_hashes() {
        let hasher = fast_hasher();

        let first = hasher.hash("secret1").unwrap();
        let second = hasher.hash("secret1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_hash_never_verifies() {
        let hasher = fast_hasher();

        assert!(!hasher.verify("secret1", ""));
        assert!(!hasher.verify("secret1", "not-a-phc-string"));
    }

    #[test]
    fn test_decoy_never_verifies() {
        let hasher = fast_hasher();

        assert!(!hasher.verify_decoy("decoy-password-never-matches"));
        assert!(!hasher.verify_decoy("anything"));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordHasher::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(HashError::InvalidParams(_))));
    }
}
