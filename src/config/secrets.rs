/// Process secrets, read once at startup.
///
/// Both are required: the server refuses to start without them.
#[derive(Clone)]
pub struct Secrets {
    /// Session token signing secret (`JWT_SECRET`)
    pub jwt_secret: String,
    /// Base64 32-byte key for upstream passwords (`CRYPTO_SECRET`)
    pub crypto_secret: String,
}

pub const JWT_SECRET_VAR: &str = "JWT_SECRET";
pub const CRYPTO_SECRET_VAR: &str = "CRYPTO_SECRET";

impl Secrets {
    /// Build from env vars. Missing or blank values are an error.
    pub fn from_env() -> Result<Self, SecretsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SecretsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(SecretsError::Missing(name))
        };

        Ok(Self {
            jwt_secret: read(JWT_SECRET_VAR)?,
            crypto_secret: read(CRYPTO_SECRET_VAR)?,
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("jwt_secret", &"<redacted>")
            .field("crypto_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretsError {
    /// Required environment variable not set
    Missing(&'static str),
}

impl std::fmt::Display for SecretsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretsError::Missing(name) => {
                write!(f, "Required secret {} is not set", name)
            }
        }
    }
}

impl std::error::Error for SecretsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_both_secrets_present() {
        let secrets = Secrets::from_lookup(lookup_from(&[
            ("JWT_SECRET", "jwt"),
            ("CRYPTO_SECRET", "crypto"),
        ]))
        .unwrap();

        assert_eq!(secrets.jwt_secret, "jwt");
        assert_eq!(secrets.crypto_secret, "crypto");
    }

    #[test]
    fn test_missing_jwt_secret() {
        let result = Secrets::from_lookup(lookup_from(&[("CRYPTO_SECRET", "crypto")]));
        assert_eq!(result.unwrap_err(), SecretsError::Missing("JWT_SECRET"));
    }

    #[test]
    fn test_blank_crypto_secret() {
        let result = Secrets::from_lookup(lookup_from(&[
            ("JWT_SECRET", "jwt"),
            ("CRYPTO_SECRET", "   "),
        ]));
        assert_eq!(result.unwrap_err(), SecretsError::Missing("CRYPTO_SECRET"));
    }

    #[test]
    fn test_debug_redacts_values() {
        let secrets = Secrets {
            jwt_secret: "jwt-value".to_string(),
            crypto_secret: "crypto-value".to_string(),
        };

        let debug = format!("{:?}", secrets);
        assert!(!debug.contains("jwt-value"));
        assert!(!debug.contains("crypto-value"));
    }
}
