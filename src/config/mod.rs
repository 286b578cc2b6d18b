pub mod secrets;
pub use secrets::{Secrets, SecretsError};

use serde::Deserialize;

/// Complete bitview configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitviewConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub password: PasswordConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Allow cross-origin requests from any origin (browser client on another port)
    #[serde(default = "default_cors_allow_any_origin")]
    pub cors_allow_any_origin: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_cors_allow_any_origin() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_allow_any_origin: default_cors_allow_any_origin(),
        }
    }
}

/// Account database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path (":memory:" for an ephemeral store)
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "bitview.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Bitbucket API client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,
    /// Per-request timeout for upstream calls
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_upstream_base_url() -> String {
    "https://api.bitbucket.org/2.0".to_string()
}

fn default_upstream_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("bitview/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            timeout_seconds: default_upstream_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Session token policy
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
}

fn default_token_ttl() -> u64 {
    24 * 60 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl_seconds: default_token_ttl(),
        }
    }
}

/// Argon2id cost parameters for local passwords.
///
/// Defaults match `argon2::Params::DEFAULT` (19 MiB, 2 passes, 1 lane).
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

impl BitviewConfig {
    /// Apply `BITVIEW_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BITVIEW_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Ok(v) = std::env::var("BITVIEW_DATABASE_PATH") {
            self.database.path = v;
        }
        if let Ok(v) = std::env::var("BITVIEW_UPSTREAM_BASE_URL") {
            self.upstream.base_url = v;
        }
        if let Ok(v) = std::env::var("BITVIEW_TOKEN_TTL_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.session.token_ttl_seconds = n;
            }
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<BitviewConfig, Box<dyn std::error::Error + Send + Sync>> {
    let contents = std::fs::read_to_string(path)?;
    let config: BitviewConfig = toml::from_str(&contents)?;
    Ok(config)
}
