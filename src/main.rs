use anyhow::{Context, Result};
use bitview::accounts::{AccountService, AccountStore};
use bitview::api::{create_app, AppState};
use bitview::auth::{PasswordHasher, SessionTokens};
use bitview::config::{load_config, BitviewConfig, Secrets};
use bitview::credentials::CredentialCipher;
use bitview::upstream::{BitbucketClient, UpstreamProxy};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "bitview.toml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bitview=info".into()),
        )
        .init();

    info!("bitview starting...");

    let config = load_configuration()?;

    // Missing or invalid secrets stop the process before anything is served
    let secrets = Secrets::from_env().context("Refusing to start without secrets")?;
    let cipher = CredentialCipher::from_base64(&secrets.crypto_secret)
        .context("CRYPTO_SECRET must be base64 of 32 bytes")?;
    let sessions = Arc::new(SessionTokens::new(
        &secrets.jwt_secret,
        config.session.token_ttl_seconds,
    ));
    let hasher = PasswordHasher::new(&config.password).context("Invalid [password] settings")?;

    let store = AccountStore::new(&config.database.path)
        .with_context(|| format!("Failed to open account database {}", config.database.path))?;
    info!(path = %config.database.path, "Account store ready");

    let client = BitbucketClient::new(&config.upstream).context("Failed to build Bitbucket client")?;
    info!(base_url = %config.upstream.base_url, "Bitbucket client ready");

    let store = Arc::new(store);
    let cipher = Arc::new(cipher);

    let state = AppState {
        accounts: AccountService::new(
            Arc::clone(&store),
            Arc::new(hasher),
            Arc::clone(&sessions),
            Arc::clone(&cipher),
        ),
        proxy: UpstreamProxy::new(store, cipher, Arc::new(client)),
        sessions,
    };

    let app = create_app(state, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("bitview stopped");
    Ok(())
}

/// Config file from BITVIEW_CONFIG (or ./bitview.toml), then env overrides.
fn load_configuration() -> Result<BitviewConfig> {
    let explicit = std::env::var("BITVIEW_CONFIG").ok();
    let path = explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

    let mut config = if Path::new(path).exists() {
        info!(path = %path, "Loading configuration");
        load_config(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e))?
    } else if explicit.is_some() {
        anyhow::bail!("Config file {} not found", path);
    } else {
        info!("No config file found, using defaults");
        BitviewConfig::default()
    };

    config.apply_env_overrides();
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
