//! `minutes` binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the API client and the file-backed session
//! 4. Restore the session from the stored credential
//! 5. Run the requested command

mod cli;
mod commands;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use minutes_api::ApiClient;
use minutes_core::{MinutesConfig, MinutesError};
use minutes_session::{FileCredentialStore, SessionManager};

use crate::cli::CliArgs;
use crate::commands::App;

/// Load the config file if present. A broken file falls back to defaults;
/// the error is returned so it can be logged once tracing is up.
fn load_config(path: &Path) -> (MinutesConfig, Option<MinutesError>) {
    if !path.exists() {
        return (MinutesConfig::default(), None);
    }
    match MinutesConfig::load(path) {
        Ok(config) => (config, None),
        Err(e) => (MinutesConfig::default(), Some(e)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Configuration.
    let config_file = args.resolve_config_path();
    let (config, config_error) = load_config(&config_file);

    // Tracing. RUST_LOG wins over the configured level.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    match config_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Invalid config file; using defaults"
        ),
        None => tracing::debug!(path = %config_file.display(), "Configuration loaded"),
    }

    // API client.
    let base_url = args.resolve_server(&config.server.base_url);
    let timeout = match config.server.request_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let api = ApiClient::with_timeout(&base_url, timeout)?;
    tracing::debug!(base_url = %api.base_url(), "API client ready");

    // Session.
    let credential_path = config.session.resolved_credential_path();
    let store = Arc::new(FileCredentialStore::new(credential_path));
    let session = Arc::new(SessionManager::new(api.clone(), store));
    session.initialize().await;

    App { session, api }.run(args.command).await
}
