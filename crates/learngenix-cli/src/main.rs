//! LearnGenix CLI - a terminal client for the LearnGenix learning platform.
//!
//! Restores the previous session on startup, then runs one command
//! (login, dashboard, practice, exercise management) against the backend.

mod commands;
mod format;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use learngenix_core::{open_token_store, ApiClient, ApiConfig, Config, SessionManager, SessionState};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Cli, Command};

/// Environment variable selecting the token store when no flag is given
const ENV_TOKEN_STORE: &str = "LEARNGENIX_TOKEN_STORE";

/// Prefix of the daily log files in the cache directory
const LOG_FILE_PREFIX: &str = "learngenix.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and to a daily file in `log_dir`. The returned guard
/// flushes the file writer when dropped.
fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    // Use RUST_LOG to control the level (e.g. RUST_LOG=learngenix_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = Cli::parse(&args)?;

    if cli.command == Command::Help {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config ({}), using defaults", e);
        Config::default()
    });
    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));

    let _log_guard = init_tracing(&cache_dir.join("logs"));
    info!("LearnGenix CLI starting");

    let backend = match cli.token_backend {
        Some(backend) => backend,
        None => match std::env::var(ENV_TOKEN_STORE) {
            Ok(value) => value
                .parse()
                .with_context(|| format!("Invalid {}", ENV_TOKEN_STORE))?,
            Err(_) => config.token_backend,
        },
    };
    debug!(?backend, "Using token store");

    let api_config = ApiConfig::from_env()?;
    let tokens = open_token_store(backend, &api_config, &cache_dir);
    let api = ApiClient::new(api_config, tokens)?;
    let session = SessionManager::new(api);

    match session.bootstrap().await {
        SessionState::Authenticated(user) => info!(email = %user.email, "Session restored"),
        state => debug!(?state, "Starting without a session"),
    }

    let result = commands::run(cli.command, &session, &mut config).await;
    if let Err(ref e) = result {
        warn!(error = %e, "Command failed");
    }

    info!("LearnGenix CLI shutting down");
    result
}
