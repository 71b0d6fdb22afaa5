//! Main entry point for the lobby presence server.

use lobby_server::{cli, config, server, store};

use anyhow::Context;
use clap::Parser;
use config::Config;
use server::AppState;
use std::path::PathBuf;

/// Minimal server entrypoint: parse CLI args, open the store and run the server.
///
/// Usage:
///   lobby-server [--config PATH] [--bind ADDR] [--database FILE]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::ServerCli::parse();

    // If debug is on: show everything at DEBUG level
    // If debug is off: our crates at INFO, everything else at WARN
    let log_filter = if cli.debug {
        "debug".to_string()
    } else {
        "lobby_server=info,lobby_shared=info,tower_http=warn,warn".to_string()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(cli.debug)
        .with_thread_ids(cli.debug)
        .with_file(cli.debug)
        .with_line_number(cli.debug)
        .init();

    let config_path: PathBuf = cli.config.clone();

    // Load or create config file (creates file if missing).
    let mut cfg = Config::load_or_create(&config_path)
        .with_context(|| format!("loading or creating config '{}'", config_path.display()))?;

    // Apply CLI overrides in-memory (non-persistent by default)
    if let Some(bind) = cli.bind {
        cfg.bind = bind;
    }
    if let Some(db) = cli.database {
        cfg.use_sqlite(db);
    }

    if cli.persist {
        cfg.save(&config_path)
            .with_context(|| format!("saving updated config '{}'", config_path.display()))?;
    }

    tracing::info!(config = %config_path.display(), backend = ?cfg.store.backend);

    let store = store::open_store(&cfg.store).context("opening membership store")?;
    if cfg.store.purge_on_start {
        let purged = store
            .purge_members()
            .await
            .context("purging stale memberships")?;
        if purged > 0 {
            tracing::warn!(purged, "removed memberships left over from a previous run");
        }
    }

    let addr = cfg.bind;
    let state = AppState::new(store);

    server::run_server(addr, state).await?;
    Ok(())
}
