// sitevisits - self-hosted website visit tracker
//
// A small HTTP service that serves an embeddable tracking script, records
// the visits it reports into SQLite, and answers analytics queries over them.
//
// Architecture:
// - Server (axum): collection endpoint, client script, analytics API
// - Storage: pooled SQLite connections, one `visits` table
// - Query: listing, summary stats, trends and GROUP BY aggregates
// - User-Agent: bot detection and device/OS/browser classification
// - Config: env > ~/.config/sitevisits/config.toml > defaults

mod cli;
mod config;
mod logging;
mod query;
mod script;
mod server;
mod startup;
mod storage;
mod user_agent;

use anyhow::{Context, Result};
use config::Config;
use server::AppState;
use storage::VisitStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI subcommands first (exits early if a command was handled)
    if cli::handle_cli()? {
        return Ok(());
    }

    // Create default config file on first run (helps discoverability)
    Config::ensure_config_exists();

    // Load configuration from file + environment variables
    let config = Config::from_env()?;

    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard = logging::init_tracing(&config.logging);

    let store = if config.persist_visits() {
        let store = VisitStore::open(&config.storage.db_path).with_context(|| {
            format!(
                "Failed to open visit database at {}",
                config.storage.db_path.display()
            )
        })?;
        tracing::info!(
            "Visit database ready at {} (binding {})",
            store.path().display(),
            config.storage.binding
        );
        Some(store)
    } else {
        None
    };
    let storage_active = store.is_some();

    let state = AppState::new(&config, store);

    startup::print_startup(&config, storage_active);
    startup::log_startup(&config, storage_active);

    // Create shutdown channel for graceful server shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let mut server_handle = tokio::spawn(server::start_server(
        config.bind_addr,
        state,
        shutdown_rx,
    ));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
        }
        // Server exited on its own (bind failure or fatal error)
        result = &mut server_handle => {
            return result.context("Server task panicked")?;
        }
    }

    tracing::info!("Shutting down...");

    // If the send fails, the server has already shut down (which is fine)
    let _ = shutdown_tx.send(());
    server_handle.await.context("Server task panicked")??;

    tracing::info!("Shutdown complete");
    Ok(())
}
