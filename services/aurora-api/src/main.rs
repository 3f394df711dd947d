//! Aurora nowcast service.
//!
//! Ingests the OVATION probability grid on a fixed cadence, derives the
//! per-hemisphere viewline and auxiliary contour families, and serves the
//! cached product over HTTP with fallback-to-last-good semantics:
//! - Conditional fetch (ETag) against the upstream grid endpoint
//! - Multi-format grid reconstruction and threshold-crossing extraction
//! - Volatile + durable caching with stale fallback on upstream failure
//! - Structured per-run diagnostics

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use aurora_api::assets::AssetRefresher;
use aurora_api::config::{Args, AuroraConfig};
use aurora_api::fetch::{ConditionalFetch, HttpFetcher};
use aurora_api::refresh::Orchestrator;
use aurora_api::sinks::ArtifactSink;
use aurora_api::state::AppState;
use aurora_api::store::{DurableStore, MemoryCache, SqliteStore, VolatileCache};
use aurora_api::{scheduler, server};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting aurora nowcast service");

    let config = AuroraConfig::from_args(&args);

    let store: Arc<dyn DurableStore> =
        Arc::new(SqliteStore::open(&args.state_dir.join("aurora.db")).await?);
    let cache: Arc<dyn VolatileCache> = Arc::new(MemoryCache::new());
    let fetcher: Arc<dyn ConditionalFetch> = Arc::new(HttpFetcher::new()?);

    let orchestrator = Orchestrator::new(
        config.clone(),
        fetcher.clone(),
        cache.clone(),
        store.clone(),
    );
    let last_diagnostics = orchestrator.last_diagnostics();
    let assets = AssetRefresher::new(
        fetcher.clone(),
        store.clone(),
        config.tonight_url.clone(),
        config.tomorrow_url.clone(),
    );

    let state = Arc::new(AppState {
        artifacts: ArtifactSink::new(config.export_dir.clone()),
        config,
        orchestrator,
        assets,
        store,
        last_diagnostics,
        refresh_lock: Mutex::new(()),
    });

    if args.once {
        // Single run mode
        info!("Running single refresh cycle");
        let outcome = state.run_refresh().await;
        state.assets.refresh_all().await;
        info!(
            duration_ms = outcome.diagnostics.duration_ms,
            errors = ?outcome.diagnostics.errors,
            cache_updated = outcome.diagnostics.cache_updated,
            "Refresh cycle complete"
        );
        return Ok(());
    }

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start the HTTP server
    let server_state = state.clone();
    let port = args.port;
    tokio::spawn(async move {
        if let Err(e) = server::start_server(server_state, port).await {
            tracing::error!(error = %e, "HTTP server failed");
        }
    });

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    scheduler::run(state, shutdown_tx.subscribe()).await;

    Ok(())
}
