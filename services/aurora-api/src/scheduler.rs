//! Fixed-cadence refresh loop.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::state::AppState;

/// Run grid and asset refreshes on their configured intervals until a
/// shutdown signal arrives. The first tick of each interval fires
/// immediately, priming the cache at startup.
pub async fn run(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    let mut grid_tick = tokio::time::interval(state.config.refresh_interval);
    let mut asset_tick = tokio::time::interval(state.config.asset_interval);

    info!(
        refresh_interval_secs = state.config.refresh_interval.as_secs(),
        asset_interval_secs = state.config.asset_interval.as_secs(),
        "Scheduler started"
    );

    loop {
        tokio::select! {
            _ = grid_tick.tick() => {
                let outcome = state.run_refresh().await;
                if outcome.diagnostics.errors.is_empty() {
                    info!(
                        duration_ms = outcome.diagnostics.duration_ms,
                        cache_hit = outcome.diagnostics.cache_hit,
                        cache_updated = outcome.diagnostics.cache_updated,
                        "Scheduled refresh complete"
                    );
                } else {
                    error!(
                        errors = ?outcome.diagnostics.errors,
                        fallback = outcome.diagnostics.fallback,
                        "Scheduled refresh completed with errors"
                    );
                }
            }
            _ = asset_tick.tick() => {
                state.assets.refresh_all().await;
            }
            _ = shutdown.recv() => {
                info!("Scheduler shutting down");
                return;
            }
        }
    }
}
