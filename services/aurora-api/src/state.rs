//! Shared application state for the HTTP server and scheduler.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::assets::AssetRefresher;
use crate::config::AuroraConfig;
use crate::diagnostics::RefreshDiagnostics;
use crate::refresh::{Orchestrator, RefreshOutcome};
use crate::sinks::ArtifactSink;
use crate::store::DurableStore;

pub struct AppState {
    pub config: AuroraConfig,
    pub orchestrator: Orchestrator,
    pub assets: AssetRefresher,
    pub store: Arc<dyn DurableStore>,
    /// Reader for previously exported payload artifacts, the read
    /// endpoint's last fallback.
    pub artifacts: ArtifactSink,
    pub last_diagnostics: Arc<RwLock<Option<RefreshDiagnostics>>>,
    /// Serializes refresh runs across scheduler ticks and manual triggers.
    pub refresh_lock: Mutex<()>,
}

impl AppState {
    /// Run one refresh cycle under the re-entrancy lock.
    pub async fn run_refresh(&self) -> RefreshOutcome {
        let _guard = self.refresh_lock.lock().await;
        self.orchestrator.refresh().await
    }
}
