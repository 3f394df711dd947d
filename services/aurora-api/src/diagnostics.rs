//! Structured per-run refresh diagnostics.
//!
//! One record per orchestrator invocation, accumulated through the run and
//! committed at every exit point. Commit consumes the recorder, so a second
//! commit for the same run cannot compile.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::store::{DurableStore, DIAGNOSTICS_KEY};

/// Error codes recorded on a refresh run.
pub mod codes {
    pub const OVATION_FETCH_FAILED: &str = "ovation_fetch_failed";
    pub const GRID_PARSE_FAILED: &str = "grid_parse_failed";
    pub const KP_PARSE_FAILED: &str = "kp_parse_failed";
}

/// Point counts and Kp values from a successful build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub north_points: Option<usize>,
    pub south_points: Option<usize>,
    pub kp: Option<f64>,
    pub kp_time: Option<String>,
}

/// The persisted record of one refresh cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshDiagnostics {
    pub run_id: String,
    pub started_at: String,
    pub ovation_url: String,
    pub kp_url: String,
    pub duration_ms: u64,
    pub cache_hit: bool,
    pub cache_updated: bool,
    pub fallback: bool,
    /// Ordered error codes; see [`codes`].
    pub errors: Vec<String>,
    /// Ordered human-readable trace entries.
    pub trace: Vec<String>,
    /// hemisphere -> observation timestamp of the cached payload, if any.
    pub cache_before: BTreeMap<String, Option<String>>,
    pub cache_after: BTreeMap<String, Option<String>>,
    pub summary: RunSummary,
}

/// Builder accumulated through a single orchestrator run.
pub struct DiagnosticsRecorder {
    record: RefreshDiagnostics,
    started: Instant,
}

impl DiagnosticsRecorder {
    pub fn new(ovation_url: &str, kp_url: &str) -> Self {
        Self {
            record: RefreshDiagnostics {
                run_id: Uuid::new_v4().to_string(),
                started_at: Utc::now().to_rfc3339(),
                ovation_url: ovation_url.to_string(),
                kp_url: kp_url.to_string(),
                duration_ms: 0,
                cache_hit: false,
                cache_updated: false,
                fallback: false,
                errors: Vec::new(),
                trace: Vec::new(),
                cache_before: BTreeMap::new(),
                cache_after: BTreeMap::new(),
                summary: RunSummary::default(),
            },
            started: Instant::now(),
        }
    }

    pub fn error(&mut self, code: &str) {
        self.record.errors.push(code.to_string());
    }

    pub fn trace(&mut self, message: impl Into<String>) {
        self.record.trace.push(message.into());
    }

    pub fn cache_before(&mut self, snapshot: BTreeMap<String, Option<String>>) {
        self.record.cache_before = snapshot;
    }

    pub fn cache_after(&mut self, snapshot: BTreeMap<String, Option<String>>) {
        self.record.cache_after = snapshot;
    }

    pub fn cache_hit(&mut self) {
        self.record.cache_hit = true;
    }

    pub fn cache_updated(&mut self) {
        self.record.cache_updated = true;
    }

    pub fn fallback(&mut self) {
        self.record.fallback = true;
    }

    pub fn summary(&mut self, summary: RunSummary) {
        self.record.summary = summary;
    }

    /// Stamp the duration, persist the record and publish it to the
    /// in-memory slot. Consuming `self` guarantees one commit per run;
    /// persistence failures are logged, never propagated.
    pub async fn commit(
        mut self,
        store: &dyn DurableStore,
        slot: &RwLock<Option<RefreshDiagnostics>>,
    ) -> RefreshDiagnostics {
        self.record.duration_ms = self.started.elapsed().as_millis() as u64;

        match serde_json::to_string(&self.record) {
            Ok(json) => {
                if let Err(e) = store.set(DIAGNOSTICS_KEY, &json).await {
                    warn!(error = %e, "Failed to persist refresh diagnostics");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize refresh diagnostics"),
        }

        *slot.write().await = Some(self.record.clone());
        self.record
    }
}
