//! Refresh orchestrator: conditional fetch, format detection, payload
//! assembly, cache writes and fallback handling.
//!
//! One invocation walks Fetching -> {CacheHit, FetchFailed, ParseFailed,
//! Built}; every path commits exactly one diagnostics record. The
//! orchestrator holds no mutable state of its own and is re-entrant across
//! scheduler ticks.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use aurora_core::contours;
use aurora_core::formats::{self, ParsedGrids};
use aurora_core::grid::ProbabilityGrid;
use aurora_core::kp::{self, KpReading};
use aurora_core::metrics;
use aurora_core::payload::{
    kp_bucket, GridInfo, Hemisphere, HemispherePayload, ImageRefs, PayloadDiagnostics,
};
use aurora_core::smoothing;
use aurora_core::viewline;

use crate::config::AuroraConfig;
use crate::diagnostics::{codes, DiagnosticsRecorder, RefreshDiagnostics, RunSummary};
use crate::fetch::{ConditionalFetch, FetchResult};
use crate::sinks::{artifact_name, ArtifactSink, TelemetrySink};
use crate::store::{etag_key, payload_key, DurableStore, VolatileCache};

/// Result of one orchestrator invocation. A `None` hemisphere means
/// nothing could be served, not even from cache.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub north: Option<HemispherePayload>,
    pub south: Option<HemispherePayload>,
    pub diagnostics: RefreshDiagnostics,
}

pub struct Orchestrator {
    config: AuroraConfig,
    fetcher: Arc<dyn ConditionalFetch>,
    cache: Arc<dyn VolatileCache>,
    store: Arc<dyn DurableStore>,
    artifacts: Option<ArtifactSink>,
    telemetry: Option<TelemetrySink>,
    last_diagnostics: Arc<RwLock<Option<RefreshDiagnostics>>>,
}

impl Orchestrator {
    pub fn new(
        config: AuroraConfig,
        fetcher: Arc<dyn ConditionalFetch>,
        cache: Arc<dyn VolatileCache>,
        store: Arc<dyn DurableStore>,
    ) -> Self {
        let artifacts = config
            .json_export
            .then(|| ArtifactSink::new(config.export_dir.clone()));
        let telemetry = config.telemetry_url.clone().and_then(|url| {
            TelemetrySink::new(url)
                .map_err(|e| warn!(error = %e, "Telemetry sink disabled"))
                .ok()
        });

        Self {
            config,
            fetcher,
            cache,
            store,
            artifacts,
            telemetry,
            last_diagnostics: Arc::new(RwLock::new(None)),
        }
    }

    /// Shared slot holding the most recent committed diagnostics record.
    pub fn last_diagnostics(&self) -> Arc<RwLock<Option<RefreshDiagnostics>>> {
        self.last_diagnostics.clone()
    }

    /// Run one refresh cycle.
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut diag = DiagnosticsRecorder::new(&self.config.ovation_url, &self.config.kp_url);
        diag.cache_before(self.cache_snapshot().await);

        let validator = match self.store.get(&etag_key(&self.config.ovation_url)).await {
            Ok(token) => token,
            Err(e) => {
                diag.trace(format!("validator read failed: {e}"));
                None
            }
        };

        let mut result = match self
            .fetcher
            .fetch(&self.config.ovation_url, validator.as_deref())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                diag.error(codes::OVATION_FETCH_FAILED);
                diag.trace(format!("grid fetch error: {e}"));
                return self.fallback(diag).await;
            }
        };
        diag.trace(format!(
            "grid fetch status {} in {} ms",
            result.status, result.duration_ms
        ));

        if result.not_modified {
            let north = self.cached_payload(Hemisphere::North).await;
            let south = self.cached_payload(Hemisphere::South).await;
            if north.is_some() && south.is_some() {
                diag.cache_hit();
                diag.trace("upstream unchanged, serving cached payloads");
                diag.cache_after(self.cache_snapshot().await);
                let diagnostics = diag
                    .commit(self.store.as_ref(), &self.last_diagnostics)
                    .await;
                return RefreshOutcome {
                    north,
                    south,
                    diagnostics,
                };
            }

            // 304 with a cold cache leaves nothing to rebuild from;
            // refetch unconditionally.
            diag.trace("upstream unchanged but cache cold, refetching without validator");
            result = match self.fetcher.fetch(&self.config.ovation_url, None).await {
                Ok(result) => result,
                Err(e) => {
                    diag.error(codes::OVATION_FETCH_FAILED);
                    diag.trace(format!("grid refetch error: {e}"));
                    return self.fallback(diag).await;
                }
            };
        }

        if !result.is_success() || result.body.is_none() {
            diag.error(codes::OVATION_FETCH_FAILED);
            diag.trace(format!("grid fetch returned status {}", result.status));
            return self.fallback(diag).await;
        }

        let document: serde_json::Value =
            match serde_json::from_str(result.body.as_deref().unwrap_or_default()) {
                Ok(value) => value,
                Err(e) => {
                    diag.error(codes::OVATION_FETCH_FAILED);
                    diag.trace(format!("grid body was not valid JSON: {e}"));
                    return self.fallback(diag).await;
                }
            };

        let parsed = match formats::parse_grid_document(&document) {
            Ok(parsed) => parsed,
            Err(e) => {
                diag.error(codes::GRID_PARSE_FAILED);
                diag.trace(e.to_string());
                return self.fallback(diag).await;
            }
        };
        let (Some(north_grid), Some(south_grid)) =
            (parsed.hemisphere(true), parsed.hemisphere(false))
        else {
            diag.error(codes::GRID_PARSE_FAILED);
            diag.trace("one or both hemisphere grids missing or empty");
            return self.fallback(diag).await;
        };
        diag.trace(format!(
            "parsed {} document: north {}x{}, south {}x{}",
            parsed.source.as_str(),
            north_grid.width(),
            north_grid.height(),
            south_grid.width(),
            south_grid.height()
        ));
        if let Some(filled) = parsed.filled_points {
            diag.trace(format!("scattered {filled} triplets into dense grids"));
        }

        // Kp series, best effort: failure never aborts the run.
        let kp_reading = self.fetch_kp(&mut diag).await;
        let (kp, kp_time) = match &kp_reading {
            Some(reading) => (Some(reading.kp), Some(reading.kp_time.clone())),
            None => (parsed.kp_hint, None),
        };

        let observed_at = parsed
            .observed_at
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

        let north =
            self.build_payload(Hemisphere::North, north_grid, &parsed, &observed_at, kp, kp_time.as_deref(), &result);
        let south =
            self.build_payload(Hemisphere::South, south_grid, &parsed, &observed_at, kp, kp_time.as_deref(), &result);

        // Primary cache write: volatile + durable per hemisphere.
        self.store_payload(&north).await;
        self.store_payload(&south).await;

        if let Some(tag) = &result.etag {
            if let Err(e) = self
                .store
                .set(&etag_key(&self.config.ovation_url), tag)
                .await
            {
                warn!(error = %e, "Failed to persist validator token");
            }
        }

        // Best-effort side effects, after the cache write.
        if let Some(telemetry) = &self.telemetry {
            telemetry.upsert(&north).await;
            telemetry.upsert(&south).await;
        }
        if let Some(artifacts) = &self.artifacts {
            for payload in [&north, &south] {
                match serde_json::to_string_pretty(payload) {
                    Ok(json) => artifacts.write(&artifact_name(payload.hemisphere), &json).await,
                    Err(e) => warn!(error = %e, "Failed to serialize payload artifact"),
                }
            }
        }

        diag.cache_updated();
        diag.summary(RunSummary {
            north_points: Some(north.metrics.count),
            south_points: Some(south.metrics.count),
            kp,
            kp_time,
        });
        diag.cache_after(self.cache_snapshot().await);
        info!(
            north_points = north.metrics.count,
            south_points = south.metrics.count,
            kp = ?kp,
            viewline_p = north.viewline_p,
            "Refresh cycle built new payloads"
        );

        let diagnostics = diag
            .commit(self.store.as_ref(), &self.last_diagnostics)
            .await;
        RefreshOutcome {
            north: Some(north),
            south: Some(south),
            diagnostics,
        }
    }

    /// Read the last-good payload: volatile cache first, then the durable
    /// cache of last resort.
    pub async fn cached_payload(&self, hemisphere: Hemisphere) -> Option<HemispherePayload> {
        let key = payload_key(hemisphere);
        let json = match self.cache.get(&key).await {
            Some(json) => Some(json),
            None => self.store.get(&key).await.ok().flatten(),
        }?;
        serde_json::from_str(&json).ok()
    }

    async fn fetch_kp(&self, diag: &mut DiagnosticsRecorder) -> Option<KpReading> {
        let result = match self.fetcher.fetch(&self.config.kp_url, None).await {
            Ok(result) if result.is_success() && result.body.is_some() => result,
            Ok(result) => {
                diag.error(codes::KP_PARSE_FAILED);
                diag.trace(format!("kp fetch returned status {}", result.status));
                return None;
            }
            Err(e) => {
                diag.error(codes::KP_PARSE_FAILED);
                diag.trace(format!("kp fetch error: {e}"));
                return None;
            }
        };

        let series: serde_json::Value =
            match serde_json::from_str(result.body.as_deref().unwrap_or_default()) {
                Ok(value) => value,
                Err(e) => {
                    diag.error(codes::KP_PARSE_FAILED);
                    diag.trace(format!("kp body was not valid JSON: {e}"));
                    return None;
                }
            };

        match kp::latest_kp(&series) {
            Some(reading) => Some(reading),
            None => {
                diag.error(codes::KP_PARSE_FAILED);
                diag.trace("kp series held no valid rows");
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_payload(
        &self,
        hemisphere: Hemisphere,
        grid: &ProbabilityGrid,
        parsed: &ParsedGrids,
        observed_at: &str,
        kp: Option<f64>,
        kp_time: Option<&str>,
        fetch: &FetchResult,
    ) -> HemispherePayload {
        let requested = match hemisphere {
            Hemisphere::North => self.config.north_probability,
            Hemisphere::South => self.config.viewline_probability,
        };

        let line = viewline::extract_with_salvage(grid, hemisphere, requested);
        let coords = smoothing::smooth_and_round(&line.coords, self.config.smoothing_window);
        let line_metrics = metrics::compute(&coords, hemisphere, Some(grid));
        let contour_lines = contours::build_contours(
            grid,
            hemisphere,
            &self.config.contour_levels,
            self.config.smoothing_window,
        );

        HemispherePayload {
            observed_at: observed_at.to_string(),
            hemisphere,
            kp,
            kp_time: kp_time.map(String::from),
            kp_bucket: kp.map(|value| kp_bucket(value).to_string()),
            grid: GridInfo {
                width: grid.width(),
                height: grid.height(),
                source: parsed.source.as_str().to_string(),
            },
            viewline_p: line.effective_p,
            viewline_requested_p: line.requested_p,
            viewline: coords,
            metrics: line_metrics,
            images: ImageRefs {
                tonight: Some(self.config.tonight_url.clone()),
                tomorrow: Some(self.config.tomorrow_url.clone()),
            },
            contours: contour_lines,
            diagnostics: PayloadDiagnostics {
                fetch_ms: fetch.duration_ms,
                cache_hit: fetch.not_modified,
                source_url: self.config.ovation_url.clone(),
                kp_url: self.config.kp_url.clone(),
                fallback: false,
            },
        }
    }

    async fn store_payload(&self, payload: &HemispherePayload) {
        let key = payload_key(payload.hemisphere);
        match serde_json::to_string(payload) {
            Ok(json) => {
                self.cache
                    .set(&key, json.clone(), self.config.cache_ttl)
                    .await;
                if let Err(e) = self.store.set(&key, &json).await {
                    warn!(key = %key, error = %e, "Failed to write payload to durable store");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize payload"),
        }
    }

    /// Fallback path for FetchFailed and ParseFailed: re-serve the last
    /// good payload per hemisphere, stamped `fallback: true`, with its
    /// volatile TTL refreshed.
    async fn fallback(&self, mut diag: DiagnosticsRecorder) -> RefreshOutcome {
        diag.fallback();

        let north = self.fallback_payload(Hemisphere::North, &mut diag).await;
        let south = self.fallback_payload(Hemisphere::South, &mut diag).await;

        diag.cache_after(self.cache_snapshot().await);
        warn!(
            north_served = north.is_some(),
            south_served = south.is_some(),
            "Refresh cycle fell back to cached payloads"
        );

        let diagnostics = diag
            .commit(self.store.as_ref(), &self.last_diagnostics)
            .await;
        RefreshOutcome {
            north,
            south,
            diagnostics,
        }
    }

    async fn fallback_payload(
        &self,
        hemisphere: Hemisphere,
        diag: &mut DiagnosticsRecorder,
    ) -> Option<HemispherePayload> {
        match self.cached_payload(hemisphere).await {
            Some(mut payload) => {
                payload.diagnostics.fallback = true;
                // Re-writing refreshes the volatile TTL; the payload is
                // otherwise untouched.
                if let Ok(json) = serde_json::to_string(&payload) {
                    self.cache
                        .set(&payload_key(hemisphere), json, self.config.cache_ttl)
                        .await;
                }
                diag.trace(format!("{hemisphere} served from last-good cache"));
                Some(payload)
            }
            None => {
                diag.trace(format!("{hemisphere} has no cached payload, unserved"));
                None
            }
        }
    }

    /// hemisphere -> observation timestamp of whatever is currently cached.
    async fn cache_snapshot(&self) -> BTreeMap<String, Option<String>> {
        let mut snapshot = BTreeMap::new();
        for hemisphere in [Hemisphere::North, Hemisphere::South] {
            let observed = self
                .cached_payload(hemisphere)
                .await
                .map(|payload| payload.observed_at);
            snapshot.insert(hemisphere.as_str().to_string(), observed);
        }
        snapshot
    }
}
