//! HTTP API for the aurora nowcast service.
//!
//! Provides endpoints for:
//! - `GET /aurora/nowcast?hemi=north|south` - Cached hemisphere payload
//! - `GET /aurora/viewline/:slot` - Forecast image fetch status
//! - `GET /aurora/diagnostics` - Most recent refresh diagnostics
//! - `POST /aurora/fetch-now` - Synchronous refresh
//! - `POST /aurora/cron-run` - Synchronous refresh + asset refresh
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use aurora_core::payload::Hemisphere;

use crate::assets::AssetSlot;
use crate::sinks::artifact_name;
use crate::state::AppState;
use crate::store::DIAGNOSTICS_KEY;

#[derive(Debug, Deserialize)]
struct NowcastQuery {
    hemi: Option<String>,
}

/// GET /aurora/nowcast - Cached payload for one hemisphere
async fn nowcast_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<NowcastQuery>,
) -> impl IntoResponse {
    let hemisphere = match query.hemi.as_deref() {
        None => Some(Hemisphere::North),
        Some(raw) => Hemisphere::parse(raw),
    };
    let Some(hemisphere) = hemisphere else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_hemisphere"})),
        );
    };

    if let Some(payload) = state.orchestrator.cached_payload(hemisphere).await {
        return (
            StatusCode::OK,
            Json(serde_json::to_value(&payload).unwrap_or_default()),
        );
    }

    // Last fallback: a previously exported artifact file.
    if let Some(body) = state.artifacts.read(&artifact_name(hemisphere)).await {
        if let Ok(value) = serde_json::from_str::<Value>(&body) {
            return (StatusCode::OK, Json(value));
        }
    }

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "no_data"})),
    )
}

/// GET /aurora/viewline/:slot - Forecast image fetch status
async fn viewline_asset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(slot): Path<String>,
) -> impl IntoResponse {
    let Some(slot) = AssetSlot::parse(&slot) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "unknown_slot"})),
        );
    };

    match state.assets.status(slot).await {
        Some(status) => (
            StatusCode::OK,
            Json(serde_json::to_value(&status).unwrap_or_default()),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "no_data"})),
        ),
    }
}

/// GET /aurora/diagnostics - Most recent refresh diagnostics
async fn diagnostics_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let record = match state.last_diagnostics.read().await.clone() {
        Some(record) => Some(record),
        None => state
            .store
            .get(DIAGNOSTICS_KEY)
            .await
            .ok()
            .flatten()
            .and_then(|json| serde_json::from_str(&json).ok()),
    };
    let Some(record) = record else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "no_data"})),
        );
    };

    let mut value = serde_json::to_value(&record).unwrap_or_default();
    // Normalized sub-object for dashboard consumption.
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "aurora".to_string(),
            json!({
                "cache_before": record.cache_before,
                "cache_after": record.cache_after,
                "errors": record.errors,
                "trace": record.trace,
            }),
        );
    }
    (StatusCode::OK, Json(value))
}

/// POST /aurora/fetch-now - Synchronously run one refresh cycle
async fn fetch_now_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    info!("Manual refresh triggered");
    let outcome = state.run_refresh().await;
    Json(serde_json::to_value(&outcome).unwrap_or_default())
}

/// POST /aurora/cron-run - Refresh grid and forecast image assets
async fn cron_run_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    info!("Manual cron run triggered");
    let outcome = state.run_refresh().await;
    state.assets.refresh_all().await;

    Json(json!({
        "refresh": outcome,
        "assets": {
            "tonight": state.assets.status(AssetSlot::Tonight).await,
            "tomorrow": state.assets.status(AssetSlot::Tomorrow).await,
        }
    }))
}

/// GET /health - Health check
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "aurora-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/aurora/nowcast", get(nowcast_handler))
        .route("/aurora/viewline/:slot", get(viewline_asset_handler))
        .route("/aurora/diagnostics", get(diagnostics_handler))
        .route("/aurora/fetch-now", post(fetch_now_handler))
        .route("/aurora/cron-run", post(cron_run_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

/// Start the HTTP server.
pub async fn start_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, "Starting aurora HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
