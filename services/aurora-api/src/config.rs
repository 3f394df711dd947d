//! Environment-style configuration for the aurora nowcast service.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use aurora_core::{contours, smoothing};

/// Lowest allowed cache TTL in seconds.
const MIN_CACHE_TTL_SECS: u64 = 60;

#[derive(Parser, Debug, Clone)]
#[command(name = "aurora-api")]
#[command(about = "Aurora nowcast service: OVATION grid ingestion and viewline extraction")]
pub struct Args {
    /// OVATION probability grid endpoint
    #[arg(
        long,
        env = "OVATION_URL",
        default_value = "https://services.swpc.noaa.gov/json/ovation_aurora_latest.json"
    )]
    pub ovation_url: String,

    /// Planetary K-index time-series endpoint
    #[arg(
        long,
        env = "KP_URL",
        default_value = "https://services.swpc.noaa.gov/products/noaa-planetary-k-index.json"
    )]
    pub kp_url: String,

    /// Tonight's static viewline forecast image
    #[arg(
        long,
        env = "VIEWLINE_TONIGHT_URL",
        default_value = "https://services.swpc.noaa.gov/experimental/images/aurora_dashboard/tonights_static_viewline_forecast.png"
    )]
    pub tonight_url: String,

    /// Tomorrow night's static viewline forecast image
    #[arg(
        long,
        env = "VIEWLINE_TOMORROW_URL",
        default_value = "https://services.swpc.noaa.gov/experimental/images/aurora_dashboard/tomorrow_nights_static_viewline_forecast.png"
    )]
    pub tomorrow_url: String,

    /// Volatile cache TTL in seconds (floor 60)
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "300")]
    pub cache_ttl_secs: u64,

    /// Viewline probability threshold (0-1, or a percentage above 1)
    #[arg(long, env = "VIEWLINE_PROBABILITY", default_value = "0.10")]
    pub viewline_probability: f64,

    /// North-hemisphere threshold override
    #[arg(long, env = "VIEWLINE_PROBABILITY_NORTH")]
    pub viewline_probability_north: Option<f64>,

    /// Smoothing window (forced odd, floor 3)
    #[arg(long, env = "SMOOTHING_WINDOW", default_value = "5")]
    pub smoothing_window: usize,

    /// Comma-separated contour probability levels
    #[arg(long, env = "CONTOUR_LEVELS", default_value = "0.1,0.25,0.5,0.75")]
    pub contour_levels: String,

    /// Enable JSON artifact export
    #[arg(long, env = "JSON_EXPORT")]
    pub json_export: bool,

    /// Directory for exported artifact JSON
    #[arg(long, env = "EXPORT_DIR", default_value = "/data/aurora/export")]
    pub export_dir: PathBuf,

    /// Downstream telemetry upsert endpoint
    #[arg(long, env = "TELEMETRY_URL")]
    pub telemetry_url: Option<String>,

    /// Directory for the durable key-value store
    #[arg(long, env = "STATE_DIR", default_value = "/data/aurora")]
    pub state_dir: PathBuf,

    /// HTTP listen port
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Seconds between grid refresh ticks
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "300")]
    pub refresh_interval_secs: u64,

    /// Seconds between viewline asset refresh ticks
    #[arg(long, env = "ASSET_INTERVAL_SECS", default_value = "3600")]
    pub asset_interval_secs: u64,

    /// Run one refresh cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Resolved runtime configuration with all bounds applied.
#[derive(Debug, Clone)]
pub struct AuroraConfig {
    pub ovation_url: String,
    pub kp_url: String,
    pub tonight_url: String,
    pub tomorrow_url: String,
    pub cache_ttl: Duration,
    /// Requested threshold on the 0-1 scale.
    pub viewline_probability: f64,
    /// North threshold, defaulting to the global one.
    pub north_probability: f64,
    /// Effective odd smoothing window.
    pub smoothing_window: usize,
    /// Normalized, ascending, deduplicated contour levels in (0, 1].
    pub contour_levels: Vec<f64>,
    pub json_export: bool,
    pub export_dir: PathBuf,
    pub telemetry_url: Option<String>,
    pub refresh_interval: Duration,
    pub asset_interval: Duration,
}

impl AuroraConfig {
    pub fn from_args(args: &Args) -> Self {
        let requested = normalize_threshold(args.viewline_probability);
        let north = args
            .viewline_probability_north
            .map(normalize_threshold)
            .unwrap_or(requested);

        Self {
            ovation_url: args.ovation_url.clone(),
            kp_url: args.kp_url.clone(),
            tonight_url: args.tonight_url.clone(),
            tomorrow_url: args.tomorrow_url.clone(),
            cache_ttl: Duration::from_secs(args.cache_ttl_secs.max(MIN_CACHE_TTL_SECS)),
            viewline_probability: requested,
            north_probability: north,
            smoothing_window: smoothing::effective_window(args.smoothing_window),
            contour_levels: parse_levels(&args.contour_levels),
            json_export: args.json_export,
            export_dir: args.export_dir.clone(),
            telemetry_url: args.telemetry_url.clone(),
            refresh_interval: Duration::from_secs(args.refresh_interval_secs),
            asset_interval: Duration::from_secs(args.asset_interval_secs),
        }
    }
}

/// Thresholds may arrive as percentages; bring them onto the 0-1 scale.
fn normalize_threshold(value: f64) -> f64 {
    if value > 1.0 {
        value / 100.0
    } else {
        value
    }
}

/// Parse a comma-separated level list into normalized, ascending,
/// deduplicated values in (0, 1]. Unparseable or out-of-range entries are
/// dropped.
fn parse_levels(raw: &str) -> Vec<f64> {
    let mut levels: Vec<f64> = raw
        .split(',')
        .filter_map(|part| part.trim().parse::<f64>().ok())
        .filter_map(contours::normalize_level)
        .collect();
    levels.sort_by(|a, b| a.total_cmp(b));
    levels.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    levels
}
