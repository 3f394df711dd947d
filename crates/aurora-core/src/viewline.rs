//! Viewline extraction: per-column threshold-crossing scan with linear
//! interpolation between samples, plus the bounded lower-threshold salvage
//! cascade for the north hemisphere.

use std::ops::RangeInclusive;

use crate::grid::ProbabilityGrid;
use crate::payload::{Coordinate, Hemisphere};

/// Guard against division by zero when interpolating between samples.
const EPSILON: f64 = 1e-9;

/// Floor for the first salvage retry threshold.
const SALVAGE_FLOOR: f64 = 0.03;

/// Fixed threshold for the final salvage retry.
const SALVAGE_LAST_RESORT: f64 = 0.01;

/// Extraction result carrying both the requested threshold and the one
/// actually used, so consumers can tell a salvage occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewlineResult {
    pub coords: Vec<Coordinate>,
    pub effective_p: f64,
    pub requested_p: f64,
}

/// Scale a caller threshold onto the grid's 0-100 probability scale.
fn grid_scale(threshold: f64) -> f64 {
    if threshold <= 1.0 {
        threshold * 100.0
    } else {
        threshold
    }
}

/// Row range for one column scan. The north hemisphere walks from the pole
/// (row 0, latitude +90) toward the equator; the south walks from the
/// equator (row 90) toward the pole (row 180). Both are clamped to the
/// grid's actual height.
fn scan_rows(hemisphere: Hemisphere, height: usize) -> RangeInclusive<usize> {
    let last = height - 1;
    match hemisphere {
        Hemisphere::North => 0..=last.min(90),
        Hemisphere::South => last.min(90)..=last.min(180),
    }
}

/// Extract the viewline at a single threshold.
///
/// Each longitude column is scanned independently; on the first row whose
/// probability reaches the threshold the latitude is recorded, linearly
/// interpolated against the previous sample when one exists below the
/// threshold. Columns with no crossing contribute no point. Missing cells
/// read as probability zero.
pub fn extract_viewline(
    grid: &ProbabilityGrid,
    hemisphere: Hemisphere,
    threshold: f64,
) -> Vec<Coordinate> {
    if grid.is_empty() {
        return Vec::new();
    }
    let t = grid_scale(threshold);
    let mut coords = Vec::new();

    for col in 0..grid.width() {
        let mut prev: Option<(f64, f64)> = None; // (lat, prob)
        for row in scan_rows(hemisphere, grid.height()) {
            let prob = grid.value_or_zero(row, col);
            let lat = 90.0 - row as f64;
            if prob >= t {
                let lat = match prev {
                    Some((prev_lat, prev_prob)) if prev_prob < t => {
                        let ratio =
                            ((t - prev_prob) / (prob - prev_prob).max(EPSILON)).clamp(0.0, 1.0);
                        prev_lat + (lat - prev_lat) * ratio
                    }
                    _ => lat,
                };
                coords.push(Coordinate {
                    lon: col as f64 - 180.0,
                    lat,
                });
                break;
            }
            prev = Some((lat, prob));
        }
    }
    coords
}

/// Ordered threshold candidates for the salvage cascade, consumed until one
/// yields a non-empty line: the requested threshold, then
/// `max(0.03, requested - 0.02)`, then a fixed 0.01. Thresholds at or below
/// 0.03 get no retries.
pub fn threshold_candidates(requested: f64) -> Vec<f64> {
    let mut candidates = vec![requested];
    if requested > SALVAGE_FLOOR {
        let salvage = (requested - 0.02).max(SALVAGE_FLOOR);
        candidates.push(salvage);
        if salvage > SALVAGE_LAST_RESORT {
            candidates.push(SALVAGE_LAST_RESORT);
        }
    }
    candidates
}

/// Extract a viewline, retrying at progressively lower thresholds when the
/// requested one yields an empty line. Salvage applies to the north
/// hemisphere only; the south always uses the requested threshold.
pub fn extract_with_salvage(
    grid: &ProbabilityGrid,
    hemisphere: Hemisphere,
    requested: f64,
) -> ViewlineResult {
    let candidates = match hemisphere {
        Hemisphere::North => threshold_candidates(requested),
        Hemisphere::South => vec![requested],
    };

    let mut result = ViewlineResult {
        coords: Vec::new(),
        effective_p: requested,
        requested_p: requested,
    };
    for threshold in candidates {
        result.effective_p = threshold;
        result.coords = extract_viewline(grid, hemisphere, threshold);
        if !result.coords.is_empty() {
            break;
        }
    }
    result
}
