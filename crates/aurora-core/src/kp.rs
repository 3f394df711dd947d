//! Planetary K-index time-series parsing.

use chrono::DateTime;
use serde_json::Value;

/// The most recent valid Kp observation.
#[derive(Debug, Clone, PartialEq)]
pub struct KpReading {
    pub kp: f64,
    /// ISO-8601 when the upstream row carried an epoch, otherwise the raw
    /// timestamp string passed through unchanged.
    pub kp_time: String,
}

/// Extract the last row in iteration order whose Kp cell is numeric and
/// non-empty from an array of `[timestamp, kp, ...]` rows.
///
/// Rows with a blank or non-numeric Kp cell are skipped, which also skips
/// the header row the upstream feed puts first. Returns `None` when no
/// valid row exists.
pub fn latest_kp(body: &Value) -> Option<KpReading> {
    let rows = body.as_array()?;
    let mut latest = None;
    for row in rows {
        let Some(cells) = row.as_array() else { continue };
        if cells.len() < 2 {
            continue;
        }
        let Some(kp) = numeric_cell(&cells[1]) else { continue };
        let Some(kp_time) = timestamp_cell(&cells[0]) else { continue };
        latest = Some(KpReading { kp, kp_time });
    }
    latest
}

fn numeric_cell(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp_cell(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => {
            let epoch = n.as_f64()?;
            DateTime::from_timestamp(epoch as i64, 0).map(|dt| dt.to_rfc3339())
        }
        _ => None,
    }
}
