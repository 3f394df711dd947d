//! Multi-format parsing of upstream OVATION grid documents.
//!
//! The upstream endpoint has shipped three different JSON shapes over time:
//! a nested-slice shape (`Data[0].North` / `Data[0].South`), a direct shape
//! (sibling `north` / `south` grids) and a flattened shape (a `coordinates`
//! array of `[lon, lat, probability]` triplets). Each shape gets a
//! structural probe; probes run in a fixed order and the first match wins.

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::error::ParseError;
use crate::grid::{self, ProbabilityGrid};

/// Dense-grid dimensions for the flattened-triplet reconstruction:
/// latitude rows 0..=180 mapping +90..-90, longitude columns 0..=359.
const TRIPLET_ROWS: usize = 181;
const TRIPLET_COLS: usize = 360;

/// Which structural probe matched the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridSource {
    NestedSlice,
    Direct,
    FlattenedTriplets,
}

impl GridSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NestedSlice => "nested_slice",
            Self::Direct => "direct",
            Self::FlattenedTriplets => "flattened_triplets",
        }
    }
}

/// Per-hemisphere grids plus document metadata.
#[derive(Debug, Clone)]
pub struct ParsedGrids {
    pub north: Option<ProbabilityGrid>,
    pub south: Option<ProbabilityGrid>,
    /// Observation timestamp, ISO-8601, when the document carried one.
    pub observed_at: Option<String>,
    /// Kp value embedded in the grid document (nested-slice shape only).
    pub kp_hint: Option<f64>,
    /// Number of triplets scattered into the dense grids (flattened shape).
    pub filled_points: Option<usize>,
    pub source: GridSource,
}

impl ParsedGrids {
    /// The grid for one hemisphere, treating an empty grid as absent.
    pub fn hemisphere(&self, north: bool) -> Option<&ProbabilityGrid> {
        let grid = if north { self.north.as_ref() } else { self.south.as_ref() };
        grid.filter(|g| !g.is_empty())
    }
}

/// Probe the document against the known shapes, in order.
pub fn parse_grid_document(body: &Value) -> Result<ParsedGrids, ParseError> {
    try_nested_slice(body)
        .or_else(|| try_direct(body))
        .or_else(|| try_flattened_triplets(body))
        .ok_or(ParseError::UnrecognizedFormat)
}

/// Strict numeric read: numbers and numeric strings, nothing coerced.
fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Shape (a): `{"Data": [{"North": [...], "South": [...], "Date": ..., "Time": ..., "KP": ...}]}`.
fn try_nested_slice(body: &Value) -> Option<ParsedGrids> {
    let entry = body.get("Data")?.as_array()?.first()?;
    let north = entry.get("North").map(grid::normalize);
    let south = entry.get("South").map(grid::normalize);
    if north.is_none() && south.is_none() {
        return None;
    }
    Some(ParsedGrids {
        north,
        south,
        observed_at: combine_date_time(entry.get("Date"), entry.get("Time")),
        kp_hint: entry.get("KP").and_then(value_f64),
        filled_points: None,
        source: GridSource::NestedSlice,
    })
}

/// Shape (b): `{"north": [...], "south": [...], "time": "..."}`.
fn try_direct(body: &Value) -> Option<ParsedGrids> {
    let north = body.get("north")?.as_array()?;
    let south = body.get("south")?.as_array()?;
    Some(ParsedGrids {
        north: Some(grid::normalize(&Value::Array(north.clone()))),
        south: Some(grid::normalize(&Value::Array(south.clone()))),
        observed_at: body.get("time").and_then(Value::as_str).map(String::from),
        kp_hint: None,
        filled_points: None,
        source: GridSource::Direct,
    })
}

/// Shape (c): `{"coordinates": [[lon, lat, probability], ...]}`.
///
/// Triplets are scattered into two dense 181x360 grids by rounding to the
/// nearest cell; `lat >= 0` goes north, everything else south. Out-of-range
/// rows/columns and malformed triplets are dropped. Longitudes use the raw
/// 0-359 convention, without normalizing to the -180..180 range.
fn try_flattened_triplets(body: &Value) -> Option<ParsedGrids> {
    let triplets = body.get("coordinates")?.as_array()?;

    let mut north = vec![vec![0.0; TRIPLET_COLS]; TRIPLET_ROWS];
    let mut south = vec![vec![0.0; TRIPLET_COLS]; TRIPLET_ROWS];
    let mut filled = 0usize;

    for triplet in triplets {
        let Some(cells) = triplet.as_array() else { continue };
        if cells.len() < 3 {
            continue;
        }
        let (Some(lon), Some(lat), Some(prob)) = (
            value_f64(&cells[0]),
            value_f64(&cells[1]),
            value_f64(&cells[2]),
        ) else {
            continue;
        };

        let row = (90.0 - lat).round();
        let col = lon.rem_euclid(360.0).round();
        if !(0.0..=180.0).contains(&row) || !(0.0..=359.0).contains(&col) {
            continue;
        }

        let target = if lat >= 0.0 { &mut north } else { &mut south };
        target[row as usize][col as usize] = prob;
        filled += 1;
    }

    let observed_at = body
        .get("Observation Time")
        .or_else(|| body.get("Forecast Time"))
        .and_then(Value::as_str)
        .map(String::from);

    Some(ParsedGrids {
        north: Some(ProbabilityGrid::from_rows(north)),
        south: Some(ProbabilityGrid::from_rows(south)),
        observed_at,
        kp_hint: None,
        filled_points: Some(filled),
        source: GridSource::FlattenedTriplets,
    })
}

/// Combine separate date and time fields into a UTC ISO-8601 timestamp.
fn combine_date_time(date: Option<&Value>, time: Option<&Value>) -> Option<String> {
    let date = date?.as_str()?.trim();
    let time = time?.as_str()?.trim();
    let combined = format!("{date} {time}");
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&combined, fmt) {
            return Some(naive.and_utc().to_rfc3339());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_slice_shape() {
        let body = json!({
            "Data": [{
                "North": [[0, 5], [10, 20]],
                "South": [[1, 2], [3, 4]],
                "Date": "2024-01-01",
                "Time": "06:30",
                "KP": 4.33
            }]
        });
        let parsed = parse_grid_document(&body).unwrap();
        assert_eq!(parsed.source, GridSource::NestedSlice);
        assert_eq!(parsed.north.as_ref().unwrap().get(1, 1), Some(20.0));
        assert_eq!(parsed.south.as_ref().unwrap().get(0, 0), Some(1.0));
        assert_eq!(parsed.kp_hint, Some(4.33));
        assert_eq!(
            parsed.observed_at.as_deref(),
            Some("2024-01-01T06:30:00+00:00")
        );
    }

    #[test]
    fn test_direct_shape() {
        let body = json!({
            "north": [[0, 0, 20], [0, 0, 0]],
            "south": [[0, 0, 0], [0, 0, 20]],
            "time": "2024-01-01T00:00:00Z"
        });
        let parsed = parse_grid_document(&body).unwrap();
        assert_eq!(parsed.source, GridSource::Direct);
        assert_eq!(parsed.north.as_ref().unwrap().get(0, 2), Some(20.0));
        assert_eq!(parsed.observed_at.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_flattened_triplets_shape() {
        let body = json!({
            "coordinates": [
                [0, 90, 7],
                [359, 65, 42],
                [10, -65, 33],
                [10, 91, 99],      // latitude out of range, dropped
                [359.7, 50, 12],   // column rounds to 360, dropped
                ["x", 50, 12]      // malformed, dropped
            ],
            "Observation Time": "2024-01-01T00:00:00Z"
        });
        let parsed = parse_grid_document(&body).unwrap();
        assert_eq!(parsed.source, GridSource::FlattenedTriplets);
        assert_eq!(parsed.filled_points, Some(3));

        let north = parsed.north.as_ref().unwrap();
        let south = parsed.south.as_ref().unwrap();
        assert_eq!(north.width(), 360);
        assert_eq!(north.height(), 181);
        // (0, 90) -> row 0, col 0; (359, 65) -> row 25, col 359
        assert_eq!(north.get(0, 0), Some(7.0));
        assert_eq!(north.get(25, 359), Some(42.0));
        // (10, -65) -> row 155, col 10, southern grid
        assert_eq!(south.get(155, 10), Some(33.0));
        assert_eq!(north.get(155, 10), Some(0.0));
        assert_eq!(parsed.observed_at.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_equator_goes_north() {
        let body = json!({"coordinates": [[5, 0, 11]]});
        let parsed = parse_grid_document(&body).unwrap();
        assert_eq!(parsed.north.as_ref().unwrap().get(90, 5), Some(11.0));
        assert_eq!(parsed.south.as_ref().unwrap().get(90, 5), Some(0.0));
    }

    #[test]
    fn test_format_parity_nested_vs_direct() {
        let rows_n = json!([[0, 5, 10], [15, 20, 25]]);
        let rows_s = json!([[1, 2, 3], [4, 5, 6]]);
        let nested = parse_grid_document(&json!({
            "Data": [{"North": rows_n, "South": rows_s}]
        }))
        .unwrap();
        let direct = parse_grid_document(&json!({
            "north": rows_n,
            "south": rows_s,
            "time": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        for row in 0..2 {
            for col in 0..3 {
                assert_eq!(
                    nested.north.as_ref().unwrap().get(row, col),
                    direct.north.as_ref().unwrap().get(row, col)
                );
                assert_eq!(
                    nested.south.as_ref().unwrap().get(row, col),
                    direct.south.as_ref().unwrap().get(row, col)
                );
            }
        }
    }

    #[test]
    fn test_format_parity_triplets() {
        // A sampled cell expressed as a triplet must agree with the same
        // value placed in a direct grid at the matching row/column.
        let body = json!({"coordinates": [[200, 63, 37.5]]});
        let parsed = parse_grid_document(&body).unwrap();
        // row = 90 - 63 = 27, col = 200
        assert_eq!(parsed.north.as_ref().unwrap().get(27, 200), Some(37.5));
    }

    #[test]
    fn test_unrecognized_shape_fails() {
        let err = parse_grid_document(&json!({"weather": "cloudy"})).unwrap_err();
        assert_eq!(err, ParseError::UnrecognizedFormat);
    }

    #[test]
    fn test_empty_hemisphere_reported_absent() {
        let body = json!({"north": [], "south": [[1]], "time": "t"});
        let parsed = parse_grid_document(&body).unwrap();
        assert!(parsed.hemisphere(true).is_none());
        assert!(parsed.hemisphere(false).is_some());
    }
}
