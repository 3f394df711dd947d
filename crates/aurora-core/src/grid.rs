//! Probability grid container and normalization of raw nested arrays.

use serde_json::Value;

/// Rectangular grid of aurora visibility probabilities on a 0-100 scale.
///
/// Row 0 corresponds to latitude +90; row indices increase southward.
/// `width` is taken from the first row and is authoritative: upstream
/// payloads are occasionally ragged, so rows are kept at their original
/// length and cell access is guarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilityGrid {
    width: usize,
    rows: Vec<Vec<f64>>,
}

impl ProbabilityGrid {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        Self { width, rows }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.width == 0
    }

    /// Cell value, or `None` when the row is absent or shorter than `width`.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Cell value with missing cells treated as probability zero.
    pub fn value_or_zero(&self, row: usize, col: usize) -> f64 {
        self.get(row, col).unwrap_or(0.0)
    }
}

/// Coerce a JSON scalar to f64, treating non-numeric values as 0.0.
fn coerce_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Convert a raw nested JSON array into a [`ProbabilityGrid`].
///
/// Width is the length of the first row. Shorter rows are not padded;
/// readers treat missing cells as zero. Non-numeric cells become 0.0.
pub fn normalize(raw: &Value) -> ProbabilityGrid {
    let rows = raw
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(coerce_f64).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();
    ProbabilityGrid::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_rectangular() {
        let grid = normalize(&json!([[0, 1, 2], [3, 4, 5]]));
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(1, 2), Some(5.0));
    }

    #[test]
    fn test_normalize_ragged_keeps_short_rows() {
        let grid = normalize(&json!([[1, 2, 3], [4]]));
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.get(1, 0), Some(4.0));
        assert_eq!(grid.get(1, 2), None);
        assert_eq!(grid.value_or_zero(1, 2), 0.0);
    }

    #[test]
    fn test_normalize_coerces_non_numeric() {
        let grid = normalize(&json!([["1.5", null, "x", true]]));
        assert_eq!(grid.get(0, 0), Some(1.5));
        assert_eq!(grid.get(0, 1), Some(0.0));
        assert_eq!(grid.get(0, 2), Some(0.0));
        assert_eq!(grid.get(0, 3), Some(0.0));
    }

    #[test]
    fn test_normalize_non_array_is_empty() {
        let grid = normalize(&json!({"not": "a grid"}));
        assert!(grid.is_empty());
        assert_eq!(grid.height(), 0);
    }
}
