//! Summary statistics for a viewline.

use crate::grid::ProbabilityGrid;
use crate::payload::{Coordinate, Hemisphere, ViewlineMetrics};
use crate::smoothing::round2;

/// Derive metrics from a coordinate sequence and its source grid.
///
/// An empty sequence yields `count == 0` with all numeric fields null.
/// `median_lat` is the true median (mean of the middle pair for even
/// counts); `mean_prob_line` samples the grid at each coordinate's nearest
/// cell, clamped to grid bounds.
pub fn compute(
    coords: &[Coordinate],
    hemisphere: Hemisphere,
    grid: Option<&ProbabilityGrid>,
) -> ViewlineMetrics {
    if coords.is_empty() {
        return ViewlineMetrics {
            count: 0,
            hemisphere: hemisphere.as_str().to_string(),
            ..Default::default()
        };
    }

    let mut lats: Vec<f64> = coords.iter().map(|c| c.lat).collect();
    lats.sort_by(|a, b| a.total_cmp(b));
    let mid = lats.len() / 2;
    let median_lat = if lats.len() % 2 == 1 {
        lats[mid]
    } else {
        (lats[mid - 1] + lats[mid]) / 2.0
    };

    ViewlineMetrics {
        min_lat: Some(lats[0]),
        median_lat: Some(median_lat),
        mean_prob_line: grid.and_then(|g| mean_probability(coords, g)),
        count: coords.len(),
        hemisphere: hemisphere.as_str().to_string(),
    }
}

/// Average grid probability at each coordinate's nearest row/column, or
/// `None` when the grid is absent/empty or no coordinate hits a valid cell.
fn mean_probability(coords: &[Coordinate], grid: &ProbabilityGrid) -> Option<f64> {
    if grid.is_empty() {
        return None;
    }
    let max_row = grid.height() as i64 - 1;
    let max_col = grid.width() as i64 - 1;
    let mut sum = 0.0;
    let mut samples = 0usize;
    for point in coords {
        let row = ((90.0 - point.lat).round() as i64).clamp(0, max_row) as usize;
        let col = ((point.lon + 180.0).round() as i64).clamp(0, max_col) as usize;
        if let Some(prob) = grid.get(row, col) {
            sum += prob;
            samples += 1;
        }
    }
    (samples > 0).then(|| round2(sum / samples as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lon: f64, lat: f64) -> Coordinate {
        Coordinate { lon, lat }
    }

    #[test]
    fn test_empty_line_all_null() {
        let metrics = compute(&[], Hemisphere::North, None);
        assert_eq!(metrics.count, 0);
        assert_eq!(metrics.min_lat, None);
        assert_eq!(metrics.median_lat, None);
        assert_eq!(metrics.mean_prob_line, None);
        assert_eq!(metrics.hemisphere, "north");
    }

    #[test]
    fn test_median_odd_and_even() {
        let odd = compute(
            &[point(-180.0, 66.0), point(-179.0, 64.0), point(-178.0, 65.0)],
            Hemisphere::North,
            None,
        );
        assert_eq!(odd.median_lat, Some(65.0));
        assert_eq!(odd.min_lat, Some(64.0));

        let even = compute(
            &[point(-180.0, 60.0), point(-179.0, 70.0)],
            Hemisphere::North,
            None,
        );
        assert_eq!(even.median_lat, Some(65.0));
    }

    #[test]
    fn test_mean_probability_nearest_cell() {
        // Grid row 0 is latitude 90; column index is lon + 180.
        let grid = ProbabilityGrid::from_rows(vec![vec![10.0, 20.0], vec![30.0, 40.0]]);
        let metrics = compute(
            &[point(-180.0, 90.0), point(-179.0, 89.0)],
            Hemisphere::North,
            Some(&grid),
        );
        // Samples grid[0][0]=10 and grid[1][1]=40.
        assert_eq!(metrics.mean_prob_line, Some(25.0));
    }

    #[test]
    fn test_mean_probability_clamps_out_of_range() {
        let grid = ProbabilityGrid::from_rows(vec![vec![12.0]]);
        let metrics = compute(&[point(170.0, -88.0)], Hemisphere::South, Some(&grid));
        assert_eq!(metrics.mean_prob_line, Some(12.0));
    }

    #[test]
    fn test_mean_probability_absent_grid() {
        let metrics = compute(&[point(-180.0, 66.0)], Hemisphere::North, None);
        assert_eq!(metrics.mean_prob_line, None);
        assert_eq!(metrics.count, 1);
        assert_eq!(metrics.min_lat, Some(66.0));
    }
}
