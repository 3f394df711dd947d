//! Auxiliary contour families: the viewline recomputed at a configured
//! list of fixed probability levels, for overlay visualization.

use crate::grid::ProbabilityGrid;
use crate::payload::{ContourLine, Hemisphere};
use crate::smoothing::smooth_and_round;
use crate::viewline::extract_viewline;

/// Normalize a configured level into `(0, 1]`. Values above 1 are read as
/// percentages and divided by 100; anything still out of range is rejected.
pub fn normalize_level(raw: f64) -> Option<f64> {
    let level = if raw > 1.0 { raw / 100.0 } else { raw };
    (level > 0.0 && level <= 1.0).then_some(level)
}

/// Build the contour family for one hemisphere.
///
/// `levels` must already be normalized, ascending and deduplicated (the
/// configuration layer owns that). Each level runs the plain extractor (no
/// salvage) followed by smoothing and rounding; lines with fewer than 2
/// points are discarded. Output preserves input level order.
pub fn build_contours(
    grid: &ProbabilityGrid,
    hemisphere: Hemisphere,
    levels: &[f64],
    window: usize,
) -> Vec<ContourLine> {
    let mut contours = Vec::with_capacity(levels.len());
    for &level in levels {
        let coords = smooth_and_round(&extract_viewline(grid, hemisphere, level), window);
        if coords.len() < 2 {
            continue;
        }
        contours.push(ContourLine {
            probability: level,
            coords,
        });
    }
    contours
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level(0.25), Some(0.25));
        assert_eq!(normalize_level(25.0), Some(0.25));
        assert_eq!(normalize_level(1.0), Some(1.0));
        assert_eq!(normalize_level(0.0), None);
        assert_eq!(normalize_level(-0.1), None);
        assert_eq!(normalize_level(150.0), None);
    }

    #[test]
    fn test_short_lines_discarded() {
        // Only one column crosses at any level: every line has 1 point and
        // the family comes back empty.
        let grid = ProbabilityGrid::from_rows(vec![vec![50.0, 0.0, 0.0]]);
        let contours = build_contours(&grid, Hemisphere::North, &[0.1, 0.25], 3);
        assert!(contours.is_empty());
    }

    #[test]
    fn test_levels_preserved_in_order() {
        let grid = ProbabilityGrid::from_rows(vec![vec![60.0, 60.0, 60.0]]);
        let contours = build_contours(&grid, Hemisphere::North, &[0.1, 0.5], 3);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].probability, 0.1);
        assert_eq!(contours[1].probability, 0.5);
        assert_eq!(contours[0].coords.len(), 3);
    }

    #[test]
    fn test_level_above_grid_maximum_dropped() {
        let grid = ProbabilityGrid::from_rows(vec![vec![30.0, 30.0]]);
        let contours = build_contours(&grid, Hemisphere::North, &[0.1, 0.75], 3);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].probability, 0.1);
    }
}
