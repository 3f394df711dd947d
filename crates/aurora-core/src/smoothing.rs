//! Centered moving-average smoothing for viewline latitude sequences.

use crate::payload::Coordinate;

/// Promote a configured window to the effective odd window, minimum 3.
pub fn effective_window(configured: usize) -> usize {
    if configured < 3 {
        3
    } else if configured % 2 == 0 {
        configured + 1
    } else {
        configured
    }
}

/// Round to 2 decimal places for payload storage.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Replace each point's latitude with the arithmetic mean of latitudes
/// within the centered window. Edges use fewer neighbors; there is no
/// wraparound or padding. Longitudes pass through unchanged.
///
/// `window` must already be the effective odd window.
pub fn smooth_latitudes(coords: &[Coordinate], window: usize) -> Vec<Coordinate> {
    let half = window / 2;
    coords
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let start = i.saturating_sub(half);
            let end = (i + half).min(coords.len() - 1);
            let sum: f64 = coords[start..=end].iter().map(|p| p.lat).sum();
            Coordinate {
                lon: point.lon,
                lat: sum / (end - start + 1) as f64,
            }
        })
        .collect()
}

/// Smooth a viewline and round coordinates to 2 decimals for storage.
pub fn smooth_and_round(coords: &[Coordinate], window: usize) -> Vec<Coordinate> {
    smooth_latitudes(coords, window)
        .into_iter()
        .map(|point| Coordinate {
            lon: round2(point.lon),
            lat: round2(point.lat),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(lats: &[f64]) -> Vec<Coordinate> {
        lats.iter()
            .enumerate()
            .map(|(i, &lat)| Coordinate {
                lon: i as f64 - 180.0,
                lat,
            })
            .collect()
    }

    #[test]
    fn test_window_parity() {
        assert_eq!(effective_window(0), 3);
        assert_eq!(effective_window(2), 3);
        assert_eq!(effective_window(3), 3);
        assert_eq!(effective_window(4), 5);
        assert_eq!(effective_window(5), 5);
        assert_eq!(effective_window(6), 7);
    }

    #[test]
    fn test_moving_average_interior_and_edges() {
        let smoothed = smooth_latitudes(&line(&[0.0, 10.0, 20.0]), 3);
        // Edges average over the two available neighbors only.
        assert_eq!(smoothed[0].lat, 5.0);
        assert_eq!(smoothed[1].lat, 10.0);
        assert_eq!(smoothed[2].lat, 15.0);
    }

    #[test]
    fn test_longitudes_unchanged() {
        let input = line(&[60.0, 62.0, 64.0, 66.0]);
        let smoothed = smooth_latitudes(&input, 3);
        for (a, b) in input.iter().zip(&smoothed) {
            assert_eq!(a.lon, b.lon);
        }
    }

    #[test]
    fn test_empty_and_single_point() {
        assert!(smooth_latitudes(&[], 5).is_empty());
        let single = smooth_latitudes(&line(&[45.0]), 5);
        assert_eq!(single[0].lat, 45.0);
    }

    #[test]
    fn test_rounding() {
        let rounded = smooth_and_round(&[Coordinate { lon: -179.005, lat: 66.666 }], 3);
        assert_eq!(rounded[0].lon, -179.01);
        assert_eq!(rounded[0].lat, 66.67);
    }
}
