//! Serialized product types: coordinates, contours, metrics and the
//! per-hemisphere payload that gets cached and served.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hemisphere tag used throughout the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "north" => Some(Self::North),
            "south" => Some(Self::South),
            _ => None,
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point on a viewline, in degrees. `lon` is in `[-180, 180)`.
///
/// Constructed only from successful threshold crossings; columns without a
/// crossing contribute no point at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

/// One auxiliary contour: the viewline recomputed at a fixed probability
/// level. Lines with fewer than 2 points are discarded before this type is
/// ever built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourLine {
    pub probability: f64,
    pub coords: Vec<Coordinate>,
}

/// Summary statistics for a viewline. All numeric fields are null when the
/// line is empty (`count == 0`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewlineMetrics {
    pub min_lat: Option<f64>,
    pub median_lat: Option<f64>,
    pub mean_prob_line: Option<f64>,
    pub count: usize,
    pub hemisphere: String,
}

/// Dimensions and provenance of the source grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridInfo {
    pub width: usize,
    pub height: usize,
    /// Which structural probe matched the upstream document.
    pub source: String,
}

/// Static forecast image references carried on the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRefs {
    pub tonight: Option<String>,
    pub tomorrow: Option<String>,
}

/// Per-payload fetch provenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadDiagnostics {
    pub fetch_ms: u64,
    pub cache_hit: bool,
    pub source_url: String,
    pub kp_url: String,
    /// Stamped true when the payload is re-served from cache during an
    /// upstream failure; the payload is otherwise never mutated.
    #[serde(default)]
    pub fallback: bool,
}

/// The complete derived product for one hemisphere: the unit of caching
/// and downstream persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HemispherePayload {
    /// Observation timestamp of the source grid, ISO-8601.
    pub observed_at: String,
    pub hemisphere: Hemisphere,
    pub kp: Option<f64>,
    pub kp_time: Option<String>,
    pub kp_bucket: Option<String>,
    pub grid: GridInfo,
    /// Threshold actually used after salvage.
    pub viewline_p: f64,
    /// Threshold originally requested by configuration.
    pub viewline_requested_p: f64,
    pub viewline: Vec<Coordinate>,
    pub metrics: ViewlineMetrics,
    pub images: ImageRefs,
    pub contours: Vec<ContourLine>,
    pub diagnostics: PayloadDiagnostics,
}

/// NOAA-style activity label for a Kp value.
pub fn kp_bucket(kp: f64) -> &'static str {
    if kp < 3.0 {
        "quiet"
    } else if kp < 4.0 {
        "unsettled"
    } else if kp < 5.0 {
        "active"
    } else if kp < 6.0 {
        "minor_storm"
    } else if kp < 7.0 {
        "moderate_storm"
    } else if kp < 8.0 {
        "strong_storm"
    } else if kp < 9.0 {
        "severe_storm"
    } else {
        "extreme_storm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hemisphere_parse() {
        assert_eq!(Hemisphere::parse("north"), Some(Hemisphere::North));
        assert_eq!(Hemisphere::parse("SOUTH"), Some(Hemisphere::South));
        assert_eq!(Hemisphere::parse("equator"), None);
    }

    #[test]
    fn test_hemisphere_serde_lowercase() {
        let json = serde_json::to_string(&Hemisphere::North).unwrap();
        assert_eq!(json, "\"north\"");
        let back: Hemisphere = serde_json::from_str("\"south\"").unwrap();
        assert_eq!(back, Hemisphere::South);
    }

    #[test]
    fn test_kp_buckets() {
        assert_eq!(kp_bucket(0.0), "quiet");
        assert_eq!(kp_bucket(3.67), "unsettled");
        assert_eq!(kp_bucket(4.33), "active");
        assert_eq!(kp_bucket(5.0), "minor_storm");
        assert_eq!(kp_bucket(9.0), "extreme_storm");
    }
}
