//! OVATION aurora grid parsing and viewline extraction.
//!
//! This crate holds the numeric/geometric core of the aurora nowcast
//! pipeline, free of any I/O:
//!
//! - **Grid reconstruction**: the upstream endpoint has shipped three
//!   different JSON shapes over time; [`formats`] probes them in order and
//!   produces per-hemisphere [`grid::ProbabilityGrid`]s.
//! - **Viewline extraction**: [`viewline`] scans each longitude column for
//!   the threshold crossing, interpolating between samples, with a bounded
//!   lower-threshold salvage cascade for the north hemisphere.
//! - **Post-processing**: [`smoothing`] (centered moving average),
//!   [`metrics`] (min/median latitude, mean probability along the line) and
//!   [`contours`] (the viewline recomputed at fixed probability levels).
//! - **Kp index**: [`kp`] extracts the most recent valid reading from the
//!   planetary K-index time series.

pub mod contours;
pub mod error;
pub mod formats;
pub mod grid;
pub mod kp;
pub mod metrics;
pub mod payload;
pub mod smoothing;
pub mod viewline;

pub use error::ParseError;
pub use grid::ProbabilityGrid;
pub use payload::{Coordinate, ContourLine, Hemisphere, HemispherePayload, ViewlineMetrics};
