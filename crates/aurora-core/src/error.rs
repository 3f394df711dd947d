//! Error types for grid parsing.

use thiserror::Error;

/// Errors produced while reconstructing grids from an upstream document.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The document matched none of the known grid shapes.
    #[error("no recognized grid format in upstream document")]
    UnrecognizedFormat,
}
