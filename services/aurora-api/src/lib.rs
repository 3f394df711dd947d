//! Aurora nowcast service library.
//!
//! This module exposes the internal modules for testing purposes.

pub mod assets;
pub mod config;
pub mod diagnostics;
pub mod fetch;
pub mod refresh;
pub mod scheduler;
pub mod server;
pub mod sinks;
pub mod state;
pub mod store;
