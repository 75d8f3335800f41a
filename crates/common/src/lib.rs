//! CanvasReel Common Utilities
//!
//! Shared infrastructure for all CanvasReel crates:
//! - Error types and result aliases
//! - Time sources, drift measurement, and frame pacing for the playback loop
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
