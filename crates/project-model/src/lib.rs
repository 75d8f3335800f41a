//! CanvasReel Project Model
//!
//! Defines the core data contracts of the timeline editor:
//! - **Assets:** read-only view of imported media
//! - **Tracks & Clips:** time-positioned references to assets (or text)
//! - **Keyframes:** per-property animation control points
//! - **Markers, Selection, Drag sessions:** annotation and interaction state
//! - **Store:** the single-writer mutation store every component reads
//!
//! All times are in seconds. Track index 0 is the topmost compositing layer.

pub mod asset;
pub mod clip;
pub mod drag;
pub mod error;
pub mod ids;
pub mod keyframe;
pub mod marker;
pub mod project;
pub mod selection;
pub mod store;
pub mod track;

pub use asset::*;
pub use clip::*;
pub use drag::*;
pub use error::*;
pub use ids::*;
pub use keyframe::*;
pub use marker::*;
pub use project::*;
pub use selection::*;
pub use store::*;
pub use track::*;
