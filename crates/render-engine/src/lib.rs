//! CanvasReel Render Engine
//!
//! Turns a timeline instant into pixels, and a timeline range into a zip of
//! numbered frame images.
//!
//! # Pipeline Architecture
//!
//! ```text
//! TimelineSnapshot ── compose ──► FrameComposition (ordered layers)
//!                                        │
//! MediaPool frames ──────────────────────┤
//! FontBook (text) ───────────────────────┤
//!                                        ▼
//!                          Rasterizer (fit, transform, filters)
//!                                        │
//!                                        ▼
//!                              CanvasPresenter surface
//!                                        │  FrameRecorder (recording)
//!                                        ▼
//!                                 CapturedStream
//!                                        │  IntermediateSource::seek (extracting)
//!                                        ▼
//!                        frame_00000.png … ──► FrameArchive (zip)
//! ```

pub mod archive;
pub mod capture;
pub mod compositor;
pub mod error;
pub mod export;
pub mod filters;
pub mod presenter;
pub mod raster;
pub mod text;

pub use archive::*;
pub use capture::*;
pub use compositor::*;
pub use error::*;
pub use export::*;
pub use filters::apply_filters;
pub use presenter::*;
pub use raster::*;
pub use text::*;
