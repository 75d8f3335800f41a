//! CanvasReel Playback Engine
//!
//! Drives the logical playhead and keeps every media source in step with it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                     Player                       │
//! │  ┌────────────────┐   ┌────────────────────────┐ │
//! │  │ PlaybackEngine │──▶│ TimelineStore          │ │
//! │  │ (logical clock)│   │ (playhead, tracks)     │ │
//! │  └───────┬────────┘   └───────────┬────────────┘ │
//! │          ▼                        ▼              │
//! │  ┌────────────────┐   ┌────────────────────────┐ │
//! │  │ reconcile()    │──▶│ MediaPool              │ │
//! │  │ (drift/seek)   │   │ (one source per asset) │ │
//! │  └───────┬────────┘   └────────────────────────┘ │
//! │          ▼                                       │
//! │  ┌────────────────────────────────────────────┐  │
//! │  │ FramePresenter (compositor + rasterizer)   │  │
//! │  └────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Each tick runs advance → reconcile → present, in that order.

pub mod error;
pub mod media;
pub mod pool;
pub mod scheduler;
pub mod sync;

pub use error::*;
pub use media::*;
pub use pool::*;
pub use scheduler::*;
pub use sync::*;
