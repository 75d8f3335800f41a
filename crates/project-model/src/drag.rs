//! Drag sessions: the frozen pre-drag state of every manipulated clip.

use serde::{Deserialize, Serialize};

use crate::ids::{ClipId, TrackId};

/// What a pointer drag does to the clips it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DragMode {
    Move,
    ResizeLeft,
    ResizeRight,
}

/// Snapshot of a clip taken at pointer-down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraggedClip {
    pub clip_id: ClipId,
    pub start_time: f64,
    pub duration: f64,
    pub start_offset: f64,
    pub track_id: TrackId,
}

/// Exists only between pointer-down and pointer-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragSession {
    pub mode: DragMode,
    /// Pointer x at pointer-down (screen pixels).
    pub start_x: f64,
    /// The clip under the pointer.
    pub primary: ClipId,
    pub clips: Vec<DraggedClip>,
}

impl DragSession {
    pub fn primary_clip(&self) -> Option<&DraggedClip> {
        self.clips.iter().find(|c| c.clip_id == self.primary)
    }

    pub fn holds(&self, id: &ClipId) -> bool {
        self.clips.iter().any(|c| &c.clip_id == id)
    }
}
