//! Selection state.

use serde::{Deserialize, Serialize};

use crate::ids::{ClipId, MarkerId};

/// Selected clips (in selection order) plus at most one marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub clips: Vec<ClipId>,
    pub marker: Option<MarkerId>,
}

impl Selection {
    pub fn contains(&self, id: &ClipId) -> bool {
        self.clips.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty() && self.marker.is_none()
    }

    /// Add `id` unless already present.
    pub fn insert(&mut self, id: ClipId) {
        if !self.contains(&id) {
            self.clips.push(id);
        }
    }

    pub fn remove(&mut self, id: &ClipId) {
        self.clips.retain(|c| c != id);
    }

    pub fn clear(&mut self) {
        self.clips.clear();
        self.marker = None;
    }
}
