//! Imported media assets.
//!
//! Assets are owned by the asset-library collaborator; the timeline only
//! keeps this read-only view keyed by [`AssetId`].

use serde::{Deserialize, Serialize};

use crate::ids::AssetId;

/// Kind of media an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Audio,
    Image,
}

impl AssetKind {
    /// Whether clips of this kind are bounded by the source duration.
    pub fn is_trimmable(self) -> bool {
        matches!(self, AssetKind::Video | AssetKind::Audio)
    }

    /// Whether the source produces pixels.
    pub fn is_visual(self) -> bool {
        matches!(self, AssetKind::Video | AssetKind::Image)
    }
}

/// An imported media source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,

    /// Display name.
    pub name: String,

    pub kind: AssetKind,

    /// Playable source reference (a path relative to the project root or an
    /// absolute path).
    pub source: String,

    /// Native duration in seconds. Still images carry a placeholder.
    pub duration: f64,

    /// Native pixel dimensions, when known.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Asset {
    pub fn new(
        id: impl Into<AssetId>,
        name: impl Into<String>,
        kind: AssetKind,
        source: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            source: source.into(),
            duration,
            width: None,
            height: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Upper bound for `start_offset + duration` of clips using this asset,
    /// or `None` when the asset can be stretched indefinitely.
    pub fn trim_limit(&self) -> Option<f64> {
        self.kind.is_trimmable().then_some(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_limit_only_for_time_based_media() {
        let video = Asset::new("v", "clip.mp4", AssetKind::Video, "clip.mp4", 12.0);
        let image = Asset::new("i", "still.png", AssetKind::Image, "still.png", 5.0);
        assert_eq!(video.trim_limit(), Some(12.0));
        assert_eq!(image.trim_limit(), None);
    }

    #[test]
    fn test_asset_kind_serialization() {
        let json = serde_json::to_string(&AssetKind::Image).unwrap();
        assert_eq!(json, "\"image\"");
    }
}
