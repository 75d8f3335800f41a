//! Track lanes.

use serde::{Deserialize, Serialize};

use crate::asset::AssetKind;
use crate::clip::{Clip, ClipKind};
use crate::ids::{ClipId, TrackId};

/// Kind of clips a track holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
}

impl TrackKind {
    /// Track compatibility: video lanes take video and image clips, audio
    /// lanes take audio, text lanes take text.
    pub fn accepts(self, clip: ClipKind) -> bool {
        matches!(
            (self, clip),
            (TrackKind::Video, ClipKind::Video | ClipKind::Image)
                | (TrackKind::Audio, ClipKind::Audio)
                | (TrackKind::Text, ClipKind::Text)
        )
    }

    pub fn accepts_asset(self, asset: AssetKind) -> bool {
        self.accepts(ClipKind::from(asset))
    }
}

/// A horizontal lane of clips. Index 0 in the track list is the topmost
/// compositing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub kind: TrackKind,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_hidden: bool,
    /// Clips in insertion order (not necessarily sorted by time).
    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(id: impl Into<TrackId>, name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            is_muted: false,
            is_hidden: false,
            clips: Vec::new(),
        }
    }

    /// The lanes a fresh project starts with.
    pub fn default_set() -> Vec<Track> {
        vec![
            Track::new("track-text", "Text Overlay", TrackKind::Text),
            Track::new("track-1", "Video 1", TrackKind::Video),
            Track::new("track-2", "Video 2", TrackKind::Video),
            Track::new("track-3", "Audio 1", TrackKind::Audio),
        ]
    }

    pub fn clip(&self, id: &ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| &c.id == id)
    }

    pub(crate) fn position(&self, id: &ClipId) -> Option<usize> {
        self.clips.iter().position(|c| &c.id == id)
    }

    /// End of the last clip on this track, or 0 for an empty track.
    pub fn content_end(&self) -> f64 {
        self.clips.iter().map(Clip::end_time).fold(0.0, f64::max)
    }
}
