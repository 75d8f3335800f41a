//! Errors raised by structural model operations.

use std::path::PathBuf;

use crate::clip::ClipKind;
use crate::ids::{AssetId, ClipId, MarkerId, TrackId};
use crate::track::TrackKind;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Unknown clip: {0}")]
    UnknownClip(ClipId),

    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),

    #[error("Unknown asset: {0}")]
    UnknownAsset(AssetId),

    #[error("Unknown marker: {0}")]
    UnknownMarker(MarkerId),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Invalid clip {clip}: {reason}")]
    InvalidClip { clip: ClipId, reason: String },

    #[error("Track {track} ({track_kind:?}) does not accept {clip_kind:?} clips")]
    IncompatibleTrack {
        track: TrackId,
        track_kind: TrackKind,
        clip_kind: ClipKind,
    },

    #[error("No track accepts {0:?} clips")]
    NoCompatibleTrack(ClipKind),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<ModelError> for canvasreel_common::ReelError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Io { source, .. } => Self::Io(source),
            other => Self::model(other.to_string()),
        }
    }
}
