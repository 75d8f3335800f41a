//! Media source errors.

use std::path::PathBuf;

use canvasreel_common::ReelError;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media source is not ready")]
    NotReady,

    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    #[error("Invalid seek target: {0}")]
    InvalidSeek(f64),

    #[error("Unsupported source {source_ref}: {reason}")]
    Unsupported { source_ref: String, reason: String },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MediaError {
    pub fn unsupported(source_ref: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            source_ref: source_ref.into(),
            reason: reason.into(),
        }
    }
}

impl From<MediaError> for ReelError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Io { source, .. } => Self::Io(source),
            other => Self::media(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_reel_error() {
        let err: ReelError = MediaError::InvalidSeek(f64::NAN).into();
        assert!(err.to_string().starts_with("Media error"));

        let err: ReelError = MediaError::Io {
            path: PathBuf::from("/tmp/clip"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }
        .into();
        assert!(matches!(err, ReelError::Io(_)));
    }
}
