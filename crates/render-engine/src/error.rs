//! Export errors.

use canvasreel_common::ReelError;

/// Anything that aborts an export. The timeline is left untouched and no
/// partial archive is produced.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Invalid export range: {start}s..{end}s")]
    InvalidRange { start: f64, end: f64 },

    #[error("Export start {start}s is past the end of the {duration}s timeline")]
    StartPastTimeline { start: f64, duration: f64 },

    #[error("Export frame rate must be positive")]
    InvalidFps,

    #[error("No supported capture codec (preferred {preferred:?}, recorder supports {supported:?})")]
    UnsupportedCodec {
        preferred: Vec<String>,
        supported: Vec<String>,
    },

    #[error("Capture produced no frames")]
    EmptyCapture,

    #[error("Recorder error: {0}")]
    Recorder(String),

    #[error("Seek to {0:.3}s timed out")]
    SeekTimeout(f64),

    #[error("Capture flush timed out")]
    FlushTimeout,

    #[error("Encoding frame {index} failed: {reason}")]
    Encode { index: u64, reason: String },

    #[error("Encoding frame {0} timed out")]
    EncodeTimeout(u64),

    #[error("Export cancelled")]
    Cancelled,

    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub fn recorder(msg: impl Into<String>) -> Self {
        Self::Recorder(msg.into())
    }
}

impl From<ExportError> for ReelError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Io(source) => Self::Io(source),
            other => Self::export(other.to_string()),
        }
    }
}
