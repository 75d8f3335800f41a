//! Live capture of the rendering surface and the intermediate stream it
//! produces.
//!
//! The recorder sees the canvas exactly as playback draws it. Encoded frames
//! are kept with their presentation timestamps so the extraction phase can
//! seek them like any other timed source.

use async_trait::async_trait;
use image::{ImageEncoder, RgbaImage};

use crate::error::ExportError;

const TIMESTAMP_EPSILON: f64 = 1e-6;

/// Frame encodings the in-memory recorder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCodec {
    /// Lossless PNG per frame.
    Png,
    /// Raw RGBA8 bytes.
    Rgba,
}

impl CaptureCodec {
    pub const ALL: [CaptureCodec; 2] = [CaptureCodec::Png, CaptureCodec::Rgba];

    pub fn name(&self) -> &'static str {
        match self {
            CaptureCodec::Png => "png",
            CaptureCodec::Rgba => "rgba",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }

    fn encode(&self, frame: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
        match self {
            CaptureCodec::Rgba => Ok(frame.as_raw().clone()),
            CaptureCodec::Png => {
                let mut out = Vec::new();
                image::codecs::png::PngEncoder::new(&mut out).write_image(
                    frame.as_raw(),
                    frame.width(),
                    frame.height(),
                    image::ExtendedColorType::Rgba8,
                )?;
                Ok(out)
            }
        }
    }

    fn decode(&self, width: u32, height: u32, data: &[u8]) -> Result<RgbaImage, ExportError> {
        match self {
            CaptureCodec::Rgba => RgbaImage::from_raw(width, height, data.to_vec())
                .ok_or_else(|| ExportError::recorder("raw frame has the wrong size")),
            CaptureCodec::Png => {
                image::load_from_memory_with_format(data, image::ImageFormat::Png)
                    .map(|img| img.to_rgba8())
                    .map_err(|e| ExportError::recorder(format!("corrupt captured frame: {e}")))
            }
        }
    }
}

impl std::fmt::Display for CaptureCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One captured frame.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Seconds since capture started.
    pub timestamp: f64,
    pub data: Vec<u8>,
}

/// A finished capture.
#[derive(Debug, Clone)]
pub struct CapturedStream {
    pub codec: CaptureCodec,
    pub width: u32,
    pub height: u32,
    /// Ordered by timestamp.
    pub frames: Vec<EncodedFrame>,
}

impl CapturedStream {
    pub fn duration(&self) -> f64 {
        self.frames.last().map(|f| f.timestamp).unwrap_or(0.0)
    }
}

/// Records the rendering surface while the timeline plays.
#[async_trait]
pub trait FrameRecorder: Send {
    /// Codec names this recorder can produce.
    fn supported_codecs(&self) -> Vec<String>;

    /// Begin a capture at `fps` frames per second.
    fn start(&mut self, codec: &str, fps: u32) -> Result<(), ExportError>;

    fn is_recording(&self) -> bool;

    /// Offer the surface at `timestamp`. The recorder keeps it only when a
    /// capture interval has elapsed.
    fn push(&mut self, timestamp: f64, frame: &RgbaImage) -> Result<(), ExportError>;

    /// Stop recording and hand over everything captured.
    async fn finish(&mut self) -> Result<CapturedStream, ExportError>;

    /// Stop recording and drop any captured data.
    fn abort(&mut self);
}

struct Session {
    codec: CaptureCodec,
    interval: f64,
    size: Option<(u32, u32)>,
    last: Option<f64>,
    frames: Vec<EncodedFrame>,
}

/// Recorder that keeps encoded frames in memory.
#[derive(Default)]
pub struct MemoryRecorder {
    session: Option<Session>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames captured so far in the current session.
    pub fn captured(&self) -> usize {
        self.session.as_ref().map(|s| s.frames.len()).unwrap_or(0)
    }
}

#[async_trait]
impl FrameRecorder for MemoryRecorder {
    fn supported_codecs(&self) -> Vec<String> {
        CaptureCodec::ALL.iter().map(|c| c.name().to_string()).collect()
    }

    fn start(&mut self, codec: &str, fps: u32) -> Result<(), ExportError> {
        if self.session.is_some() {
            return Err(ExportError::recorder("capture already running"));
        }
        if fps == 0 {
            return Err(ExportError::InvalidFps);
        }
        let codec = CaptureCodec::parse(codec).ok_or_else(|| ExportError::UnsupportedCodec {
            preferred: vec![codec.to_string()],
            supported: self.supported_codecs(),
        })?;

        tracing::debug!(%codec, fps, "Capture started");
        self.session = Some(Session {
            codec,
            interval: 1.0 / fps as f64,
            size: None,
            last: None,
            frames: Vec::new(),
        });
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    fn push(&mut self, timestamp: f64, frame: &RgbaImage) -> Result<(), ExportError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ExportError::recorder("capture not started"))?;

        if let Some(last) = session.last {
            if timestamp < last + session.interval - TIMESTAMP_EPSILON {
                return Ok(());
            }
        }

        let dims = frame.dimensions();
        match session.size {
            None => session.size = Some(dims),
            Some(size) if size != dims => {
                return Err(ExportError::recorder(format!(
                    "surface resized from {size:?} to {dims:?} during capture"
                )));
            }
            Some(_) => {}
        }

        let data = session
            .codec
            .encode(frame)
            .map_err(|e| ExportError::recorder(e.to_string()))?;
        session.frames.push(EncodedFrame { timestamp, data });
        session.last = Some(timestamp);
        Ok(())
    }

    async fn finish(&mut self) -> Result<CapturedStream, ExportError> {
        let session = self
            .session
            .take()
            .ok_or_else(|| ExportError::recorder("capture not started"))?;
        let (width, height) = session.size.unwrap_or((0, 0));
        tracing::debug!(frames = session.frames.len(), "Capture finished");
        Ok(CapturedStream {
            codec: session.codec,
            width,
            height,
            frames: session.frames,
        })
    }

    fn abort(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("Capture aborted");
        }
    }
}

/// Seekable view over a [`CapturedStream`].
pub struct IntermediateSource {
    stream: CapturedStream,
    current: Option<(usize, RgbaImage)>,
}

impl IntermediateSource {
    pub fn open(stream: CapturedStream) -> Result<Self, ExportError> {
        if stream.frames.is_empty() {
            return Err(ExportError::EmptyCapture);
        }
        Ok(Self {
            stream,
            current: None,
        })
    }

    pub fn duration(&self) -> f64 {
        self.stream.duration()
    }

    pub fn frame_count(&self) -> usize {
        self.stream.frames.len()
    }

    /// Index of the frame on screen at `time`: the last one whose timestamp
    /// is not after it.
    pub fn index_at(&self, time: f64) -> usize {
        self.stream
            .frames
            .partition_point(|f| f.timestamp <= time + TIMESTAMP_EPSILON)
            .saturating_sub(1)
    }

    /// Seek to `time` and return the decoded frame there.
    pub async fn seek(&mut self, time: f64) -> Result<&RgbaImage, ExportError> {
        let index = self.index_at(time);
        let cached = matches!(&self.current, Some((i, _)) if *i == index);

        if !cached {
            let codec = self.stream.codec;
            let (width, height) = (self.stream.width, self.stream.height);
            let data = self.stream.frames[index].data.clone();
            let frame = tokio::task::spawn_blocking(move || codec.decode(width, height, &data))
                .await
                .map_err(|e| ExportError::recorder(e.to_string()))??;
            self.current = Some((index, frame));
        }

        match &self.current {
            Some((_, frame)) => Ok(frame),
            None => Err(ExportError::EmptyCapture),
        }
    }

    /// The frame of the last seek.
    pub fn frame(&self) -> Option<&RgbaImage> {
        self.current.as_ref().map(|(_, frame)| frame)
    }
}
