//! Media source contract and the built-in clocked source.
//!
//! A media source has a native clock of its own. The synchronizer only ever
//! talks to it through [`MediaSource`], so a hardware decoder, a software
//! frame sequence and a silent audio placeholder all look the same.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use canvasreel_common::TimeSource;
use image::RgbaImage;

use crate::error::MediaError;

/// File extensions accepted as still frames.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "gif"];

/// Frame rate assumed for image sequences whose duration is unknown.
pub const DEFAULT_SEQUENCE_FPS: f64 = 30.0;

/// Trait for a playable media source.
///
/// Implementations own their native clock; the synchronizer nudges it with
/// `seek`/`play`/`pause` whenever it strays from the logical playhead.
pub trait MediaSource: Send {
    /// Jump to `secs` in source time.
    fn seek(&mut self, secs: f64) -> Result<(), MediaError>;

    /// Start the native clock. May be refused (autoplay policy, unreadable
    /// source); the source then stays paused.
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Native clock position in source seconds.
    fn current_time(&self) -> f64;

    /// Playback rate relative to real time.
    fn set_rate(&mut self, rate: f64);

    fn set_volume(&mut self, volume: f64);

    fn volume(&self) -> f64;

    /// Whether a frame (or audio) can be produced right now.
    fn is_ready(&self) -> bool;

    /// Whether the source has a timeline at all. Still images do not and
    /// are never seeked or played.
    fn is_timed(&self) -> bool {
        true
    }

    /// The frame at the current position, for drawable sources.
    fn frame(&self) -> Option<Arc<RgbaImage>>;
}

/// Ordered image files on disk, decoded lazily one frame at a time.
#[derive(Debug)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    fps: f64,
    cache: Mutex<Option<(usize, Arc<RgbaImage>)>>,
}

impl ImageSequence {
    /// Open every image file in `dir`, sorted by file name.
    ///
    /// The frame rate is derived from `duration` when it is positive.
    pub fn open(dir: &Path, duration: f64) -> Result<Self, MediaError> {
        let entries = std::fs::read_dir(dir).map_err(|source| MediaError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image_file(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(MediaError::unsupported(
                dir.display().to_string(),
                "directory contains no image frames",
            ));
        }

        let fps = if duration.is_finite() && duration > 0.0 {
            paths.len() as f64 / duration
        } else {
            DEFAULT_SEQUENCE_FPS
        };

        Ok(Self {
            paths,
            fps,
            cache: Mutex::new(None),
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_at(&self, secs: f64) -> Option<Arc<RgbaImage>> {
        let index = frame_index(secs, self.fps, self.paths.len())?;

        if let Ok(cache) = self.cache.lock() {
            if let Some((cached, frame)) = cache.as_ref() {
                if *cached == index {
                    return Some(Arc::clone(frame));
                }
            }
        }

        let path = &self.paths[index];
        match image::open(path) {
            Ok(img) => {
                let frame = Arc::new(img.to_rgba8());
                if let Ok(mut cache) = self.cache.lock() {
                    *cache = Some((index, Arc::clone(&frame)));
                }
                Some(frame)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to decode sequence frame");
                None
            }
        }
    }
}

/// Where a [`ClockedSource`] gets its pixels from.
#[derive(Debug)]
pub enum FrameProvider {
    /// Audio-only; nothing to draw.
    None,
    /// One image for every position.
    Still(Arc<RgbaImage>),
    /// Image files on disk.
    Sequence(ImageSequence),
    /// Decoded frames held in memory.
    Memory { frames: Vec<Arc<RgbaImage>>, fps: f64 },
}

impl FrameProvider {
    /// Decode a still image file.
    pub fn still(path: &Path) -> Result<Self, MediaError> {
        let img = image::open(path).map_err(|source| MediaError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::Still(Arc::new(img.to_rgba8())))
    }

    fn is_ready(&self) -> bool {
        match self {
            Self::None | Self::Still(_) => true,
            Self::Sequence(seq) => !seq.is_empty(),
            Self::Memory { frames, .. } => !frames.is_empty(),
        }
    }

    fn frame_at(&self, secs: f64) -> Option<Arc<RgbaImage>> {
        match self {
            Self::None => None,
            Self::Still(img) => Some(Arc::clone(img)),
            Self::Sequence(seq) => seq.frame_at(secs),
            Self::Memory { frames, fps } => {
                frame_index(secs, *fps, frames.len()).map(|i| Arc::clone(&frames[i]))
            }
        }
    }
}

/// A software media source whose clock is derived from a [`TimeSource`].
///
/// While playing, the position is `anchor_position + (now - anchor) * rate`,
/// capped at the source duration.
pub struct ClockedSource {
    clock: Arc<dyn TimeSource>,
    provider: FrameProvider,
    duration: f64,
    timed: bool,
    position: f64,
    anchor: Option<f64>,
    rate: f64,
    volume: f64,
}

impl ClockedSource {
    pub fn new(clock: Arc<dyn TimeSource>, provider: FrameProvider, duration: f64) -> Self {
        Self {
            clock,
            provider,
            duration: duration.max(0.0),
            timed: true,
            position: 0.0,
            anchor: None,
            rate: 1.0,
            volume: 1.0,
        }
    }

    /// A source with no timeline (still images).
    pub fn untimed(clock: Arc<dyn TimeSource>, provider: FrameProvider) -> Self {
        Self {
            timed: false,
            ..Self::new(clock, provider, f64::INFINITY)
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn reanchor(&mut self) {
        self.position = self.current_time();
        if self.anchor.is_some() {
            self.anchor = Some(self.clock.now_secs());
        }
    }
}

impl std::fmt::Debug for ClockedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockedSource")
            .field("duration", &self.duration)
            .field("timed", &self.timed)
            .field("position", &self.position)
            .field("playing", &self.anchor.is_some())
            .field("rate", &self.rate)
            .field("volume", &self.volume)
            .finish()
    }
}

impl MediaSource for ClockedSource {
    fn seek(&mut self, secs: f64) -> Result<(), MediaError> {
        if !secs.is_finite() {
            return Err(MediaError::InvalidSeek(secs));
        }
        self.position = secs.clamp(0.0, self.duration);
        if self.anchor.is_some() {
            self.anchor = Some(self.clock.now_secs());
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if !self.provider.is_ready() {
            return Err(MediaError::NotReady);
        }
        if self.anchor.is_none() {
            self.anchor = Some(self.clock.now_secs());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.anchor = None;
    }

    fn is_paused(&self) -> bool {
        self.anchor.is_none()
    }

    fn current_time(&self) -> f64 {
        match self.anchor {
            Some(anchor) => {
                let elapsed = (self.clock.now_secs() - anchor).max(0.0);
                (self.position + elapsed * self.rate).min(self.duration)
            }
            None => self.position,
        }
    }

    fn set_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 && rate != self.rate {
            self.reanchor();
            self.rate = rate;
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn is_ready(&self) -> bool {
        self.provider.is_ready()
    }

    fn is_timed(&self) -> bool {
        self.timed
    }

    fn frame(&self) -> Option<Arc<RgbaImage>> {
        self.provider.frame_at(self.current_time())
    }
}

/// Whether `path` has a still-image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn frame_index(secs: f64, fps: f64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if !secs.is_finite() || fps <= 0.0 {
        return Some(0);
    }
    let index = (secs.max(0.0) * fps).floor() as usize;
    Some(index.min(len - 1))
}
