//! Frame-sequence export.
//!
//! An export plays the requested range through the live rendering path while
//! a [`FrameRecorder`] captures the surface, then seeks the captured stream
//! at `1 / fps` steps and writes one image per step into a zip archive.
//! What lands in the archive is therefore exactly what playback showed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use canvasreel_common::{AppConfig, ManualClock, TimeSource};
use canvasreel_playback_engine::Player;
use canvasreel_project_model::TimelineStore;
use serde::Serialize;
use tokio::time::{timeout, MissedTickBehavior};

use crate::archive::{ArchiveWriter, FrameArchive, FrameFormat};
use crate::capture::{FrameRecorder, IntermediateSource};
use crate::error::ExportError;
use crate::presenter::CanvasPresenter;

const RANGE_EPSILON: f64 = 1e-9;

/// Which range to export and how.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub start_time: f64,
    pub end_time: f64,
    pub fps: u32,
    pub image_format: FrameFormat,
}

impl ExportRequest {
    pub fn new(start_time: f64, end_time: f64, fps: u32, image_format: FrameFormat) -> Self {
        Self {
            start_time,
            end_time,
            fps,
            image_format,
        }
    }

    /// The single selected clip's span, otherwise the whole project.
    pub fn default_range(store: &TimelineStore) -> (f64, f64) {
        if let [only] = store.selection().clips.as_slice() {
            if let Some(clip) = store.clip(only) {
                return (clip.start_time, clip.end_time());
            }
        }
        (0.0, store.duration())
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        let range_ok = self.start_time.is_finite()
            && self.end_time.is_finite()
            && self.start_time >= 0.0
            && self.end_time > self.start_time;
        if !range_ok {
            return Err(ExportError::InvalidRange {
                start: self.start_time,
                end: self.end_time,
            });
        }
        if self.fps == 0 {
            return Err(ExportError::InvalidFps);
        }
        Ok(())
    }

    /// [`ExportRequest::validate`], plus the range must start before the
    /// timeline ends. An end past the timeline holds the last frame.
    pub fn validate_within(&self, timeline_duration: f64) -> Result<(), ExportError> {
        self.validate()?;
        if self.start_time >= timeline_duration {
            return Err(ExportError::StartPastTimeline {
                start: self.start_time,
                duration: timeline_duration,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// Frames the export writes: `ceil(duration * fps)`.
    pub fn total_frames(&self) -> u64 {
        let exact = self.duration() * self.fps as f64;
        (exact - RANGE_EPSILON).ceil().max(0.0) as u64
    }

    /// Frame estimate shown before exporting: `floor(duration * fps)`.
    pub fn estimated_frames(&self) -> u64 {
        let exact = self.duration() * self.fps as f64;
        (exact + RANGE_EPSILON).floor().max(0.0) as u64
    }

    /// Timeline-relative time of frame `index`.
    pub fn frame_time(&self, index: u64) -> f64 {
        index as f64 / self.fps as f64
    }
}

/// Export state machine: `Idle -> Recording -> Extracting -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPhase {
    Idle,
    Recording,
    Extracting,
}

/// Progress report. Recording covers 0-50%, extraction 50-100%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExportProgress {
    pub phase: ExportPhase,
    pub percent: f64,
    pub frames_written: u64,
    pub total_frames: u64,
}

pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Shared cancellation flag for a running export.
#[derive(Debug, Clone, Default)]
pub struct ExportCancel {
    flag: Arc<AtomicBool>,
}

impl ExportCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Tunables for the pipeline, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub capture_fps: u32,
    pub capture_codecs: Vec<String>,
    pub jpeg_quality: u8,
    pub seek_timeout: Duration,
    pub flush_timeout: Duration,
    pub encode_timeout: Duration,
}

impl ExportSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let export = &config.export;
        Self {
            capture_fps: export.capture_fps.max(1),
            capture_codecs: export.capture_codecs.clone(),
            jpeg_quality: export.jpeg_quality,
            seek_timeout: Duration::from_millis(export.seek_timeout_ms),
            flush_timeout: Duration::from_millis(export.flush_timeout_ms),
            encode_timeout: Duration::from_millis(export.encode_timeout_ms),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// How the recording phase drives the player's clock.
///
/// The clock must be the same one the media sources were created with.
#[derive(Clone)]
pub enum Pacer {
    /// Step a manual clock by one capture interval per tick.
    Stepped(ManualClock),
    /// Follow a real clock, ticking at `refresh_hz`.
    Realtime {
        clock: Arc<dyn TimeSource>,
        refresh_hz: u32,
    },
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pacer::Stepped(clock) => f.debug_tuple("Stepped").field(&clock.now_secs()).finish(),
            Pacer::Realtime { refresh_hz, .. } => f
                .debug_struct("Realtime")
                .field("refresh_hz", refresh_hz)
                .finish(),
        }
    }
}

enum Ticks<'a> {
    Stepped {
        clock: &'a ManualClock,
        step: f64,
        started: bool,
    },
    Realtime {
        clock: &'a dyn TimeSource,
        interval: tokio::time::Interval,
    },
}

impl<'a> Ticks<'a> {
    fn new(pacer: &'a Pacer, capture_fps: u32) -> Self {
        match pacer {
            Pacer::Stepped(clock) => Ticks::Stepped {
                clock,
                step: 1.0 / capture_fps.max(1) as f64,
                started: false,
            },
            Pacer::Realtime { clock, refresh_hz } => {
                let period = Duration::from_secs_f64(1.0 / (*refresh_hz).max(1) as f64);
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Ticks::Realtime {
                    clock: &**clock,
                    interval,
                }
            }
        }
    }

    /// Wait for the next tick and return the clock reading.
    async fn next(&mut self) -> f64 {
        match self {
            Ticks::Stepped {
                clock,
                step,
                started,
            } => {
                if *started {
                    clock.advance(*step);
                    tokio::task::yield_now().await;
                }
                *started = true;
                clock.now_secs()
            }
            Ticks::Realtime { clock, interval } => {
                interval.tick().await;
                clock.now_secs()
            }
        }
    }
}

fn emit(progress: Option<&ProgressCallback>, report: ExportProgress) {
    if let Some(cb) = progress {
        cb(report);
    }
}

/// Records a timeline range and extracts it as numbered frame images.
pub struct ExportPipeline<R> {
    settings: ExportSettings,
    recorder: R,
    phase: ExportPhase,
    cancel: ExportCancel,
}

impl<R: FrameRecorder> ExportPipeline<R> {
    pub fn new(settings: ExportSettings, recorder: R) -> Self {
        Self {
            settings,
            recorder,
            phase: ExportPhase::Idle,
            cancel: ExportCancel::new(),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// Handle that cancels the export in progress.
    pub fn cancel_handle(&self) -> ExportCancel {
        self.cancel.clone()
    }

    /// First preferred codec the recorder supports.
    pub fn negotiate_codec(&self) -> Result<String, ExportError> {
        let supported = self.recorder.supported_codecs();
        self.settings
            .capture_codecs
            .iter()
            .find(|want| supported.iter().any(|have| have.eq_ignore_ascii_case(want)))
            .cloned()
            .ok_or_else(|| ExportError::UnsupportedCodec {
                preferred: self.settings.capture_codecs.clone(),
                supported,
            })
    }

    /// Export `request` from `player`.
    ///
    /// On return, success or not, the phase is back to idle and the
    /// player's playhead and play state are what they were before. The
    /// timeline itself is never modified.
    pub async fn run(
        &mut self,
        player: &mut Player<CanvasPresenter>,
        pacer: &Pacer,
        request: &ExportRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<FrameArchive, ExportError> {
        request.validate_within(player.store().duration())?;

        let saved_time = player.store().current_time();
        let saved_playing = player.store().is_playing();
        tracing::info!(
            start = request.start_time,
            end = request.end_time,
            fps = request.fps,
            format = %request.image_format,
            frames = request.total_frames(),
            "Starting export"
        );

        let result = self.run_phases(player, pacer, request, progress.as_ref()).await;
        if result.is_err() {
            self.recorder.abort();
        }

        player.pause();
        player.pool_mut().pause_all();
        player.seek(saved_time);
        if saved_playing {
            player.play();
        }
        self.phase = ExportPhase::Idle;
        self.cancel.reset();

        match &result {
            Ok(archive) => tracing::info!(frames = archive.frame_count(), "Export complete"),
            Err(e) => tracing::warn!(error = %e, "Export failed"),
        }
        result
    }

    fn check_cancel(&self) -> Result<(), ExportError> {
        if self.cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        Ok(())
    }

    async fn run_phases(
        &mut self,
        player: &mut Player<CanvasPresenter>,
        pacer: &Pacer,
        request: &ExportRequest,
        progress: Option<&ProgressCallback>,
    ) -> Result<FrameArchive, ExportError> {
        let total = request.total_frames();
        let codec = self.negotiate_codec()?;
        self.check_cancel()?;

        // Recording
        self.phase = ExportPhase::Recording;
        emit(
            progress,
            ExportProgress {
                phase: ExportPhase::Recording,
                percent: 0.0,
                frames_written: 0,
                total_frames: total,
            },
        );

        player.pause();
        player.seek(request.start_time);
        self.recorder.start(&codec, self.settings.capture_fps)?;
        player.play();

        let span = request.duration();
        let mut ticks = Ticks::new(pacer, self.settings.capture_fps);
        loop {
            self.check_cancel()?;
            let now = ticks.next().await;
            let report = player.tick(now);
            let elapsed = report.time - request.start_time;
            if elapsed >= span - RANGE_EPSILON {
                break;
            }
            self.recorder.push(elapsed, player.presenter().surface())?;
            emit(
                progress,
                ExportProgress {
                    phase: ExportPhase::Recording,
                    percent: 50.0 * (elapsed / span).clamp(0.0, 1.0),
                    frames_written: 0,
                    total_frames: total,
                },
            );
            if !report.playing {
                tracing::debug!(at = report.time, "Playback stopped before the range end");
                break;
            }
        }
        player.pause();

        let stream = timeout(self.settings.flush_timeout, self.recorder.finish())
            .await
            .map_err(|_| ExportError::FlushTimeout)??;
        tracing::debug!(captured = stream.frames.len(), "Recording phase done");

        // Extracting
        self.phase = ExportPhase::Extracting;
        emit(
            progress,
            ExportProgress {
                phase: ExportPhase::Extracting,
                percent: 50.0,
                frames_written: 0,
                total_frames: total,
            },
        );

        let mut source = IntermediateSource::open(stream)?;
        let mut archive = ArchiveWriter::new(request.image_format);
        let format = request.image_format;
        let quality = self.settings.jpeg_quality;

        for index in 0..total {
            self.check_cancel()?;
            let t = request.frame_time(index);
            let seeked = timeout(self.settings.seek_timeout, source.seek(t))
                .await
                .map_err(|_| ExportError::SeekTimeout(t))??;
            player.presenter_mut().show_frame(seeked);
            let frame = player.presenter().surface().clone();

            let encoded = timeout(
                self.settings.encode_timeout,
                tokio::task::spawn_blocking(move || format.encode(&frame, quality)),
            )
            .await
            .map_err(|_| ExportError::EncodeTimeout(index))?
            .map_err(|e| ExportError::Encode {
                index,
                reason: e.to_string(),
            })?
            .map_err(|e| ExportError::Encode {
                index,
                reason: e.to_string(),
            })?;

            archive.add_frame(&encoded)?;
            emit(
                progress,
                ExportProgress {
                    phase: ExportPhase::Extracting,
                    percent: 50.0 + 50.0 * (index + 1) as f64 / total as f64,
                    frames_written: index + 1,
                    total_frames: total,
                },
            );
        }

        archive.finish()
    }
}
