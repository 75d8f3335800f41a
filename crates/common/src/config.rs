//! Application configuration.
//!
//! Every hand-tuned constant of the engine (drift tolerance, snap threshold,
//! split guard band, keyframe separation) lives here so it can be adjusted
//! without touching the algorithms that consume it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ReelError, ReelResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timeline model defaults.
    pub timeline: TimelineDefaults,

    /// Playback and media synchronization settings.
    pub playback: PlaybackDefaults,

    /// Pointer interaction settings.
    pub interaction: InteractionDefaults,

    /// Frame export settings.
    pub export: ExportDefaults,

    /// Font faces available to the text renderer.
    pub fonts: FontConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Timeline model defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineDefaults {
    /// Placeholder duration assigned to still images (seconds).
    pub image_duration_secs: f64,

    /// A split closer than this to either clip edge is ignored (seconds).
    pub split_guard_secs: f64,

    /// Keyframes closer than this are considered the same keyframe (seconds).
    pub keyframe_min_separation_secs: f64,

    /// Shortest clip a resize can produce (seconds).
    pub min_clip_duration_secs: f64,

    /// Total timeline length shown to the user (seconds).
    pub project_duration_secs: f64,

    /// Initial zoom in pixels per second.
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,

    /// Multiplier applied by zoom-in / divisor applied by zoom-out.
    pub zoom_step: f64,
}

/// Playback engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackDefaults {
    /// Allowed divergence between a source and the logical clock before
    /// a forced re-seek (seconds, scaled by clip speed).
    pub drift_tolerance_secs: f64,

    /// Scheduler cadence (Hz).
    pub refresh_hz: u32,

    /// Output canvas width in pixels.
    pub canvas_width: u32,

    /// Output canvas height in pixels.
    pub canvas_height: u32,
}

/// Timeline pointer interaction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionDefaults {
    /// Magnetic snap distance in screen pixels.
    pub snap_threshold_px: f64,

    /// Whether marker times participate in snapping.
    pub snap_to_markers: bool,
}

/// How the recording phase of an export advances the playback clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportPacing {
    /// Advance exactly one capture interval per tick, as fast as possible.
    #[default]
    Stepped,
    /// Advance with wall-clock time at the display refresh rate.
    Realtime,
}

/// Frame export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Default frame rate offered for exports.
    pub fps: u32,

    /// Quality used for JPEG frames (1-100).
    pub jpeg_quality: u8,

    /// Rate at which the rendering surface is captured while recording.
    pub capture_fps: u32,

    /// Capture codecs in order of preference.
    pub capture_codecs: Vec<String>,

    /// Recording phase clock pacing.
    pub pacing: ExportPacing,

    /// Upper bound on a single intermediate-source seek (milliseconds).
    pub seek_timeout_ms: u64,

    /// Upper bound on flushing the capture stream (milliseconds).
    pub flush_timeout_ms: u64,

    /// Upper bound on encoding one frame image (milliseconds).
    pub encode_timeout_ms: u64,
}

/// A font file registered for a family/style combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontFace {
    pub family: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    pub path: PathBuf,
}

/// Fonts available to the text renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Registered faces.
    pub faces: Vec<FontFace>,

    /// Family used when a clip asks for an unregistered one.
    pub fallback_family: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "canvasreel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for TimelineDefaults {
    fn default() -> Self {
        Self {
            image_duration_secs: 5.0,
            split_guard_secs: 0.1,
            keyframe_min_separation_secs: 0.05,
            min_clip_duration_secs: 0.1,
            project_duration_secs: 300.0,
            default_zoom: 10.0,
            min_zoom: 1.0,
            max_zoom: 200.0,
            zoom_step: 1.2,
        }
    }
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            drift_tolerance_secs: 0.3,
            refresh_hz: 60,
            canvas_width: 1280,
            canvas_height: 720,
        }
    }
}

impl Default for InteractionDefaults {
    fn default() -> Self {
        Self {
            snap_threshold_px: 15.0,
            snap_to_markers: true,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            jpeg_quality: 92,
            capture_fps: 30,
            capture_codecs: vec!["png".to_string(), "rgba".to_string()],
            pacing: ExportPacing::Stepped,
            seek_timeout_ms: 2_000,
            flush_timeout_ms: 5_000,
            encode_timeout_ms: 5_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Ignoring config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Parse and validate a JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> ReelResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ReelResult<()> {
        let t = &self.timeline;
        if !(t.min_zoom > 0.0 && t.min_zoom <= t.max_zoom) {
            return Err(ReelError::config(format!(
                "zoom range [{}, {}] is empty or not positive",
                t.min_zoom, t.max_zoom
            )));
        }
        if !(t.min_zoom..=t.max_zoom).contains(&t.default_zoom) {
            return Err(ReelError::config(format!(
                "default_zoom {} outside [{}, {}]",
                t.default_zoom, t.min_zoom, t.max_zoom
            )));
        }
        if !(t.zoom_step > 1.0) {
            return Err(ReelError::config("zoom_step must be greater than 1"));
        }
        if !(t.project_duration_secs > 0.0) {
            return Err(ReelError::config("project_duration_secs must be positive"));
        }
        let non_negative = [
            ("image_duration_secs", t.image_duration_secs),
            ("split_guard_secs", t.split_guard_secs),
            ("keyframe_min_separation_secs", t.keyframe_min_separation_secs),
            ("min_clip_duration_secs", t.min_clip_duration_secs),
            ("drift_tolerance_secs", self.playback.drift_tolerance_secs),
            ("snap_threshold_px", self.interaction.snap_threshold_px),
        ];
        if let Some((name, value)) = non_negative.iter().find(|(_, v)| !(*v >= 0.0)) {
            return Err(ReelError::config(format!("{name} must be >= 0, got {value}")));
        }

        let p = &self.playback;
        if p.refresh_hz == 0 {
            return Err(ReelError::config("refresh_hz must be positive"));
        }
        if p.canvas_width == 0 || p.canvas_height == 0 {
            return Err(ReelError::config(format!(
                "canvas {}x{} has no pixels",
                p.canvas_width, p.canvas_height
            )));
        }

        let e = &self.export;
        if e.fps == 0 || e.capture_fps == 0 {
            return Err(ReelError::config("export fps and capture_fps must be positive"));
        }
        if !(1..=100).contains(&e.jpeg_quality) {
            return Err(ReelError::config(format!(
                "jpeg_quality {} outside 1-100",
                e.jpeg_quality
            )));
        }
        if e.capture_codecs.is_empty() {
            return Err(ReelError::config("capture_codecs lists no codec"));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Where `load` and `save` look for the config file.
    pub fn path() -> PathBuf {
        config_file_path()
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("canvasreel").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_editor_constants() {
        let config = AppConfig::default();
        assert!((config.playback.drift_tolerance_secs - 0.3).abs() < 1e-12);
        assert!((config.interaction.snap_threshold_px - 15.0).abs() < 1e-12);
        assert!((config.timeline.split_guard_secs - 0.1).abs() < 1e-12);
        assert!((config.timeline.keyframe_min_separation_secs - 0.05).abs() < 1e-12);
        assert_eq!(config.playback.canvas_width, 1280);
        assert_eq!(config.export.pacing, ExportPacing::Stepped);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "interaction": { "snap_threshold_px": 8.0 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert!((config.interaction.snap_threshold_px - 8.0).abs() < 1e-12);
        assert!(config.interaction.snap_to_markers);
        assert!((config.timeline.image_duration_secs - 5.0).abs() < 1e-12);
        assert_eq!(config.export.capture_codecs, vec!["png", "rgba"]);
    }

    #[test]
    fn test_from_json_rejects_unusable_values() {
        assert!(AppConfig::default().validate().is_ok());
        assert!(AppConfig::from_json("{}").is_ok());

        let err = AppConfig::from_json(r#"{ "playback": { "refresh_hz": 0 } }"#).unwrap_err();
        assert!(matches!(err, ReelError::Config { .. }));

        let err = AppConfig::from_json(r#"{ "timeline": { "min_zoom": 50.0, "max_zoom": 5.0 } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("zoom range"));

        let err = AppConfig::from_json(r#"{ "export": { "jpeg_quality": 0 } }"#).unwrap_err();
        assert!(err.to_string().contains("jpeg_quality"));

        let err = AppConfig::from_json(r#"{ "playback": { "drift_tolerance_secs": -1.0 } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("drift_tolerance_secs"));

        let err = AppConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ReelError::Json(_)));
    }

    #[test]
    fn test_pacing_serialization() {
        let json = serde_json::to_string(&ExportPacing::Realtime).unwrap();
        assert_eq!(json, "\"realtime\"");
    }
}
