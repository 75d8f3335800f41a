//! Clips: time-positioned references to an asset or a text block.

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetKind};
use crate::error::ModelError;
use crate::ids::{AssetId, ClipId, GroupId, TrackId};
use crate::keyframe::{AnimatableProperty, KeyframeMap};

/// Slack allowed when checking trim bounds against float arithmetic.
const TRIM_EPSILON: f64 = 1e-6;

/// Kind of content a clip draws or plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Video,
    Audio,
    Image,
    Text,
}

impl ClipKind {
    /// Whether the clip is drawn by the compositor.
    pub fn is_visual(self) -> bool {
        !matches!(self, ClipKind::Audio)
    }

    /// Whether the clip is backed by a synchronized media source.
    pub fn has_media_source(self) -> bool {
        matches!(self, ClipKind::Video | ClipKind::Audio)
    }
}

impl From<AssetKind> for ClipKind {
    fn from(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Video => ClipKind::Video,
            AssetKind::Audio => ClipKind::Audio,
            AssetKind::Image => ClipKind::Image,
        }
    }
}

/// Static spatial properties. Unset values fall back to property defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Offset from the canvas center in pixels.
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub scale: Option<f64>,
    /// Degrees, clockwise.
    pub rotation: Option<f64>,
    /// `[0, 1]`.
    pub opacity: Option<f64>,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

/// Static color filter values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    pub brightness: Option<f64>,
    pub contrast: Option<f64>,
    pub saturation: Option<f64>,
    pub grayscale: Option<f64>,
    pub sepia: Option<f64>,
    /// Blur radius in pixels.
    pub blur: Option<f64>,
}

/// Drop shadow behind text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowStyle {
    pub color: Option<String>,
    pub blur: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
}

/// Text content and styling of a text clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub content: String,
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub font_family: Option<String>,
    /// Fill color as `#rrggbb`.
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    /// Present when the shadow is enabled.
    #[serde(default)]
    pub shadow: Option<ShadowStyle>,
}

impl TextStyle {
    pub const DEFAULT_FAMILY: &'static str = "Inter";
    pub const DEFAULT_COLOR: &'static str = "#ffffff";
    pub const DEFAULT_SHADOW_COLOR: &'static str = "#000000";
    pub const PLACEHOLDER: &'static str = "Text";

    pub fn family(&self) -> &str {
        self.font_family.as_deref().unwrap_or(Self::DEFAULT_FAMILY)
    }

    pub fn fill(&self) -> &str {
        self.color.as_deref().unwrap_or(Self::DEFAULT_COLOR)
    }
}

/// Entry transition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    #[default]
    None,
    Fade,
    /// Enters from the right edge moving left.
    SlideLeft,
    /// Enters from the left edge moving right.
    SlideRight,
    /// Enters from the bottom edge moving up.
    SlideUp,
    /// Enters from the top edge moving down.
    SlideDown,
    /// Reveals right to left.
    WipeLeft,
    /// Reveals left to right.
    WipeRight,
    /// Reveals bottom to top.
    WipeUp,
    /// Reveals top to bottom.
    WipeDown,
}

/// Transition applied during the first `duration` seconds of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(rename = "type")]
    pub kind: TransitionKind,
    pub duration: f64,
}

/// A time-positioned reference to an asset (or a text block) on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub track_id: TrackId,

    /// Absent for text clips.
    #[serde(default)]
    pub asset_id: Option<AssetId>,

    pub kind: ClipKind,

    #[serde(default)]
    pub name: String,

    /// Trim into the source media (seconds).
    #[serde(default)]
    pub start_offset: f64,

    /// Position on the timeline (seconds).
    pub start_time: f64,

    /// Length on the timeline (seconds).
    pub duration: f64,

    /// Source playback rate; 1.0 when unset.
    #[serde(default)]
    pub speed: Option<f64>,

    /// Lane color as `#rrggbb`.
    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub group_id: Option<GroupId>,

    #[serde(default)]
    pub muted: bool,

    #[serde(default = "default_visible")]
    pub visible: bool,

    #[serde(default)]
    pub transform: Transform,

    #[serde(default)]
    pub filters: Filters,

    #[serde(default)]
    pub text: Option<TextStyle>,

    #[serde(default)]
    pub transition: Option<Transition>,

    #[serde(default, skip_serializing_if = "KeyframeMap::is_empty")]
    pub keyframes: KeyframeMap,
}

fn default_visible() -> bool {
    true
}

impl Clip {
    /// A clip playing `asset` from its beginning.
    pub fn from_asset(
        asset: &Asset,
        track_id: impl Into<TrackId>,
        start_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            asset_id: Some(asset.id.clone()),
            name: asset.name.clone(),
            ..Self::blank(ClipKind::from(asset.kind), track_id.into(), start_time, duration)
        }
    }

    /// A text clip.
    pub fn text(
        track_id: impl Into<TrackId>,
        start_time: f64,
        duration: f64,
        style: TextStyle,
    ) -> Self {
        Self {
            name: style.content.clone(),
            text: Some(style),
            ..Self::blank(ClipKind::Text, track_id.into(), start_time, duration)
        }
    }

    fn blank(kind: ClipKind, track_id: TrackId, start_time: f64, duration: f64) -> Self {
        Self {
            id: ClipId::generate(),
            track_id,
            asset_id: None,
            kind,
            name: String::new(),
            start_offset: 0.0,
            start_time,
            duration,
            speed: None,
            color: None,
            group_id: None,
            muted: false,
            visible: true,
            transform: Transform::default(),
            filters: Filters::default(),
            text: None,
            transition: None,
            keyframes: KeyframeMap::new(),
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed.unwrap_or(1.0)
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Whether the half-open interval `[start, end)` covers `time`.
    pub fn covers(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }

    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start_time.max(start) < self.end_time().min(end)
    }

    /// Source media time corresponding to timeline time `time`.
    pub fn source_time(&self, time: f64) -> f64 {
        self.start_offset + (time - self.start_time) * self.speed()
    }

    /// Static value of `property`, ignoring keyframes.
    pub fn static_value(&self, property: AnimatableProperty) -> Option<f64> {
        use AnimatableProperty as P;
        let shadow = self.text.as_ref().and_then(|t| t.shadow.as_ref());
        match property {
            P::PositionX => self.transform.position_x,
            P::PositionY => self.transform.position_y,
            P::Scale => self.transform.scale,
            P::Rotation => self.transform.rotation,
            P::Opacity => self.transform.opacity,
            P::Brightness => self.filters.brightness,
            P::Contrast => self.filters.contrast,
            P::Saturation => self.filters.saturation,
            P::Grayscale => self.filters.grayscale,
            P::Sepia => self.filters.sepia,
            P::Blur => self.filters.blur,
            P::FontSize => self.text.as_ref().and_then(|t| t.font_size),
            P::ShadowBlur => shadow.and_then(|s| s.blur),
            P::ShadowOffsetX => shadow.and_then(|s| s.offset_x),
            P::ShadowOffsetY => shadow.and_then(|s| s.offset_y),
        }
    }

    /// Check the structural invariants of this clip against its asset.
    pub fn validate(&self, asset: Option<&Asset>) -> Result<(), ModelError> {
        let invalid = |reason: String| ModelError::InvalidClip {
            clip: self.id.clone(),
            reason,
        };

        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(invalid(format!("duration must be positive, got {}", self.duration)));
        }
        if !(self.start_time.is_finite() && self.start_time >= 0.0) {
            return Err(invalid(format!("start_time must be >= 0, got {}", self.start_time)));
        }
        if !(self.start_offset.is_finite() && self.start_offset >= 0.0) {
            return Err(invalid(format!(
                "start_offset must be >= 0, got {}",
                self.start_offset
            )));
        }
        if !(self.speed().is_finite() && self.speed() > 0.0) {
            return Err(invalid(format!("speed must be positive, got {}", self.speed())));
        }

        match (self.kind, &self.asset_id) {
            (ClipKind::Text, Some(_)) => {
                return Err(invalid("text clips cannot reference an asset".into()))
            }
            (ClipKind::Text, None) => {}
            (_, None) => return Err(invalid("media clips need an asset".into())),
            (_, Some(_)) => {}
        }

        if let Some(asset) = asset {
            if ClipKind::from(asset.kind) != self.kind {
                return Err(invalid(format!(
                    "clip kind {:?} does not match asset kind {:?}",
                    self.kind, asset.kind
                )));
            }
            if let Some(limit) = asset.trim_limit() {
                let consumed = self.start_offset + self.duration * self.speed();
                if consumed > limit + TRIM_EPSILON {
                    return Err(invalid(format!(
                        "clip reads {consumed:.3}s of a {limit:.3}s source"
                    )));
                }
            }
        }

        Ok(())
    }
}
