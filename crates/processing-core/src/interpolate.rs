//! Property interpolation.
//!
//! Resolves the effective value of an [`AnimatableProperty`] at a time
//! relative to the clip start. Keyframes win over static values; static
//! values win over the caller's default.

use canvasreel_project_model::{sample_keyframes, AnimatableProperty, Clip, TextStyle};
use serde::Serialize;

/// Effective value of `property` at `relative_time`.
///
/// With no keyframes for `property` this is the clip's static value or
/// `default`. Otherwise the keyframe curve is sampled: held at the first
/// value before the first keyframe, held at the last value after the last,
/// and interpolated between neighbours.
pub fn resolve(
    clip: &Clip,
    property: AnimatableProperty,
    relative_time: f64,
    default: f64,
) -> f64 {
    match clip.keyframes.get(&property) {
        Some(seq) if !seq.is_empty() => sample_keyframes(seq, relative_time).unwrap_or(default),
        _ => clip.static_value(property).unwrap_or(default),
    }
}

/// [`resolve`] with the property's own default.
pub fn resolve_default(clip: &Clip, property: AnimatableProperty, relative_time: f64) -> f64 {
    resolve(clip, property, relative_time, property.default_value())
}

/// Spatial state of a clip at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedTransform {
    pub position_x: f64,
    pub position_y: f64,
    pub scale: f64,
    /// Degrees.
    pub rotation: f64,
    pub opacity: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl ResolvedTransform {
    pub fn at(clip: &Clip, relative_time: f64) -> Self {
        use AnimatableProperty as P;
        Self {
            position_x: resolve_default(clip, P::PositionX, relative_time),
            position_y: resolve_default(clip, P::PositionY, relative_time),
            scale: resolve_default(clip, P::Scale, relative_time),
            rotation: resolve_default(clip, P::Rotation, relative_time),
            opacity: resolve_default(clip, P::Opacity, relative_time),
            flip_horizontal: clip.transform.flip_horizontal,
            flip_vertical: clip.transform.flip_vertical,
        }
    }
}

/// Color filter chain of a clip at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedFilters {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub grayscale: f64,
    pub sepia: f64,
    /// Pixels.
    pub blur: f64,
}

impl Default for ResolvedFilters {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            grayscale: 0.0,
            sepia: 0.0,
            blur: 0.0,
        }
    }
}

impl ResolvedFilters {
    pub fn at(clip: &Clip, relative_time: f64) -> Self {
        use AnimatableProperty as P;
        Self {
            brightness: resolve_default(clip, P::Brightness, relative_time),
            contrast: resolve_default(clip, P::Contrast, relative_time),
            saturation: resolve_default(clip, P::Saturation, relative_time),
            grayscale: resolve_default(clip, P::Grayscale, relative_time),
            sepia: resolve_default(clip, P::Sepia, relative_time),
            blur: resolve_default(clip, P::Blur, relative_time),
        }
    }

    /// True when applying the chain would leave pixels unchanged.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// CSS filter notation of the chain, in application order.
    pub fn css(&self) -> String {
        format!(
            "brightness({}) contrast({}) saturate({}) grayscale({}) sepia({}) blur({}px)",
            self.brightness, self.contrast, self.saturation, self.grayscale, self.sepia, self.blur
        )
    }
}

/// Drop shadow of a text clip at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedShadow {
    pub color: String,
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Text content and style of a text clip at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedText {
    pub content: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub shadow: Option<ResolvedShadow>,
}

impl ResolvedText {
    /// `None` for clips without text.
    pub fn at(clip: &Clip, relative_time: f64) -> Option<Self> {
        use AnimatableProperty as P;
        let style = clip.text.as_ref()?;
        let content = if style.content.is_empty() {
            TextStyle::PLACEHOLDER.to_string()
        } else {
            style.content.clone()
        };
        let shadow = style.shadow.as_ref().map(|s| ResolvedShadow {
            color: s
                .color
                .clone()
                .unwrap_or_else(|| TextStyle::DEFAULT_SHADOW_COLOR.to_string()),
            blur: resolve_default(clip, P::ShadowBlur, relative_time),
            offset_x: resolve_default(clip, P::ShadowOffsetX, relative_time),
            offset_y: resolve_default(clip, P::ShadowOffsetY, relative_time),
        });

        Some(Self {
            content,
            font_size: resolve_default(clip, P::FontSize, relative_time),
            font_family: style.family().to_string(),
            color: style.fill().to_string(),
            bold: style.bold,
            italic: style.italic,
            shadow,
        })
    }
}
