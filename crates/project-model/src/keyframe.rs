//! Keyframes and animatable properties.
//!
//! A clip may animate any [`AnimatableProperty`] with a sequence of
//! keyframes whose times are relative to the clip start. Sequences are kept
//! sorted ascending with no two keyframes closer than the configured
//! minimum separation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::KeyframeId;

/// Closed set of numeric clip properties that can carry keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimatableProperty {
    PositionX,
    PositionY,
    Scale,
    Rotation,
    Opacity,
    Brightness,
    Contrast,
    Saturation,
    Grayscale,
    Sepia,
    Blur,
    FontSize,
    ShadowBlur,
    ShadowOffsetX,
    ShadowOffsetY,
}

impl AnimatableProperty {
    pub const ALL: [AnimatableProperty; 15] = [
        Self::PositionX,
        Self::PositionY,
        Self::Scale,
        Self::Rotation,
        Self::Opacity,
        Self::Brightness,
        Self::Contrast,
        Self::Saturation,
        Self::Grayscale,
        Self::Sepia,
        Self::Blur,
        Self::FontSize,
        Self::ShadowBlur,
        Self::ShadowOffsetX,
        Self::ShadowOffsetY,
    ];

    /// Value used when a clip has neither keyframes nor a static value.
    pub fn default_value(self) -> f64 {
        match self {
            Self::Scale | Self::Opacity => 1.0,
            Self::Brightness | Self::Contrast | Self::Saturation => 1.0,
            Self::PositionX | Self::PositionY | Self::Rotation => 0.0,
            Self::Grayscale | Self::Sepia | Self::Blur => 0.0,
            Self::FontSize => 40.0,
            Self::ShadowBlur => 4.0,
            Self::ShadowOffsetX | Self::ShadowOffsetY => 2.0,
        }
    }

    /// Stable snake_case name, as used in project files.
    pub fn name(self) -> &'static str {
        match self {
            Self::PositionX => "position_x",
            Self::PositionY => "position_y",
            Self::Scale => "scale",
            Self::Rotation => "rotation",
            Self::Opacity => "opacity",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::Blur => "blur",
            Self::FontSize => "font_size",
            Self::ShadowBlur => "shadow_blur",
            Self::ShadowOffsetX => "shadow_offset_x",
            Self::ShadowOffsetY => "shadow_offset_y",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Interpolation curve between a keyframe and its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
}

impl Easing {
    /// Map linear progress `[0, 1]` onto the curve.
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
        }
    }
}

/// A single animation control point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub id: KeyframeId,

    /// Time relative to the clip start (seconds).
    pub time: f64,

    pub value: f64,

    #[serde(default)]
    pub easing: Easing,
}

impl Keyframe {
    pub fn new(time: f64, value: f64) -> Self {
        Self {
            id: KeyframeId::generate(),
            time,
            value,
            easing: Easing::Linear,
        }
    }
}

/// Keyframe sequences per property.
pub type KeyframeMap = BTreeMap<AnimatableProperty, Vec<Keyframe>>;

/// Insert a keyframe, evicting any existing keyframe closer than
/// `min_separation`, and keep the sequence sorted.
pub fn insert_keyframe(seq: &mut Vec<Keyframe>, keyframe: Keyframe, min_separation: f64) {
    seq.retain(|k| (k.time - keyframe.time).abs() >= min_separation);
    let at = seq.partition_point(|k| k.time < keyframe.time);
    seq.insert(at, keyframe);
}

/// Restore ordering and minimum separation on a sequence that was loaded
/// from disk or edited by hand. Among keyframes that collide, the one that
/// appears last in the input wins.
pub fn normalize_keyframes(seq: &mut Vec<Keyframe>, min_separation: f64) {
    let input = std::mem::take(seq);
    for keyframe in input {
        if keyframe.time.is_finite() && keyframe.value.is_finite() {
            insert_keyframe(seq, keyframe, min_separation);
        }
    }
}

/// Piecewise-interpolated value of a sorted sequence at `time`, or `None`
/// for an empty sequence.
///
/// Holds the first value before the first keyframe and the last value after
/// the last one. A NaN `time` yields the first value.
pub fn sample_keyframes(seq: &[Keyframe], time: f64) -> Option<f64> {
    let first = seq.first()?;
    let last = seq.last()?;

    if time.is_nan() || time <= first.time {
        return Some(first.value);
    }
    if time >= last.time {
        return Some(last.value);
    }

    let next = seq.partition_point(|k| k.time <= time);
    let prev = &seq[next - 1];
    let next = &seq[next];

    let span = next.time - prev.time;
    if span <= 0.0 {
        return Some(prev.value);
    }

    let ratio = prev.easing.apply((time - prev.time) / span);
    Some(prev.value + (next.value - prev.value) * ratio)
}

/// Partition a sequence at clip-relative time `cut`.
///
/// Keyframes before the cut stay on the left; keyframes at or after it move
/// to the right and are re-based so the cut becomes time zero. When the
/// sequence is non-empty both halves receive a boundary keyframe carrying
/// the interpolated value at the cut, so the split renders the same as the
/// original clip.
pub fn split_keyframes(
    seq: &[Keyframe],
    cut: f64,
    min_separation: f64,
) -> (Vec<Keyframe>, Vec<Keyframe>) {
    let Some(boundary) = sample_keyframes(seq, cut) else {
        return (Vec::new(), Vec::new());
    };

    let mut left: Vec<Keyframe> = seq.iter().filter(|k| k.time < cut).cloned().collect();
    let mut right: Vec<Keyframe> = seq
        .iter()
        .filter(|k| k.time >= cut)
        .map(|k| Keyframe {
            time: k.time - cut,
            ..k.clone()
        })
        .collect();

    if left.last().map_or(true, |k| cut - k.time >= min_separation) {
        left.push(Keyframe::new(cut, boundary));
    }
    if right.first().map_or(true, |k| k.time >= min_separation) {
        right.insert(0, Keyframe::new(0.0, boundary));
    }

    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn times(seq: &[Keyframe]) -> Vec<f64> {
        seq.iter().map(|k| k.time).collect()
    }

    #[test]
    fn test_insert_within_tolerance_replaces() {
        let mut seq = vec![Keyframe::new(0.0, 1.0), Keyframe::new(1.0, 2.0)];
        insert_keyframe(&mut seq, Keyframe::new(1.02, 5.0), 0.05);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[1].value, 5.0);
        assert!((seq[1].time - 1.02).abs() < 1e-12);
    }

    #[test]
    fn test_insert_keeps_sorted_order() {
        let mut seq = Vec::new();
        for t in [2.0, 0.5, 1.0, 3.0] {
            insert_keyframe(&mut seq, Keyframe::new(t, t), 0.05);
        }
        assert_eq!(times(&seq), vec![0.5, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_normalize_last_colliding_wins() {
        let mut seq = vec![
            Keyframe::new(1.0, 10.0),
            Keyframe::new(0.0, 0.0),
            Keyframe::new(1.01, 20.0),
        ];
        normalize_keyframes(&mut seq, 0.05);
        assert_eq!(times(&seq), vec![0.0, 1.01]);
        assert_eq!(seq[1].value, 20.0);
    }

    #[test]
    fn test_sample_clamps_and_interpolates() {
        let seq = vec![Keyframe::new(1.0, 0.0), Keyframe::new(3.0, 10.0)];
        assert_eq!(sample_keyframes(&seq, 0.0), Some(0.0));
        assert_eq!(sample_keyframes(&seq, 2.0), Some(5.0));
        assert_eq!(sample_keyframes(&seq, 9.0), Some(10.0));
        assert_eq!(sample_keyframes(&[], 1.0), None);
    }

    #[test]
    fn test_sample_non_finite_time() {
        let seq = vec![Keyframe::new(1.0, 0.0), Keyframe::new(3.0, 10.0)];
        assert_eq!(sample_keyframes(&seq, f64::NAN), Some(0.0));
        assert_eq!(sample_keyframes(&seq, f64::NEG_INFINITY), Some(0.0));
        assert_eq!(sample_keyframes(&seq, f64::INFINITY), Some(10.0));
    }

    #[test]
    fn test_split_inserts_boundary_values() {
        let seq = vec![Keyframe::new(0.0, 0.0), Keyframe::new(4.0, 8.0)];
        let (left, right) = split_keyframes(&seq, 1.0, 0.05);

        assert_eq!(times(&left), vec![0.0, 1.0]);
        assert_eq!(left[1].value, 2.0);
        assert_eq!(times(&right), vec![0.0, 3.0]);
        assert_eq!(right[0].value, 2.0);
        assert_eq!(right[1].value, 8.0);
    }

    #[test]
    fn test_split_empty_sequence() {
        let (left, right) = split_keyframes(&[], 1.0, 0.05);
        assert!(left.is_empty() && right.is_empty());
    }

    #[test]
    fn test_property_names_round_trip() {
        for p in AnimatableProperty::ALL {
            assert_eq!(AnimatableProperty::from_name(p.name()), Some(p));
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.name()));
        }
    }

    proptest! {
        #[test]
        fn prop_inserts_stay_sorted_and_separated(
            ts in proptest::collection::vec(0.0f64..10.0, 1..40)
        ) {
            let mut seq = Vec::new();
            for t in &ts {
                insert_keyframe(&mut seq, Keyframe::new(*t, 1.0), 0.05);
            }
            for pair in seq.windows(2) {
                prop_assert!(pair[1].time - pair[0].time >= 0.05);
            }
            // The most recent insert always survives.
            let last = *ts.last().unwrap();
            prop_assert!(seq.iter().any(|k| k.time == last));
        }
    }
}
