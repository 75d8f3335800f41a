//! Entry transitions.
//!
//! A transition plays during the first `duration` seconds of a clip. Fades
//! scale opacity by linear progress; slides and wipes follow a cubic
//! ease-out.

use canvasreel_project_model::{Transition, TransitionKind};
use serde::Serialize;

/// `1 - (1 - p)^3`.
pub fn ease_out_cubic(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(3)
}

/// Visible region of a wiping clip, in the clip's local coordinate space
/// (origin at the clip center, before rotation and scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WipeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WipeRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// What an entry transition does to a clip at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionEffect {
    /// Multiplied into the clip opacity.
    pub opacity: f64,
    /// Added to the clip position (canvas pixels).
    pub offset_x: f64,
    pub offset_y: f64,
    pub wipe: Option<WipeRect>,
}

impl Default for TransitionEffect {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            wipe: None,
        }
    }
}

/// Effect of `transition` at `relative_time` on a `width`×`height` canvas.
///
/// Outside the transition window (or without a transition) the effect is
/// the identity.
pub fn entry_effect(
    transition: Option<&Transition>,
    relative_time: f64,
    width: f64,
    height: f64,
) -> TransitionEffect {
    let Some(transition) = transition else {
        return TransitionEffect::default();
    };
    if transition.kind == TransitionKind::None
        || transition.duration <= 0.0
        || relative_time >= transition.duration
    {
        return TransitionEffect::default();
    }

    let progress = (relative_time / transition.duration).clamp(0.0, 1.0);
    let ease = ease_out_cubic(progress);
    let remaining = 1.0 - ease;
    let mut effect = TransitionEffect::default();

    match transition.kind {
        TransitionKind::None => {}
        TransitionKind::Fade => effect.opacity = progress,
        TransitionKind::SlideLeft => effect.offset_x = width * remaining,
        TransitionKind::SlideRight => effect.offset_x = -width * remaining,
        TransitionKind::SlideUp => effect.offset_y = height * remaining,
        TransitionKind::SlideDown => effect.offset_y = -height * remaining,
        TransitionKind::WipeRight => {
            effect.wipe = Some(WipeRect {
                x: -width / 2.0,
                y: -height / 2.0,
                width: width * ease,
                height,
            })
        }
        TransitionKind::WipeLeft => {
            effect.wipe = Some(WipeRect {
                x: width / 2.0 - width * ease,
                y: -height / 2.0,
                width: width * ease,
                height,
            })
        }
        TransitionKind::WipeDown => {
            effect.wipe = Some(WipeRect {
                x: -width / 2.0,
                y: -height / 2.0,
                width,
                height: height * ease,
            })
        }
        TransitionKind::WipeUp => {
            effect.wipe = Some(WipeRect {
                x: -width / 2.0,
                y: height / 2.0 - height * ease,
                width,
                height: height * ease,
            })
        }
    }

    effect
}
