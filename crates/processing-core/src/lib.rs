//! CanvasReel Processing Core
//!
//! Pure timeline computation shared by the player, the compositor and the
//! timeline UI:
//! - **Interpolation:** resolve a clip property at a clip-relative time
//! - **Transitions:** entry fade/slide/wipe effects with cubic easing
//! - **Snapping:** magnetic snap points and nearest-edge search
//! - **Interaction:** pointer-driven move/resize/select state machine
//!
//! No I/O. Inputs are clips and store state; outputs are values or store
//! mutations.

pub mod interaction;
pub mod interpolate;
pub mod snap;
pub mod transition;

pub use interaction::{DragController, InteractionSettings, PointerOutcome};
pub use interpolate::{resolve, ResolvedFilters, ResolvedShadow, ResolvedText, ResolvedTransform};
pub use transition::{ease_out_cubic, entry_effect, TransitionEffect, WipeRect};
