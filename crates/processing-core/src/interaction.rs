//! Pointer interaction on the timeline.
//!
//! [`DragController`] turns pointer events into store mutations:
//!
//! ```text
//! Idle --pointer_down--> Dragging --pointer_move*--> Dragging --pointer_up--> Idle
//! ```
//!
//! Pointer-down freezes the pre-drag state of every manipulated clip in a
//! [`DragSession`]. Each move recomputes positions from that frozen state
//! and the total pointer displacement, so mutations are live and
//! idempotent. Invalid intermediate states are clamped or dropped, never
//! reported.

use canvasreel_common::AppConfig;
use canvasreel_project_model::{
    ClipId, DragMode, DragSession, DraggedClip, MarkerId, ModelError, TimelineStore, TrackId,
};

use crate::snap;

/// Interaction tunables.
#[derive(Debug, Clone)]
pub struct InteractionSettings {
    /// Magnetic snap distance in screen pixels.
    pub snap_threshold_px: f64,
    pub snap_to_markers: bool,
    /// Shortest clip a resize can produce (seconds).
    pub min_clip_duration_secs: f64,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl InteractionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            snap_threshold_px: config.interaction.snap_threshold_px,
            snap_to_markers: config.interaction.snap_to_markers,
            min_clip_duration_secs: config.timeline.min_clip_duration_secs,
        }
    }
}

/// What a pointer move did.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerOutcome {
    /// Time delta applied to the dragged clips (after snapping and clamps).
    pub delta: f64,
    /// Snap target the primary clip locked onto.
    pub snapped_to: Option<f64>,
    /// New track of the primary clip, when it changed lanes.
    pub moved_to: Option<TrackId>,
}

/// Pointer state machine over a [`TimelineStore`].
#[derive(Debug, Default)]
pub struct DragController {
    settings: InteractionSettings,
    marker_drag: Option<MarkerId>,
}

impl DragController {
    pub fn new(settings: InteractionSettings) -> Self {
        Self {
            settings,
            marker_drag: None,
        }
    }

    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    pub fn is_dragging(&self, store: &TimelineStore) -> bool {
        store.active_drag().is_some() || self.marker_drag.is_some()
    }

    /// Press on a clip body (`Move`) or edge (`ResizeLeft`/`ResizeRight`).
    ///
    /// A modified press toggles the clip's group in the selection. A plain
    /// press on an unselected clip selects it (and its group) exclusively;
    /// on a selected clip it keeps the selection so the whole selection
    /// drags together.
    pub fn pointer_down(
        &mut self,
        store: &mut TimelineStore,
        clip: &ClipId,
        mode: DragMode,
        pointer_x: f64,
        toggle: bool,
    ) -> Result<(), ModelError> {
        if toggle {
            store.select_clip(clip, true)?;
        } else if !store.selection().contains(clip) {
            store.select_clip(clip, false)?;
        }

        let held: Vec<ClipId> = if store.selection().contains(clip) {
            store.selection().clips.clone()
        } else {
            vec![clip.clone()]
        };

        let clips: Vec<DraggedClip> = store
            .tracks()
            .iter()
            .flat_map(|t| t.clips.iter())
            .filter(|c| held.contains(&c.id))
            .map(|c| DraggedClip {
                clip_id: c.id.clone(),
                start_time: c.start_time,
                duration: c.duration,
                start_offset: c.start_offset,
                track_id: c.track_id.clone(),
            })
            .collect();

        tracing::debug!(clip = %clip, ?mode, held = clips.len(), "Drag started");
        store.begin_drag(DragSession {
            mode,
            start_x: pointer_x,
            primary: clip.clone(),
            clips,
        });
        Ok(())
    }

    /// Pointer moved to `pointer_x` (screen pixels) over `hovered_track`.
    ///
    /// Returns `None` when no clip drag is active.
    pub fn pointer_move(
        &mut self,
        store: &mut TimelineStore,
        pointer_x: f64,
        hovered_track: Option<&TrackId>,
    ) -> Option<PointerOutcome> {
        let session = store.active_drag()?.clone();
        let primary = session.primary_clip()?.clone();

        let zoom = store.zoom();
        if zoom <= 0.0 {
            return None;
        }
        let raw = (pointer_x - session.start_x) / zoom;
        let threshold = snap::threshold_secs(self.settings.snap_threshold_px, zoom);
        let points = snap::collect_points(store, &session, self.settings.snap_to_markers);

        let outcome = match session.mode {
            DragMode::Move => {
                self.apply_move(store, &session, &primary, raw, threshold, &points, hovered_track)
            }
            DragMode::ResizeRight => {
                self.apply_resize_right(store, &primary, raw, threshold, &points)
            }
            DragMode::ResizeLeft => self.apply_resize_left(store, &primary, raw, threshold, &points),
        };
        Some(outcome)
    }

    /// Release: mutations are already live, so this only ends the session.
    pub fn pointer_up(&mut self, store: &mut TimelineStore) -> Option<DragSession> {
        self.marker_drag = None;
        let session = store.end_drag();
        if let Some(session) = &session {
            tracing::debug!(clip = %session.primary, "Drag finished");
        }
        session
    }

    /// Click on empty timeline space.
    pub fn click_empty(&mut self, store: &mut TimelineStore) {
        store.deselect_all();
    }

    /// Press on the ruler: move the playhead to the pointer.
    pub fn scrub(&mut self, store: &mut TimelineStore, ruler_x: f64) {
        if self.marker_drag.is_some() {
            return;
        }
        let zoom = store.zoom();
        if zoom > 0.0 {
            store.set_current_time((ruler_x / zoom).max(0.0));
        }
    }

    /// Press on a marker: select it and start dragging it.
    pub fn marker_down(
        &mut self,
        store: &mut TimelineStore,
        marker: &MarkerId,
    ) -> Result<(), ModelError> {
        store.select_marker(Some(marker))?;
        self.marker_drag = Some(marker.clone());
        Ok(())
    }

    /// Move the dragged marker to the ruler position (clamped at zero).
    pub fn marker_move(&mut self, store: &mut TimelineStore, ruler_x: f64) -> Option<f64> {
        let marker = self.marker_drag.clone()?;
        let zoom = store.zoom();
        if zoom <= 0.0 {
            return None;
        }
        let time = (ruler_x / zoom).max(0.0);
        store.update_marker(&marker, |m| m.time = time).ok()?;
        Some(time)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_move(
        &self,
        store: &mut TimelineStore,
        session: &DragSession,
        primary: &DraggedClip,
        raw: f64,
        threshold: f64,
        points: &[f64],
        hovered_track: Option<&TrackId>,
    ) -> PointerOutcome {
        let start = primary.start_time + raw;
        let end = start + primary.duration;
        let correction = snap::best_edge_snap(start, end, points, threshold);
        let mut delta = raw + correction.unwrap_or(0.0);

        // Clamp the shared delta so the earliest clip stops at zero and
        // relative offsets survive.
        let earliest = session
            .clips
            .iter()
            .map(|c| c.start_time)
            .fold(f64::INFINITY, f64::min);
        if earliest.is_finite() {
            delta = delta.max(-earliest);
        }

        let moved_to = if session.clips.len() == 1 {
            hovered_track
                .filter(|t| **t != primary.track_id)
                .filter(|t| self.track_accepts(&*store, t, &primary.clip_id))
                .cloned()
        } else {
            None
        };

        for dragged in &session.clips {
            let target_track = if dragged.clip_id == primary.clip_id {
                moved_to.clone().unwrap_or_else(|| dragged.track_id.clone())
            } else {
                dragged.track_id.clone()
            };
            let start_time = dragged.start_time + delta;
            if let Err(e) = store.update_clip(&dragged.clip_id, |c| {
                c.start_time = start_time;
                c.track_id = target_track;
            }) {
                tracing::trace!(clip = %dragged.clip_id, error = %e, "Move step rejected");
            }
        }

        let snapped_to = correction.map(|c| {
            let snapped_start = primary.start_time + raw + c;
            if points.iter().any(|p| (p - snapped_start).abs() < 1e-9) {
                snapped_start
            } else {
                snapped_start + primary.duration
            }
        });

        PointerOutcome {
            delta,
            snapped_to,
            moved_to,
        }
    }

    fn apply_resize_right(
        &self,
        store: &mut TimelineStore,
        primary: &DraggedClip,
        raw: f64,
        threshold: f64,
        points: &[f64],
    ) -> PointerOutcome {
        let mut end = primary.start_time + primary.duration + raw;
        let snapped_to = snap::find_snap(end, points, threshold);
        if let Some(point) = snapped_to {
            end = point;
        }

        let max_duration = self.max_duration(store, primary);
        let duration = (end - primary.start_time)
            .min(max_duration)
            .max(self.settings.min_clip_duration_secs);

        if let Err(e) = store.update_clip(&primary.clip_id, |c| c.duration = duration) {
            tracing::trace!(clip = %primary.clip_id, error = %e, "Resize step rejected");
        }

        PointerOutcome {
            delta: duration - primary.duration,
            snapped_to,
            moved_to: None,
        }
    }

    fn apply_resize_left(
        &self,
        store: &mut TimelineStore,
        primary: &DraggedClip,
        raw: f64,
        threshold: f64,
        points: &[f64],
    ) -> PointerOutcome {
        let speed = store.clip(&primary.clip_id).map_or(1.0, |c| c.speed());

        let mut start = primary.start_time + raw;
        let snapped_to = snap::find_snap(start, points, threshold);
        if let Some(point) = snapped_to {
            start = point;
        }

        let delta = (start - primary.start_time)
            .max(-primary.start_offset / speed)
            .max(-primary.start_time)
            .min(primary.duration - self.settings.min_clip_duration_secs);

        if let Err(e) = store.update_clip(&primary.clip_id, |c| {
            c.start_time = primary.start_time + delta;
            c.duration = primary.duration - delta;
            c.start_offset = (primary.start_offset + delta * speed).max(0.0);
        }) {
            tracing::trace!(clip = %primary.clip_id, error = %e, "Resize step rejected");
        }

        PointerOutcome {
            delta,
            snapped_to,
            moved_to: None,
        }
    }

    /// Longest duration the clip's source allows from its current offset.
    fn max_duration(&self, store: &TimelineStore, primary: &DraggedClip) -> f64 {
        let Some(clip) = store.clip(&primary.clip_id) else {
            return f64::INFINITY;
        };
        clip.asset_id
            .as_ref()
            .and_then(|id| store.asset(id))
            .and_then(|asset| asset.trim_limit())
            .map_or(f64::INFINITY, |limit| {
                (limit - primary.start_offset) / clip.speed()
            })
    }

    fn track_accepts(&self, store: &TimelineStore, track: &TrackId, clip: &ClipId) -> bool {
        match (store.track(track), store.clip(clip)) {
            (Some(track), Some(clip)) => track.kind.accepts(clip.kind),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvasreel_project_model::{Asset, AssetKind, Clip};

    fn setup() -> (TimelineStore, ClipId, ClipId) {
        let mut store = TimelineStore::default();
        store
            .add_asset(Asset::new("v", "v.mp4", AssetKind::Video, "v.mp4", 10.0))
            .unwrap();
        let asset = store.asset(&"v".into()).unwrap().clone();
        let a = store
            .add_clip(Clip::from_asset(&asset, "track-1", 2.0, 3.0))
            .unwrap();
        let b = store
            .add_clip(Clip::from_asset(&asset, "track-2", 20.0, 4.0))
            .unwrap();
        (store, a, b)
    }

    #[test]
    fn test_plain_click_selects_exclusively() {
        let (mut store, a, b) = setup();
        let mut ctl = DragController::default();
        ctl.pointer_down(&mut store, &a, DragMode::Move, 0.0, false)
            .unwrap();
        ctl.pointer_up(&mut store);
        ctl.pointer_down(&mut store, &b, DragMode::Move, 0.0, false)
            .unwrap();
        assert_eq!(store.selection().clips, vec![b]);
    }

    #[test]
    fn test_press_on_selected_clip_drags_whole_selection() {
        let (mut store, a, b) = setup();
        let mut ctl = DragController::default();
        store.select_clips([a.clone(), b.clone()]);
        ctl.pointer_down(&mut store, &a, DragMode::Move, 100.0, false)
            .unwrap();
        assert_eq!(store.active_drag().unwrap().clips.len(), 2);
        assert_eq!(store.selection().clips.len(), 2);
    }

    #[test]
    fn test_resize_right_snaps_to_neighbour_start() {
        let (mut store, a, _) = setup();
        let mut ctl = DragController::default();
        // Right edge at 5.0 dragged 150px (15s at 10px/s) lands at 20.1,
        // which snaps to the other clip's start at 20.0.
        ctl.pointer_down(&mut store, &a, DragMode::ResizeRight, 0.0, false)
            .unwrap();
        let outcome = ctl.pointer_move(&mut store, 151.0, None).unwrap();
        assert_eq!(outcome.snapped_to, Some(20.0));
        // The source only has 10s, so the clip stops at 12.0.
        assert_eq!(store.clip(&a).unwrap().end_time(), 12.0);
    }

    #[test]
    fn test_resize_left_clamps_to_source_start() {
        let (mut store, a, _) = setup();
        let mut ctl = DragController::default();
        ctl.pointer_down(&mut store, &a, DragMode::ResizeLeft, 100.0, false)
            .unwrap();
        ctl.pointer_move(&mut store, 0.0, None);
        let clip = store.clip(&a).unwrap();
        assert_eq!(clip.start_offset, 0.0);
        assert_eq!(clip.start_time, 2.0);
        assert_eq!(clip.duration, 3.0);
    }

    #[test]
    fn test_move_reassigns_single_clip_to_compatible_track() {
        let (mut store, a, _) = setup();
        let mut ctl = DragController::default();
        ctl.pointer_down(&mut store, &a, DragMode::Move, 0.0, false)
            .unwrap();
        let outcome = ctl
            .pointer_move(&mut store, 500.0, Some(&TrackId::new("track-2")))
            .unwrap();
        assert_eq!(outcome.moved_to, Some(TrackId::new("track-2")));
        assert_eq!(store.clip(&a).unwrap().track_id.as_str(), "track-2");

        // An audio lane is not a valid target.
        let outcome = ctl
            .pointer_move(&mut store, 500.0, Some(&TrackId::new("track-3")))
            .unwrap();
        assert_eq!(outcome.moved_to, None);
        assert_eq!(store.clip(&a).unwrap().track_id.as_str(), "track-1");
    }

    #[test]
    fn test_marker_drag_clamps_at_zero() {
        let mut store = TimelineStore::default();
        let marker = store.add_marker_at_playhead();
        let mut ctl = DragController::default();
        ctl.marker_down(&mut store, &marker).unwrap();
        assert_eq!(store.selection().marker.as_ref(), Some(&marker));
        assert_eq!(ctl.marker_move(&mut store, -40.0), Some(0.0));
        assert_eq!(ctl.marker_move(&mut store, 75.0), Some(7.5));
        ctl.scrub(&mut store, 30.0);
        assert_eq!(store.current_time(), 0.0);
        ctl.pointer_up(&mut store);
        ctl.scrub(&mut store, 30.0);
        assert_eq!(store.current_time(), 3.0);
    }
}
