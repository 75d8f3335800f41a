//! Magnetic snapping.
//!
//! Snap targets are the timeline origin, the playhead, the edges of every
//! clip that is not being dragged and (optionally) marker times. A
//! candidate snaps to the nearest target within the threshold.

use canvasreel_project_model::{DragSession, TimelineStore};

/// Convert a pixel threshold into seconds at `zoom` pixels per second.
pub fn threshold_secs(threshold_px: f64, zoom: f64) -> f64 {
    if zoom > 0.0 {
        threshold_px / zoom
    } else {
        0.0
    }
}

/// Collect snap targets for a drag, excluding the dragged clips' own edges.
pub fn collect_points(
    store: &TimelineStore,
    session: &DragSession,
    include_markers: bool,
) -> Vec<f64> {
    let mut points = vec![0.0, store.current_time()];

    for clip in store.tracks().iter().flat_map(|t| t.clips.iter()) {
        if session.holds(&clip.id) {
            continue;
        }
        points.push(clip.start_time);
        points.push(clip.end_time());
    }

    if include_markers {
        points.extend(store.markers().iter().map(|m| m.time));
    }

    points
}

/// Nearest point to `value` within `threshold`, if any.
pub fn find_snap(value: f64, points: &[f64], threshold: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None; // (point, distance)
    for &point in points {
        let dist = (value - point).abs();
        if dist > threshold {
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((point, dist)),
        }
    }
    best.map(|(point, _)| point)
}

/// Snap whichever edge of `[start, end)` lands closer to a target.
///
/// Returns the correction to add to both edges.
pub fn best_edge_snap(start: f64, end: f64, points: &[f64], threshold: f64) -> Option<f64> {
    let left = find_snap(start, points, threshold).map(|p| p - start);
    let right = find_snap(end, points, threshold).map(|p| p - end);
    match (left, right) {
        (Some(l), Some(r)) => Some(if l.abs() <= r.abs() { l } else { r }),
        (l, r) => l.or(r),
    }
}
