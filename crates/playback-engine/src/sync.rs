//! Media synchronization.
//!
//! Every tick the synchronizer works out what each source *should* be doing
//! at the logical playhead, then nudges the sources that disagree. Sources
//! are only force-seeked when they are paused or have drifted past the
//! tolerance, so a healthy source plays undisturbed.

use std::collections::HashMap;

use canvasreel_common::DriftMeasurement;
use canvasreel_project_model::{AssetId, ClipKind, TimelineSnapshot};

use crate::pool::MediaPool;

/// What one source should be doing at the current instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesiredState {
    pub playing: bool,
    /// Target position in source seconds.
    pub time: f64,
    pub volume: f64,
    pub rate: f64,
}

impl DesiredState {
    /// Not covered by any clip.
    pub const IDLE: Self = Self {
        playing: false,
        time: 0.0,
        volume: 0.0,
        rate: 1.0,
    };
}

/// Counters from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub seeks: usize,
    pub plays: usize,
    pub pauses: usize,
    /// `play()` calls the source refused.
    pub rejected: usize,
}

/// Desired state of every asset's source at `time`.
///
/// Hidden tracks and text clips contribute nothing; hidden clips keep
/// their source in time but silent. When two clips of the
/// same asset cover `time`, the one visited last (highest track index)
/// wins.
pub fn desired_states(
    snapshot: &TimelineSnapshot,
    time: f64,
    playing: bool,
) -> HashMap<AssetId, DesiredState> {
    let mut states: HashMap<AssetId, DesiredState> = snapshot
        .assets
        .iter()
        .map(|a| (a.id.clone(), DesiredState::IDLE))
        .collect();

    for track in snapshot.tracks.iter().filter(|t| !t.is_hidden) {
        for clip in &track.clips {
            if clip.kind == ClipKind::Text || !clip.covers(time) {
                continue;
            }
            let Some(asset_id) = clip.asset_id.as_ref() else {
                continue;
            };
            let volume = if track.is_muted || clip.muted || !clip.visible {
                0.0
            } else {
                1.0
            };
            states.insert(
                asset_id.clone(),
                DesiredState {
                    playing,
                    time: clip.source_time(time),
                    volume,
                    rate: clip.speed(),
                },
            );
        }
    }

    states
}

/// Bring every pooled source in line with `states`.
///
/// `live` is the global playing flag: while paused, sources are hard-synced
/// to their desired time so scrubbing shows the right frame.
pub fn reconcile(
    pool: &mut MediaPool,
    states: &HashMap<AssetId, DesiredState>,
    live: bool,
    tolerance_secs: f64,
) -> SyncReport {
    let mut report = SyncReport::default();

    for (asset_id, state) in states {
        let Some(source) = pool.get_mut(asset_id) else {
            continue;
        };
        if !source.is_timed() {
            continue;
        }

        source.set_volume(state.volume);

        if state.playing {
            let drift = DriftMeasurement {
                expected_secs: state.time,
                measured_secs: source.current_time(),
            };
            if source.is_paused() || drift.exceeds(tolerance_secs * state.rate) {
                if state.time.is_finite() {
                    match source.seek(state.time) {
                        Ok(()) => report.seeks += 1,
                        Err(e) => {
                            tracing::warn!(asset = %asset_id, error = %e, "Seek failed")
                        }
                    }
                }
                source.set_rate(state.rate);
                if source.is_paused() {
                    match source.play() {
                        Ok(()) => report.plays += 1,
                        Err(e) => {
                            report.rejected += 1;
                            tracing::warn!(asset = %asset_id, error = %e, "Playback rejected");
                        }
                    }
                }
            }
        } else {
            if !source.is_paused() {
                source.pause();
                report.pauses += 1;
            }
            if !live && state.time.is_finite() {
                match source.seek(state.time) {
                    Ok(()) => report.seeks += 1,
                    Err(e) => tracing::warn!(asset = %asset_id, error = %e, "Seek failed"),
                }
            }
        }
    }

    report
}
