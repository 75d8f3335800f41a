//! The timeline mutation store.
//!
//! `TimelineStore` is the single writer of timeline state. Every mutation
//! (from pointer interaction, the player, or an external collaborator)
//! goes through it. Readers such as the render loop take a
//! [`TimelineSnapshot`], which shares track data through `Arc`s and is
//! never observed half-updated.

use std::sync::Arc;

use canvasreel_common::TimelineDefaults;

use crate::asset::{Asset, AssetKind};
use crate::clip::{Clip, ClipKind, ShadowStyle, TextStyle};
use crate::drag::DragSession;
use crate::error::ModelError;
use crate::ids::{AssetId, ClipId, GroupId, KeyframeId, MarkerId, TrackId};
use crate::keyframe::{insert_keyframe, split_keyframes, AnimatableProperty, Keyframe};
use crate::marker::Marker;
use crate::selection::Selection;
use crate::track::{Track, TrackKind};

/// Tunables consumed by store operations.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub image_duration_secs: f64,
    pub split_guard_secs: f64,
    pub keyframe_min_separation_secs: f64,
    pub min_clip_duration_secs: f64,
    pub project_duration_secs: f64,
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    /// Jump used by skip forward/back (seconds).
    pub skip_secs: f64,
}

impl From<&TimelineDefaults> for StoreSettings {
    fn from(d: &TimelineDefaults) -> Self {
        Self {
            image_duration_secs: d.image_duration_secs,
            split_guard_secs: d.split_guard_secs,
            keyframe_min_separation_secs: d.keyframe_min_separation_secs,
            min_clip_duration_secs: d.min_clip_duration_secs,
            project_duration_secs: d.project_duration_secs,
            default_zoom: d.default_zoom,
            min_zoom: d.min_zoom,
            max_zoom: d.max_zoom,
            zoom_step: d.zoom_step,
            skip_secs: 5.0,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from(&TimelineDefaults::default())
    }
}

/// Changes applied by [`TimelineStore::update_track`]. `None` leaves a
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct TrackPatch {
    pub name: Option<String>,
    pub is_muted: Option<bool>,
    pub is_hidden: Option<bool>,
}

/// Immutable view of the timeline at one revision.
#[derive(Debug, Clone)]
pub struct TimelineSnapshot {
    pub tracks: Arc<Vec<Arc<Track>>>,
    pub assets: Arc<Vec<Asset>>,
    pub markers: Arc<Vec<Marker>>,
    pub current_time: f64,
    pub is_playing: bool,
    pub duration: f64,
    pub revision: u64,
}

impl TimelineSnapshot {
    pub fn asset(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| &a.id == id)
    }

    pub fn clip(&self, id: &ClipId) -> Option<&Clip> {
        self.tracks.iter().find_map(|t| t.clip(id))
    }
}

/// Single-writer store for assets, tracks, clips, markers, selection,
/// playhead, zoom and the active drag session.
#[derive(Debug, Clone)]
pub struct TimelineStore {
    settings: StoreSettings,
    tracks: Arc<Vec<Arc<Track>>>,
    assets: Arc<Vec<Asset>>,
    markers: Arc<Vec<Marker>>,
    selection: Selection,
    current_time: f64,
    is_playing: bool,
    zoom: f64,
    duration: f64,
    active_drag: Option<DragSession>,
    revision: u64,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new(StoreSettings::default())
    }
}

impl TimelineStore {
    /// A store seeded with the default track set.
    pub fn new(settings: StoreSettings) -> Self {
        Self::with_tracks(settings, Track::default_set())
    }

    pub fn with_tracks(settings: StoreSettings, tracks: Vec<Track>) -> Self {
        let zoom = settings.default_zoom;
        let duration = settings.project_duration_secs;
        Self {
            settings,
            tracks: Arc::new(tracks.into_iter().map(Arc::new).collect()),
            assets: Arc::new(Vec::new()),
            markers: Arc::new(Vec::new()),
            selection: Selection::default(),
            current_time: 0.0,
            is_playing: false,
            zoom,
            duration,
            active_drag: None,
            revision: 0,
        }
    }

    /// Rebuild a store from persisted parts, normalizing keyframes and
    /// rejecting structurally invalid clips.
    pub fn from_parts(
        settings: StoreSettings,
        assets: Vec<Asset>,
        tracks: Vec<Track>,
        markers: Vec<Marker>,
        duration: f64,
    ) -> Result<Self, ModelError> {
        let mut store = Self::with_tracks(settings, Vec::new());
        store.duration = duration;
        for asset in assets {
            store.add_asset(asset)?;
        }
        for mut track in tracks {
            let clips = std::mem::take(&mut track.clips);
            store.add_track(track)?;
            for mut clip in clips {
                for seq in clip.keyframes.values_mut() {
                    crate::keyframe::normalize_keyframes(
                        seq,
                        store.settings.keyframe_min_separation_secs,
                    );
                }
                store.add_clip(clip)?;
            }
        }
        for marker in markers {
            store.add_marker(marker)?;
        }
        store.revision = 0;
        Ok(store)
    }

    // ── Read accessors ───────────────────────────────────────────────

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn tracks(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn active_drag(&self) -> Option<&DragSession> {
        self.active_drag.as_ref()
    }

    /// Increments on every committed change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            tracks: Arc::clone(&self.tracks),
            assets: Arc::clone(&self.assets),
            markers: Arc::clone(&self.markers),
            current_time: self.current_time,
            is_playing: self.is_playing,
            duration: self.duration,
            revision: self.revision,
        }
    }

    pub fn asset(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| &a.id == id)
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id).map(|t| t.as_ref())
    }

    pub fn track_index(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == id)
    }

    pub fn clip(&self, id: &ClipId) -> Option<&Clip> {
        self.tracks.iter().find_map(|t| t.clip(id))
    }

    pub fn marker(&self, id: &MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| &m.id == id)
    }

    /// Clips whose `[start, end)` covers `time`, top track first.
    pub fn clips_at(&self, time: f64) -> Vec<&Clip> {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .filter(|c| c.covers(time))
            .collect()
    }

    /// End of the last clip on any track.
    pub fn content_end(&self) -> f64 {
        self.tracks.iter().map(|t| t.content_end()).fold(0.0, f64::max)
    }

    /// Stacking order of a clip: the topmost track has the highest value.
    pub fn z_index(&self, id: &ClipId) -> Option<usize> {
        let clip = self.clip(id)?;
        let index = self.track_index(&clip.track_id)?;
        Some(self.tracks.len() - index)
    }

    /// Whether a visible video track above this visual clip has a clip
    /// overlapping it in time.
    pub fn is_obscured(&self, id: &ClipId) -> bool {
        let Some(clip) = self.clip(id) else {
            return false;
        };
        if !matches!(clip.kind, ClipKind::Video | ClipKind::Image) {
            return false;
        }
        let Some(index) = self.track_index(&clip.track_id) else {
            return false;
        };
        self.tracks[..index]
            .iter()
            .filter(|t| t.kind == TrackKind::Video && !t.is_hidden)
            .any(|t| {
                t.clips
                    .iter()
                    .any(|c| c.overlaps(clip.start_time, clip.end_time()))
            })
    }

    /// Ids of every clip sharing `id`'s group, `id` first.
    pub fn group_members(&self, id: &ClipId) -> Vec<ClipId> {
        let mut members = vec![id.clone()];
        let Some(group) = self.clip(id).and_then(|c| c.group_id.clone()) else {
            return members;
        };
        for clip in self.tracks.iter().flat_map(|t| t.clips.iter()) {
            if clip.group_id.as_ref() == Some(&group) && &clip.id != id {
                members.push(clip.id.clone());
            }
        }
        members
    }

    // ── Assets ───────────────────────────────────────────────────────

    pub fn add_asset(&mut self, mut asset: Asset) -> Result<(), ModelError> {
        if self.asset(&asset.id).is_some() {
            return Err(ModelError::DuplicateId(asset.id.to_string()));
        }
        if asset.kind == AssetKind::Image && (!asset.duration.is_finite() || asset.duration <= 0.0) {
            asset.duration = self.settings.image_duration_secs;
        }
        tracing::debug!(asset = %asset.id, kind = ?asset.kind, "Added asset");
        Arc::make_mut(&mut self.assets).push(asset);
        self.touch();
        Ok(())
    }

    /// Remove an asset and every clip that references it. Returns the ids
    /// of the removed clips.
    pub fn remove_asset(&mut self, id: &AssetId) -> Result<Vec<ClipId>, ModelError> {
        let index = self
            .assets
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| ModelError::UnknownAsset(id.clone()))?;
        Arc::make_mut(&mut self.assets).remove(index);

        let mut removed = Vec::new();
        for ti in 0..self.tracks.len() {
            if !self.tracks[ti]
                .clips
                .iter()
                .any(|c| c.asset_id.as_ref() == Some(id))
            {
                continue;
            }
            let track = self.track_mut(ti);
            track.clips.retain(|c| {
                let keep = c.asset_id.as_ref() != Some(id);
                if !keep {
                    removed.push(c.id.clone());
                }
                keep
            });
        }
        for clip in &removed {
            self.selection.remove(clip);
        }

        tracing::info!(asset = %id, clips = removed.len(), "Removed asset");
        self.touch();
        Ok(removed)
    }

    // ── Tracks ───────────────────────────────────────────────────────

    pub fn add_track(&mut self, track: Track) -> Result<(), ModelError> {
        if self.track(&track.id).is_some() {
            return Err(ModelError::DuplicateId(track.id.to_string()));
        }
        Arc::make_mut(&mut self.tracks).push(Arc::new(track));
        self.touch();
        Ok(())
    }

    pub fn update_track(&mut self, id: &TrackId, patch: TrackPatch) -> Result<(), ModelError> {
        let index = self
            .track_index(id)
            .ok_or_else(|| ModelError::UnknownTrack(id.clone()))?;
        let track = self.track_mut(index);
        if let Some(name) = patch.name {
            track.name = name;
        }
        if let Some(muted) = patch.is_muted {
            track.is_muted = muted;
        }
        if let Some(hidden) = patch.is_hidden {
            track.is_hidden = hidden;
        }
        self.touch();
        Ok(())
    }

    /// Remove a track together with its clips.
    pub fn remove_track(&mut self, id: &TrackId) -> Result<Track, ModelError> {
        let index = self
            .track_index(id)
            .ok_or_else(|| ModelError::UnknownTrack(id.clone()))?;
        let track = Arc::make_mut(&mut self.tracks).remove(index);
        for clip in &track.clips {
            self.selection.remove(&clip.id);
        }
        self.touch();
        Ok(Arc::try_unwrap(track).unwrap_or_else(|shared| (*shared).clone()))
    }

    // ── Clips ────────────────────────────────────────────────────────

    pub fn add_clip(&mut self, clip: Clip) -> Result<ClipId, ModelError> {
        if self.locate(&clip.id).is_some() {
            return Err(ModelError::DuplicateId(clip.id.to_string()));
        }
        let index = self.check_clip(&clip)?;
        let id = clip.id.clone();
        tracing::debug!(clip = %id, track = %clip.track_id, start = clip.start_time, "Added clip");
        self.track_mut(index).clips.push(clip);
        self.touch();
        Ok(id)
    }

    /// Apply `edit` to a copy of the clip and commit it if the result is
    /// valid. A changed `track_id` moves the clip to the end of the new
    /// track in the same step. The clip id cannot be changed.
    pub fn update_clip(
        &mut self,
        id: &ClipId,
        edit: impl FnOnce(&mut Clip),
    ) -> Result<(), ModelError> {
        let (ti, ci) = self
            .locate(id)
            .ok_or_else(|| ModelError::UnknownClip(id.clone()))?;

        let mut updated = self.tracks[ti].clips[ci].clone();
        edit(&mut updated);
        updated.id = id.clone();

        let target = self.check_clip(&updated)?;
        if target == ti {
            self.track_mut(ti).clips[ci] = updated;
        } else {
            tracing::debug!(clip = %id, to = %updated.track_id, "Moved clip between tracks");
            self.track_mut(ti).clips.remove(ci);
            self.track_mut(target).clips.push(updated);
        }
        self.touch();
        Ok(())
    }

    pub fn remove_clip(&mut self, id: &ClipId) -> Result<Clip, ModelError> {
        let (ti, ci) = self
            .locate(id)
            .ok_or_else(|| ModelError::UnknownClip(id.clone()))?;
        let clip = self.track_mut(ti).clips.remove(ci);
        self.selection.remove(id);
        self.touch();
        Ok(clip)
    }

    /// Delete every selected clip and clear the selection.
    pub fn remove_selected_clips(&mut self) -> usize {
        let selected = std::mem::take(&mut self.selection.clips);
        let removed = selected
            .iter()
            .filter(|id| self.remove_clip(id).is_ok())
            .count();
        self.touch();
        removed
    }

    /// Append a clip for `asset_id` after the last clip of the first track
    /// that accepts its kind.
    pub fn add_clip_from_asset(&mut self, asset_id: &AssetId) -> Result<ClipId, ModelError> {
        let asset = self
            .asset(asset_id)
            .cloned()
            .ok_or_else(|| ModelError::UnknownAsset(asset_id.clone()))?;
        let track = self
            .tracks
            .iter()
            .find(|t| t.kind.accepts_asset(asset.kind))
            .ok_or(ModelError::NoCompatibleTrack(ClipKind::from(asset.kind)))?;

        let clip = Clip::from_asset(&asset, track.id.clone(), track.content_end(), asset.duration);
        self.add_clip(clip)
    }

    /// Create a clip for an asset dropped on `track_id` at `start_time`.
    pub fn drop_asset_on_track(
        &mut self,
        asset_id: &AssetId,
        track_id: &TrackId,
        start_time: f64,
    ) -> Result<ClipId, ModelError> {
        let asset = self
            .asset(asset_id)
            .cloned()
            .ok_or_else(|| ModelError::UnknownAsset(asset_id.clone()))?;
        let track = self
            .track(track_id)
            .ok_or_else(|| ModelError::UnknownTrack(track_id.clone()))?;
        if !track.kind.accepts_asset(asset.kind) {
            return Err(ModelError::IncompatibleTrack {
                track: track_id.clone(),
                track_kind: track.kind,
                clip_kind: ClipKind::from(asset.kind),
            });
        }

        let clip = Clip::from_asset(&asset, track_id.clone(), start_time.max(0.0), asset.duration);
        self.add_clip(clip)
    }

    /// Add a five second text layer at `start_time` on the first text track.
    pub fn add_text_clip(
        &mut self,
        content: impl Into<String>,
        start_time: f64,
    ) -> Result<ClipId, ModelError> {
        let track = self
            .tracks
            .iter()
            .find(|t| t.kind == TrackKind::Text)
            .ok_or(ModelError::NoCompatibleTrack(ClipKind::Text))?;

        let style = TextStyle {
            content: content.into(),
            font_size: Some(60.0),
            font_family: Some(TextStyle::DEFAULT_FAMILY.to_string()),
            color: Some(TextStyle::DEFAULT_COLOR.to_string()),
            bold: true,
            italic: false,
            shadow: Some(ShadowStyle::default()),
        };
        let mut clip = Clip::text(track.id.clone(), start_time.max(0.0), 5.0, style);
        clip.name = "Text Layer".to_string();
        self.add_clip(clip)
    }

    /// Split every selected clip at the playhead. Clips where the playhead
    /// falls inside the guard band of either edge are left untouched. The
    /// selection is cleared afterwards. Returns the ids of the new right
    /// halves.
    pub fn split_selected(&mut self) -> Vec<ClipId> {
        if self.selection.clips.is_empty() {
            return Vec::new();
        }

        let at = self.current_time;
        let guard = self.settings.split_guard_secs;
        let separation = self.settings.keyframe_min_separation_secs;
        let selected = std::mem::take(&mut self.selection.clips);
        let mut created = Vec::new();

        for id in selected {
            let Some((ti, ci)) = self.locate(&id) else {
                continue;
            };
            let clip = &self.tracks[ti].clips[ci];
            if at <= clip.start_time + guard || at >= clip.end_time() - guard {
                continue;
            }

            let delta = at - clip.start_time;
            let mut left = clip.clone();
            let mut right = clip.clone();

            left.duration = delta;

            right.id = ClipId::generate();
            right.start_time = at;
            right.start_offset = clip.start_offset + delta * clip.speed();
            right.duration = clip.duration - delta;
            // The right half continues mid-shot; replaying the entry
            // transition would change the picture.
            right.transition = None;

            for (property, seq) in &clip.keyframes {
                let (l, r) = split_keyframes(seq, delta, separation);
                left.keyframes.insert(*property, l);
                right.keyframes.insert(*property, r);
            }

            tracing::info!(clip = %id, right = %right.id, at, "Split clip");
            created.push(right.id.clone());
            let track = self.track_mut(ti);
            track.clips[ci] = left;
            track.clips.insert(ci + 1, right);
        }

        self.touch();
        created
    }

    /// Copy each selected clip to directly after itself. The copies are
    /// ungrouped and become the selection.
    pub fn duplicate_selected(&mut self) -> Vec<ClipId> {
        let mut copies = Vec::new();
        for id in self.selection.clips.clone() {
            let Some((ti, ci)) = self.locate(&id) else {
                continue;
            };
            let mut copy = self.tracks[ti].clips[ci].clone();
            copy.id = ClipId::generate();
            copy.start_time += copy.duration;
            copy.group_id = None;
            for seq in copy.keyframes.values_mut() {
                for keyframe in seq.iter_mut() {
                    keyframe.id = KeyframeId::generate();
                }
            }
            copies.push(copy.id.clone());
            self.track_mut(ti).clips.push(copy);
        }

        if !copies.is_empty() {
            tracing::debug!(count = copies.len(), "Duplicated clips");
        }
        self.selection.clips = copies.clone();
        self.touch();
        copies
    }

    /// Put the selected clips into one fresh group. Needs at least two.
    pub fn group_selected(&mut self) -> Option<GroupId> {
        if self.selection.clips.len() < 2 {
            return None;
        }
        let group = GroupId::generate();
        for id in self.selection.clips.clone() {
            if let Some((ti, ci)) = self.locate(&id) {
                self.track_mut(ti).clips[ci].group_id = Some(group.clone());
            }
        }
        tracing::debug!(group = %group, "Grouped clips");
        self.touch();
        Some(group)
    }

    /// Clear the group of every selected clip.
    pub fn ungroup_selected(&mut self) -> usize {
        let mut cleared = 0;
        for id in self.selection.clips.clone() {
            if let Some((ti, ci)) = self.locate(&id) {
                self.track_mut(ti).clips[ci].group_id = None;
                cleared += 1;
            }
        }
        if cleared > 0 {
            self.touch();
        }
        cleared
    }

    // ── Keyframes ────────────────────────────────────────────────────

    /// Insert a keyframe, replacing any existing one within the minimum
    /// separation.
    pub fn set_keyframe(
        &mut self,
        clip: &ClipId,
        property: AnimatableProperty,
        time: f64,
        value: f64,
    ) -> Result<KeyframeId, ModelError> {
        let separation = self.settings.keyframe_min_separation_secs;
        let keyframe = Keyframe::new(time.max(0.0), value);
        let id = keyframe.id.clone();
        self.update_clip(clip, |c| {
            insert_keyframe(c.keyframes.entry(property).or_default(), keyframe, separation);
        })?;
        Ok(id)
    }

    pub fn remove_keyframe(
        &mut self,
        clip: &ClipId,
        property: AnimatableProperty,
        keyframe: &KeyframeId,
    ) -> Result<(), ModelError> {
        self.update_clip(clip, |c| {
            if let Some(seq) = c.keyframes.get_mut(&property) {
                seq.retain(|k| &k.id != keyframe);
                if seq.is_empty() {
                    c.keyframes.remove(&property);
                }
            }
        })
    }

    // ── Markers ──────────────────────────────────────────────────────

    pub fn add_marker(&mut self, marker: Marker) -> Result<MarkerId, ModelError> {
        if self.marker(&marker.id).is_some() {
            return Err(ModelError::DuplicateId(marker.id.to_string()));
        }
        let id = marker.id.clone();
        Arc::make_mut(&mut self.markers).push(marker);
        self.touch();
        Ok(id)
    }

    /// Add a default marker at the playhead.
    pub fn add_marker_at_playhead(&mut self) -> MarkerId {
        let marker = Marker::new(self.current_time, "Marker");
        let id = marker.id.clone();
        Arc::make_mut(&mut self.markers).push(marker);
        self.touch();
        id
    }

    /// Edit a marker. Its time is clamped at zero.
    pub fn update_marker(
        &mut self,
        id: &MarkerId,
        edit: impl FnOnce(&mut Marker),
    ) -> Result<(), ModelError> {
        let marker = Arc::make_mut(&mut self.markers)
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| ModelError::UnknownMarker(id.clone()))?;
        edit(marker);
        marker.id = id.clone();
        marker.time = if marker.time.is_finite() {
            marker.time.max(0.0)
        } else {
            0.0
        };
        self.touch();
        Ok(())
    }

    pub fn remove_marker(&mut self, id: &MarkerId) -> Result<Marker, ModelError> {
        let index = self
            .markers
            .iter()
            .position(|m| &m.id == id)
            .ok_or_else(|| ModelError::UnknownMarker(id.clone()))?;
        let marker = Arc::make_mut(&mut self.markers).remove(index);
        if self.selection.marker.as_ref() == Some(id) {
            self.selection.marker = None;
        }
        self.touch();
        Ok(marker)
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Select a clip together with its group.
    ///
    /// Without `toggle` the group becomes the whole selection. With
    /// `toggle` the group is removed when every member is already
    /// selected, otherwise added.
    pub fn select_clip(&mut self, id: &ClipId, toggle: bool) -> Result<(), ModelError> {
        if self.clip(id).is_none() {
            return Err(ModelError::UnknownClip(id.clone()));
        }
        let members = self.group_members(id);

        if toggle {
            if members.iter().all(|m| self.selection.contains(m)) {
                for m in &members {
                    self.selection.remove(m);
                }
            } else {
                for m in members {
                    self.selection.insert(m);
                }
            }
        } else {
            self.selection.clips = members;
        }
        self.touch();
        Ok(())
    }

    /// Replace the clip selection with `ids`, ignoring unknown ones.
    pub fn select_clips(&mut self, ids: impl IntoIterator<Item = ClipId>) {
        self.selection.clips.clear();
        for id in ids {
            if self.clip(&id).is_some() {
                self.selection.insert(id);
            }
        }
        self.touch();
    }

    pub fn deselect_all(&mut self) {
        self.selection.clips.clear();
        self.touch();
    }

    pub fn select_marker(&mut self, id: Option<&MarkerId>) -> Result<(), ModelError> {
        if let Some(id) = id {
            if self.marker(id).is_none() {
                return Err(ModelError::UnknownMarker(id.clone()));
            }
        }
        self.selection.marker = id.cloned();
        self.touch();
        Ok(())
    }

    // ── Playhead & zoom ──────────────────────────────────────────────

    /// Move the playhead, clamped at zero. Non-finite input is ignored.
    pub fn set_current_time(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        self.current_time = time.max(0.0);
        self.touch();
    }

    pub fn set_playing(&mut self, playing: bool) {
        if self.is_playing != playing {
            tracing::debug!(playing, at = self.current_time, "Playback state changed");
            self.is_playing = playing;
            self.touch();
        }
    }

    pub fn toggle_playing(&mut self) {
        self.set_playing(!self.is_playing);
    }

    /// Jump forward, stopping at the project duration.
    pub fn skip_forward(&mut self) {
        let target = (self.current_time + self.settings.skip_secs).min(self.duration);
        self.set_current_time(target);
    }

    pub fn skip_to_start(&mut self) {
        self.set_current_time(0.0);
    }

    pub fn set_duration(&mut self, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.duration = duration;
            self.touch();
        }
    }

    /// Set zoom in pixels per second, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_finite() {
            return;
        }
        self.zoom = zoom.clamp(self.settings.min_zoom, self.settings.max_zoom);
        self.touch();
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * self.settings.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / self.settings.zoom_step);
    }

    // ── Drag session ─────────────────────────────────────────────────

    pub fn begin_drag(&mut self, session: DragSession) {
        self.active_drag = Some(session);
    }

    pub fn end_drag(&mut self) -> Option<DragSession> {
        self.active_drag.take()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn locate(&self, id: &ClipId) -> Option<(usize, usize)> {
        self.tracks
            .iter()
            .enumerate()
            .find_map(|(ti, t)| t.position(id).map(|ci| (ti, ci)))
    }

    /// Copy-on-write access to one track.
    fn track_mut(&mut self, index: usize) -> &mut Track {
        Arc::make_mut(&mut Arc::make_mut(&mut self.tracks)[index])
    }

    /// Validate a clip against its target track and asset; returns the
    /// target track index.
    fn check_clip(&self, clip: &Clip) -> Result<usize, ModelError> {
        let index = self
            .track_index(&clip.track_id)
            .ok_or_else(|| ModelError::UnknownTrack(clip.track_id.clone()))?;
        let track = &self.tracks[index];
        if !track.kind.accepts(clip.kind) {
            return Err(ModelError::IncompatibleTrack {
                track: track.id.clone(),
                track_kind: track.kind,
                clip_kind: clip.kind,
            });
        }
        let asset = match &clip.asset_id {
            Some(asset_id) => Some(
                self.asset(asset_id)
                    .ok_or_else(|| ModelError::UnknownAsset(asset_id.clone()))?,
            ),
            None => None,
        };
        clip.validate(asset)?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_video() -> (TimelineStore, ClipId) {
        let mut store = TimelineStore::default();
        store
            .add_asset(Asset::new("a1", "intro.mp4", AssetKind::Video, "intro.mp4", 20.0))
            .unwrap();
        let asset = store.asset(&AssetId::new("a1")).unwrap().clone();
        let clip = Clip::from_asset(&asset, "track-1", 2.0, 6.0);
        let id = store.add_clip(clip).unwrap();
        (store, id)
    }

    #[test]
    fn test_default_store_layout() {
        let store = TimelineStore::default();
        assert_eq!(store.tracks().len(), 4);
        assert_eq!(store.zoom(), 10.0);
        assert_eq!(store.duration(), 300.0);
    }

    #[test]
    fn test_split_at_playhead() {
        let (mut store, id) = store_with_video();
        store.select_clip(&id, false).unwrap();
        store.set_current_time(5.0);

        let created = store.split_selected();
        assert_eq!(created.len(), 1);

        let left = store.clip(&id).unwrap();
        let right = store.clip(&created[0]).unwrap();
        assert_eq!(left.duration, 3.0);
        assert_eq!(right.start_time, 5.0);
        assert_eq!(right.start_offset, 3.0);
        assert_eq!(right.duration, 3.0);
        assert!(store.selection().clips.is_empty());

        let track = store.track(&TrackId::new("track-1")).unwrap();
        assert_eq!(track.clips[1].id, created[0]);
    }

    #[test]
    fn test_split_guard_band_is_noop() {
        let (mut store, id) = store_with_video();
        store.select_clip(&id, false).unwrap();
        store.set_current_time(2.1);
        assert!(store.split_selected().is_empty());
        store.set_current_time(7.95);
        store.select_clip(&id, false).unwrap();
        assert!(store.split_selected().is_empty());
        assert_eq!(store.clip(&id).unwrap().duration, 6.0);
    }

    #[test]
    fn test_split_scales_offset_by_speed() {
        let (mut store, id) = store_with_video();
        store.update_clip(&id, |c| c.speed = Some(2.0)).unwrap();
        store.select_clip(&id, false).unwrap();
        store.set_current_time(4.0);
        let created = store.split_selected();
        assert_eq!(store.clip(&created[0]).unwrap().start_offset, 4.0);
    }

    #[test]
    fn test_update_clip_moves_between_tracks() {
        let (mut store, id) = store_with_video();
        store
            .update_clip(&id, |c| c.track_id = TrackId::new("track-2"))
            .unwrap();
        assert!(store.track(&TrackId::new("track-1")).unwrap().clips.is_empty());
        assert_eq!(store.track(&TrackId::new("track-2")).unwrap().clips.len(), 1);
        assert_eq!(store.clip(&id).unwrap().track_id.as_str(), "track-2");
    }

    #[test]
    fn test_update_clip_rejects_incompatible_track() {
        let (mut store, id) = store_with_video();
        let err = store
            .update_clip(&id, |c| c.track_id = TrackId::new("track-3"))
            .unwrap_err();
        assert!(matches!(err, ModelError::IncompatibleTrack { .. }));
        assert_eq!(store.clip(&id).unwrap().track_id.as_str(), "track-1");
    }

    #[test]
    fn test_update_clip_rejects_trim_overflow() {
        let (mut store, id) = store_with_video();
        assert!(store.update_clip(&id, |c| c.duration = 25.0).is_err());
        assert_eq!(store.clip(&id).unwrap().duration, 6.0);
    }

    #[test]
    fn test_duplicate_places_copy_after_and_selects_it() {
        let (mut store, id) = store_with_video();
        store.select_clip(&id, false).unwrap();
        store.group_selected();
        let copies = store.duplicate_selected();
        assert_eq!(copies.len(), 1);
        let copy = store.clip(&copies[0]).unwrap();
        assert_eq!(copy.start_time, 8.0);
        assert!(copy.group_id.is_none());
        assert_eq!(store.selection().clips, copies);
    }

    #[test]
    fn test_group_needs_two_clips() {
        let (mut store, id) = store_with_video();
        store.select_clip(&id, false).unwrap();
        assert!(store.group_selected().is_none());

        let copies = store.duplicate_selected();
        store.select_clips([id.clone(), copies[0].clone()]);
        let group = store.group_selected().unwrap();
        assert_eq!(store.clip(&id).unwrap().group_id.as_ref(), Some(&group));

        // Clicking one member selects both.
        store.deselect_all();
        store.select_clip(&copies[0], false).unwrap();
        assert_eq!(store.selection().clips.len(), 2);

        // Toggling removes the whole group.
        store.select_clip(&id, true).unwrap();
        assert!(store.selection().clips.is_empty());

        store.select_clip(&id, true).unwrap();
        assert_eq!(store.ungroup_selected(), 2);
        assert!(store.clip(&id).unwrap().group_id.is_none());
    }

    #[test]
    fn test_remove_asset_cascades() {
        let (mut store, id) = store_with_video();
        store.select_clip(&id, false).unwrap();
        let removed = store.remove_asset(&AssetId::new("a1")).unwrap();
        assert_eq!(removed, vec![id.clone()]);
        assert!(store.clip(&id).is_none());
        assert!(store.selection().clips.is_empty());
    }

    #[test]
    fn test_add_clip_from_asset_appends() {
        let (mut store, _) = store_with_video();
        let id = store.add_clip_from_asset(&AssetId::new("a1")).unwrap();
        let clip = store.clip(&id).unwrap();
        assert_eq!(clip.track_id.as_str(), "track-1");
        assert_eq!(clip.start_time, 8.0);
        assert_eq!(clip.duration, 20.0);
    }

    #[test]
    fn test_image_assets_get_placeholder_duration() {
        let mut store = TimelineStore::default();
        store
            .add_asset(Asset::new("img", "logo.png", AssetKind::Image, "logo.png", 0.0))
            .unwrap();
        assert_eq!(store.asset(&AssetId::new("img")).unwrap().duration, 5.0);
    }

    #[test]
    fn test_drop_on_incompatible_track() {
        let (mut store, _) = store_with_video();
        let err = store
            .drop_asset_on_track(&AssetId::new("a1"), &TrackId::new("track-3"), 1.0)
            .unwrap_err();
        assert!(matches!(err, ModelError::IncompatibleTrack { .. }));
    }

    #[test]
    fn test_text_clip_defaults() {
        let mut store = TimelineStore::default();
        let id = store.add_text_clip("Hello", 0.0).unwrap();
        let clip = store.clip(&id).unwrap();
        assert_eq!(clip.track_id.as_str(), "track-text");
        assert_eq!(clip.duration, 5.0);
        let text = clip.text.as_ref().unwrap();
        assert_eq!(text.font_size, Some(60.0));
        assert!(text.bold);
        assert!(text.shadow.is_some());
    }

    #[test]
    fn test_zoom_and_playhead_clamps() {
        let mut store = TimelineStore::default();
        store.set_zoom(500.0);
        assert_eq!(store.zoom(), 200.0);
        store.set_zoom(0.1);
        assert_eq!(store.zoom(), 1.0);
        store.zoom_in();
        assert!((store.zoom() - 1.2).abs() < 1e-12);

        store.set_current_time(-3.0);
        assert_eq!(store.current_time(), 0.0);
        store.set_current_time(298.0);
        store.skip_forward();
        assert_eq!(store.current_time(), 300.0);
    }

    #[test]
    fn test_z_index_and_obscured() {
        let (mut store, lower) = store_with_video();
        let asset = store.asset(&AssetId::new("a1")).unwrap().clone();
        let upper = store
            .add_clip(Clip::from_asset(&asset, "track-1", 4.0, 2.0))
            .unwrap();
        store
            .update_clip(&lower, |c| c.track_id = TrackId::new("track-2"))
            .unwrap();

        assert_eq!(store.z_index(&upper), Some(3));
        assert_eq!(store.z_index(&lower), Some(2));
        assert!(store.is_obscured(&lower));
        assert!(!store.is_obscured(&upper));

        store
            .update_track(
                &TrackId::new("track-1"),
                TrackPatch {
                    is_hidden: Some(true),
                    ..TrackPatch::default()
                },
            )
            .unwrap();
        assert!(!store.is_obscured(&lower));
    }

    #[test]
    fn test_set_keyframe_evicts_neighbour() {
        let (mut store, id) = store_with_video();
        store
            .set_keyframe(&id, AnimatableProperty::Opacity, 1.0, 0.0)
            .unwrap();
        let kept = store
            .set_keyframe(&id, AnimatableProperty::Opacity, 1.03, 0.5)
            .unwrap();
        let seq = &store.clip(&id).unwrap().keyframes[&AnimatableProperty::Opacity];
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].id, kept);

        store
            .remove_keyframe(&id, AnimatableProperty::Opacity, &kept)
            .unwrap();
        assert!(store.clip(&id).unwrap().keyframes.is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let (mut store, id) = store_with_video();
        let snapshot = store.snapshot();
        store.update_clip(&id, |c| c.start_time = 9.0).unwrap();
        assert_eq!(snapshot.clip(&id).unwrap().start_time, 2.0);
        assert_eq!(store.clip(&id).unwrap().start_time, 9.0);
        assert!(store.revision() > snapshot.revision);
    }

    #[test]
    fn test_marker_time_clamped() {
        let mut store = TimelineStore::default();
        let id = store.add_marker_at_playhead();
        store.update_marker(&id, |m| m.time = -4.0).unwrap();
        assert_eq!(store.marker(&id).unwrap().time, 0.0);
        store.select_marker(Some(&id)).unwrap();
        store.remove_marker(&id).unwrap();
        assert!(store.selection().marker.is_none());
    }
}
