//! Frame compositor: decides what is drawn, where, and in which order.
//!
//! This stage is pure. It turns a timeline snapshot at one instant into a
//! [`FrameComposition`]; the rasterizer turns that into pixels.

use canvasreel_processing_core::{
    entry_effect, ResolvedFilters, ResolvedText, ResolvedTransform, WipeRect,
};
use canvasreel_project_model::{AssetId, ClipId, ClipKind, TimelineSnapshot, TrackId};
use serde::Serialize;

/// What a layer draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerContent {
    /// A video or image frame, fit to the canvas and filtered.
    Media {
        asset_id: AssetId,
        filters: ResolvedFilters,
    },
    Text(ResolvedText),
}

/// One clip's drawing instructions for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerDesc {
    pub clip_id: ClipId,
    pub track_id: TrackId,

    /// Seconds since the clip started.
    pub relative_time: f64,

    /// Keyframed transform. `opacity` already includes any fade.
    pub transform: ResolvedTransform,

    /// Slide transition offset in canvas pixels.
    pub offset_x: f64,
    pub offset_y: f64,

    /// Wipe transition clip region in layer-local coordinates.
    pub wipe: Option<WipeRect>,

    pub content: LayerContent,
}

impl LayerDesc {
    /// Canvas point the layer's local origin maps to.
    pub fn center(&self, width: u32, height: u32) -> (f64, f64) {
        (
            width as f64 / 2.0 + self.transform.position_x + self.offset_x,
            height as f64 / 2.0 + self.transform.position_y + self.offset_y,
        )
    }
}

/// A single frame's composition instructions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameComposition {
    /// Timeline time in seconds.
    pub time: f64,
    pub width: u32,
    pub height: u32,
    /// Draw order: first entry is the bottom layer.
    pub layers: Vec<LayerDesc>,
}

/// Compose the visible clips of `snapshot` at `time`.
///
/// Tracks are drawn from the highest index (bottom) to index 0 (top);
/// within a track, later clips draw over earlier ones. Hidden tracks,
/// invisible clips, audio clips, fully transparent clips and clips whose
/// asset is missing are left out.
pub fn compose(snapshot: &TimelineSnapshot, time: f64, width: u32, height: u32) -> FrameComposition {
    let mut layers = Vec::new();

    for track in snapshot.tracks.iter().rev() {
        if track.is_hidden {
            continue;
        }
        for clip in track.clips.iter() {
            if !clip.visible || !clip.kind.is_visual() || !clip.covers(time) {
                continue;
            }

            let relative_time = time - clip.start_time;
            let mut transform = ResolvedTransform::at(clip, relative_time);
            if transform.opacity <= 0.0 {
                continue;
            }

            let content = match clip.kind {
                ClipKind::Text => match ResolvedText::at(clip, relative_time) {
                    Some(text) => LayerContent::Text(text),
                    None => {
                        tracing::debug!(clip = %clip.id, "Text clip without text; skipping");
                        continue;
                    }
                },
                _ => {
                    let Some(asset_id) = clip
                        .asset_id
                        .as_ref()
                        .filter(|id| snapshot.asset(id).is_some())
                    else {
                        tracing::debug!(clip = %clip.id, "Clip references a missing asset; skipping");
                        continue;
                    };
                    LayerContent::Media {
                        asset_id: asset_id.clone(),
                        filters: ResolvedFilters::at(clip, relative_time),
                    }
                }
            };

            let effect = entry_effect(
                clip.transition.as_ref(),
                relative_time,
                width as f64,
                height as f64,
            );
            transform.opacity *= effect.opacity;

            layers.push(LayerDesc {
                clip_id: clip.id.clone(),
                track_id: track.id.clone(),
                relative_time,
                transform,
                offset_x: effect.offset_x,
                offset_y: effect.offset_y,
                wipe: effect.wipe,
                content,
            });
        }
    }

    FrameComposition {
        time,
        width,
        height,
        layers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvasreel_project_model::{
        AnimatableProperty, Asset, AssetKind, Clip, Keyframe, TimelineStore, Transition,
        TransitionKind,
    };

    fn store() -> (TimelineStore, ClipId, ClipId, ClipId) {
        let mut store = TimelineStore::default();
        store
            .add_asset(Asset::new("bg", "bg", AssetKind::Video, "bg", 30.0))
            .unwrap();
        store
            .add_asset(Asset::new("logo", "logo", AssetKind::Image, "logo.png", 5.0))
            .unwrap();
        let bg = store.asset(&AssetId::new("bg")).unwrap().clone();
        let logo = store.asset(&AssetId::new("logo")).unwrap().clone();

        let bg_id = store
            .add_clip(Clip::from_asset(&bg, "track-2", 0.0, 10.0))
            .unwrap();
        let logo_id = store
            .add_clip(Clip::from_asset(&logo, "track-1", 1.0, 4.0))
            .unwrap();
        let title_id = store.add_text_clip("Hello", 0.0).unwrap();
        (store, bg_id, logo_id, title_id)
    }

    #[test]
    fn test_layer_order_bottom_to_top() {
        let (store, bg, logo, title) = store();
        let frame = compose(&store.snapshot(), 2.0, 1280, 720);
        let order: Vec<&ClipId> = frame.layers.iter().map(|l| &l.clip_id).collect();
        assert_eq!(order, vec![&bg, &logo, &title]);
    }

    #[test]
    fn test_hidden_invisible_and_transparent_clips_skipped() {
        let (mut store, bg, logo, title) = store();
        store.update_clip(&logo, |c| c.visible = false).unwrap();
        store
            .update_clip(&title, |c| c.transform.opacity = Some(0.0))
            .unwrap();
        let frame = compose(&store.snapshot(), 2.0, 1280, 720);
        assert_eq!(frame.layers.len(), 1);
        assert_eq!(frame.layers[0].clip_id, bg);

        // Clip end is exclusive.
        let frame = compose(&store.snapshot(), 10.0, 1280, 720);
        assert!(frame.layers.is_empty());
    }

    #[test]
    fn test_missing_asset_renders_nothing() {
        let (mut store, _, logo, _) = store();
        let snapshot_before = store.snapshot();
        store.remove_asset(&AssetId::new("logo")).unwrap();
        assert!(store.clip(&logo).is_none());

        // A snapshot whose clip still points at a vanished asset.
        let mut snapshot = snapshot_before;
        snapshot.assets = store.snapshot().assets;
        let frame = compose(&snapshot, 2.0, 1280, 720);
        assert!(frame.layers.iter().all(|l| l.clip_id != logo));
        assert_eq!(frame.layers.len(), 2);
    }

    #[test]
    fn test_fade_and_slide_transitions() {
        let (mut store, bg, logo, _) = store();
        store
            .update_clip(&bg, |c| {
                c.transition = Some(Transition {
                    kind: TransitionKind::Fade,
                    duration: 2.0,
                });
                c.transform.opacity = Some(0.8);
            })
            .unwrap();
        store
            .update_clip(&logo, |c| {
                c.transition = Some(Transition {
                    kind: TransitionKind::SlideUp,
                    duration: 1.0,
                })
            })
            .unwrap();

        let frame = compose(&store.snapshot(), 1.0, 1280, 720);
        let bg_layer = &frame.layers[0];
        assert!((bg_layer.transform.opacity - 0.4).abs() < 1e-9);

        let logo_layer = &frame.layers[1];
        assert_eq!(logo_layer.offset_y, 720.0);
        assert_eq!(logo_layer.center(1280, 720), (640.0, 1080.0));
    }

    #[test]
    fn test_keyframed_filters_resolved_per_frame() {
        let (mut store, bg, _, _) = store();
        store
            .update_clip(&bg, |c| {
                c.keyframes.insert(
                    AnimatableProperty::Grayscale,
                    vec![Keyframe::new(0.0, 0.0), Keyframe::new(4.0, 1.0)],
                );
            })
            .unwrap();
        let frame = compose(&store.snapshot(), 1.0, 1280, 720);
        match &frame.layers[0].content {
            LayerContent::Media { filters, .. } => assert!((filters.grayscale - 0.25).abs() < 1e-9),
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn test_composition_json_tags_layer_content() {
        let (store, _, _, _) = store();
        let frame = compose(&store.snapshot(), 2.0, 1280, 720);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["layers"][0]["content"]["type"], "media");
        assert_eq!(json["layers"][0]["content"]["asset_id"], "bg");
        assert_eq!(json["layers"][2]["content"]["type"], "text");
        assert_eq!(json["layers"][2]["content"]["content"], "Hello");
    }

    proptest::proptest! {
        #[test]
        fn prop_layers_cover_time_and_skip_hidden(time in 0.0f64..20.0, hide in proptest::bool::ANY) {
            let (mut store, _, _, _) = store();
            if hide {
                store
                    .update_track(
                        &TrackId::new("track-2"),
                        canvasreel_project_model::TrackPatch {
                            is_hidden: Some(true),
                            ..Default::default()
                        },
                    )
                    .unwrap();
            }
            let snapshot = store.snapshot();
            let frame = compose(&snapshot, time, 1280, 720);
            for layer in &frame.layers {
                let clip = snapshot.clip(&layer.clip_id).unwrap();
                proptest::prop_assert!(clip.covers(time));
                proptest::prop_assert!(!(hide && layer.track_id == TrackId::new("track-2")));
                proptest::prop_assert!(layer.transform.opacity > 0.0);
            }
        }
    }
}
