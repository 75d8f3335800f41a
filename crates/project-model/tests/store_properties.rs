//! Property tests for structural store operations.

use canvasreel_project_model::*;
use proptest::prelude::*;

fn store_with_clip(start: f64, duration: f64, offset: f64) -> (TimelineStore, ClipId) {
    let mut store = TimelineStore::default();
    store
        .add_asset(Asset::new(
            "src",
            "source.mp4",
            AssetKind::Video,
            "source.mp4",
            offset + duration + 1.0,
        ))
        .unwrap();
    let asset = store.asset(&AssetId::new("src")).unwrap().clone();
    let mut clip = Clip::from_asset(&asset, "track-1", start, duration);
    clip.start_offset = offset;
    let id = store.add_clip(clip).unwrap();
    (store, id)
}

proptest! {
    #[test]
    fn split_halves_tile_the_original(
        start in 0.0f64..50.0,
        duration in 0.5f64..30.0,
        offset in 0.0f64..10.0,
        cut_ratio in 0.0f64..1.0,
    ) {
        let (mut store, id) = store_with_clip(start, duration, offset);
        let at = start + duration * cut_ratio;
        store.select_clip(&id, false).unwrap();
        store.set_current_time(at);

        let created = store.split_selected();
        let left = store.clip(&id).unwrap().clone();

        if at <= start + 0.1 || at >= start + duration - 0.1 {
            prop_assert!(created.is_empty());
            prop_assert_eq!(left.duration, duration);
        } else {
            prop_assert_eq!(created.len(), 1);
            let right = store.clip(&created[0]).unwrap();
            prop_assert!((left.duration + right.duration - duration).abs() < 1e-9);
            prop_assert!((left.end_time() - right.start_time).abs() < 1e-9);
            prop_assert!((right.start_offset - (offset + left.duration)).abs() < 1e-9);
        }
    }

    #[test]
    fn keyframed_split_keeps_boundary_value(
        v0 in -100.0f64..100.0,
        v1 in -100.0f64..100.0,
        cut_ratio in 0.1f64..0.9,
    ) {
        let (mut store, id) = store_with_clip(0.0, 10.0, 0.0);
        store.set_keyframe(&id, AnimatableProperty::PositionX, 0.0, v0).unwrap();
        store.set_keyframe(&id, AnimatableProperty::PositionX, 10.0, v1).unwrap();
        let before = store.clip(&id).unwrap().keyframes[&AnimatableProperty::PositionX].clone();

        let at = 10.0 * cut_ratio;
        store.select_clip(&id, false).unwrap();
        store.set_current_time(at);
        let created = store.split_selected();
        prop_assert_eq!(created.len(), 1);

        let expected = sample_keyframes(&before, at).unwrap();
        let right = store.clip(&created[0]).unwrap();
        let right_seq = &right.keyframes[&AnimatableProperty::PositionX];
        prop_assert!((sample_keyframes(right_seq, 0.0).unwrap() - expected).abs() < 1e-9);
        let far = sample_keyframes(right_seq, 10.0 - at).unwrap();
        prop_assert!((far - v1).abs() < 1e-9);
    }
}

#[test]
fn track_change_never_duplicates_or_loses_a_clip() {
    let (mut store, id) = store_with_clip(1.0, 2.0, 0.0);
    for target in ["track-2", "track-1", "track-2"] {
        store
            .update_clip(&id, |c| c.track_id = TrackId::new(target))
            .unwrap();
        let occurrences: usize = store
            .tracks()
            .iter()
            .map(|t| t.clips.iter().filter(|c| c.id == id).count())
            .sum();
        assert_eq!(occurrences, 1);
        assert_eq!(store.clip(&id).unwrap().track_id.as_str(), target);
    }
}

#[test]
fn remove_selected_clears_selection() {
    let (mut store, id) = store_with_clip(0.0, 3.0, 0.0);
    store.select_clip(&id, false).unwrap();
    let copies = store.duplicate_selected();
    store.select_clips([id.clone(), copies[0].clone()]);
    assert_eq!(store.remove_selected_clips(), 2);
    assert!(store.selection().clips.is_empty());
    assert!(store.clips_at(1.0).is_empty());
}
