//! Scheduler + synchronizer behavior driven by a manual clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use canvasreel_common::{ManualClock, MonotonicClock, PlaybackDefaults, TimeSource};
use canvasreel_playback_engine::*;
use canvasreel_project_model::{
    Asset, AssetId, AssetKind, Clip, TimelineSnapshot, TimelineStore, TrackId, TrackPatch,
};
use image::{Rgba, RgbaImage};

/// Silent sources for every asset; assets named `broken*` refuse to play.
struct TestFactory {
    clock: Arc<dyn TimeSource>,
}

impl MediaFactory for TestFactory {
    fn create(&mut self, asset: &Asset) -> Result<Box<dyn MediaSource>, MediaError> {
        let provider = if asset.name.starts_with("broken") {
            FrameProvider::Memory {
                frames: Vec::new(),
                fps: 30.0,
            }
        } else {
            let frame = Arc::new(RgbaImage::from_pixel(4, 4, Rgba([200, 0, 0, 255])));
            FrameProvider::Memory {
                frames: vec![frame],
                fps: 30.0,
            }
        };
        Ok(Box::new(ClockedSource::new(
            Arc::clone(&self.clock),
            provider,
            asset.duration,
        )))
    }
}

#[derive(Default)]
struct RecordingPresenter {
    times: Vec<f64>,
    drawable: Vec<usize>,
}

impl FramePresenter for RecordingPresenter {
    fn present(&mut self, snapshot: &TimelineSnapshot, time: f64, pool: &MediaPool) {
        self.times.push(time);
        self.drawable.push(
            snapshot
                .assets
                .iter()
                .filter(|a| pool.frame(&a.id).is_some())
                .count(),
        );
    }
}

fn video_id() -> AssetId {
    AssetId::new("video")
}

fn player(clock: &ManualClock) -> Player<RecordingPresenter> {
    let mut store = TimelineStore::default();
    store
        .add_asset(Asset::new("video", "video", AssetKind::Video, "v", 60.0))
        .unwrap();
    let asset = store.asset(&video_id()).unwrap().clone();
    let mut clip = Clip::from_asset(&asset, "track-1", 1.0, 10.0);
    clip.start_offset = 5.0;
    store.add_clip(clip).unwrap();

    let pool = MediaPool::new(Box::new(TestFactory {
        clock: Arc::new(clock.clone()),
    }));
    Player::new(
        store,
        pool,
        RecordingPresenter::default(),
        &PlaybackDefaults::default(),
    )
}

fn source_time(player: &Player<RecordingPresenter>) -> f64 {
    player.pool().get(&video_id()).unwrap().current_time()
}

#[test]
fn play_starts_source_at_mapped_time() {
    let clock = ManualClock::new(0.0);
    let mut player = player(&clock);
    player.seek(2.0);
    player.play();

    let report = player.tick(clock.now_secs());
    assert_eq!(report.sync.plays, 1);
    assert_eq!(report.sync.seeks, 1);
    let source = player.pool().get(&video_id()).unwrap();
    assert!(!source.is_paused());
    assert!((source.current_time() - 6.0).abs() < 1e-9);

    // Both clocks advance together: no corrective seek.
    clock.advance(0.5);
    let report = player.tick(clock.now_secs());
    assert!((report.time - 2.5).abs() < 1e-9);
    assert_eq!(report.sync.seeks, 0);
    assert!((source_time(&player) - 6.5).abs() < 1e-9);
}

#[test]
fn drift_beyond_tolerance_is_corrected() {
    let clock = ManualClock::new(0.0);
    let mut player = player(&clock);
    player.seek(2.0);
    player.play();
    player.tick(clock.now_secs());

    // Small drift is tolerated.
    player.pool_mut().get_mut(&video_id()).unwrap().seek(6.2).unwrap();
    let report = player.tick(clock.now_secs());
    assert_eq!(report.sync.seeks, 0);

    // Large drift snaps back.
    player.pool_mut().get_mut(&video_id()).unwrap().seek(7.0).unwrap();
    let report = player.tick(clock.now_secs());
    assert_eq!(report.sync.seeks, 1);
    assert!((source_time(&player) - 6.0).abs() < 1e-9);
}

#[test]
fn pause_then_scrub_hard_syncs_without_playing() {
    let clock = ManualClock::new(0.0);
    let mut player = player(&clock);
    player.seek(2.0);
    player.play();
    player.tick(clock.now_secs());

    player.pause();
    clock.advance(1.0);
    let report = player.tick(clock.now_secs());
    assert_eq!(report.sync.pauses, 1);
    assert!(player.pool().get(&video_id()).unwrap().is_paused());

    player.store_mut().set_current_time(4.0);
    player.tick(clock.now_secs());
    let source = player.pool().get(&video_id()).unwrap();
    assert!(source.is_paused());
    assert!((source.current_time() - 8.0).abs() < 1e-9);
}

#[test]
fn uncovered_source_pauses_at_zero_volume() {
    let clock = ManualClock::new(0.0);
    let mut player = player(&clock);
    player.seek(2.0);
    player.play();
    player.tick(clock.now_secs());

    clock.advance(10.0);
    let report = player.tick(clock.now_secs());
    assert!((report.time - 12.0).abs() < 1e-9);
    let source = player.pool().get(&video_id()).unwrap();
    assert!(source.is_paused());
    assert_eq!(source.volume(), 0.0);
}

#[test]
fn muted_and_hidden_tracks() {
    let clock = ManualClock::new(0.0);
    let mut player = player(&clock);
    player
        .store_mut()
        .update_track(
            &TrackId::new("track-1"),
            TrackPatch {
                is_muted: Some(true),
                ..TrackPatch::default()
            },
        )
        .unwrap();
    player.seek(3.0);
    player.play();
    player.tick(clock.now_secs());
    let source = player.pool().get(&video_id()).unwrap();
    assert!(!source.is_paused());
    assert_eq!(source.volume(), 0.0);

    player
        .store_mut()
        .update_track(
            &TrackId::new("track-1"),
            TrackPatch {
                is_hidden: Some(true),
                ..TrackPatch::default()
            },
        )
        .unwrap();
    player.tick(clock.now_secs());
    assert!(player.pool().get(&video_id()).unwrap().is_paused());
}

#[test]
fn hidden_clip_keeps_time_but_is_silent() {
    let clock = ManualClock::new(0.0);
    let mut player = player(&clock);
    let clip_id = player
        .store()
        .snapshot()
        .tracks
        .iter()
        .flat_map(|t| t.clips.iter())
        .find(|c| c.asset_id.as_ref() == Some(&video_id()))
        .map(|c| c.id.clone())
        .unwrap();
    player
        .store_mut()
        .update_clip(&clip_id, |c| c.visible = false)
        .unwrap();

    let states = desired_states(&player.store().snapshot(), 3.0, true);
    let state = &states[&video_id()];
    assert!(state.playing);
    assert_eq!(state.volume, 0.0);
    assert!((state.time - 7.0).abs() < 1e-9);

    player.seek(3.0);
    player.play();
    player.tick(clock.now_secs());
    let source = player.pool().get(&video_id()).unwrap();
    assert!(!source.is_paused());
    assert_eq!(source.volume(), 0.0);
}

#[test]
fn rejected_play_leaves_source_paused() {
    let clock = ManualClock::new(0.0);
    let mut player = player(&clock);
    let broken = Asset::new("b", "broken-cam", AssetKind::Video, "b", 10.0);
    player.store_mut().add_asset(broken.clone()).unwrap();
    player
        .store_mut()
        .add_clip(Clip::from_asset(&broken, "track-2", 0.0, 5.0))
        .unwrap();

    player.play();
    let report = player.tick(clock.now_secs());
    assert_eq!(report.sync.rejected, 1);
    assert!(player.pool().get(&broken.id).unwrap().is_paused());
    assert!(report.playing);
}

#[test]
fn removing_an_asset_releases_its_source() {
    let clock = ManualClock::new(0.0);
    let mut player = player(&clock);
    player.tick(clock.now_secs());
    assert!(player.pool().contains(&video_id()));

    let removed = player.remove_asset(&video_id()).unwrap();
    assert_eq!(removed.len(), 1);
    assert!(!player.pool().contains(&video_id()));
    player.tick(clock.now_secs());
    assert!(player.pool().is_empty());
}

#[test]
fn presenter_sees_every_tick() {
    let clock = ManualClock::new(0.0);
    let mut player = player(&clock);
    player.seek(1.5);
    player.play();
    for _ in 0..3 {
        player.tick(clock.now_secs());
        clock.advance(0.1);
    }
    let presenter = player.presenter();
    assert_eq!(presenter.times.len(), 3);
    assert!((presenter.times[2] - 1.7).abs() < 1e-9);
    assert!(presenter.drawable.iter().all(|&n| n == 1));
}

#[tokio::test]
async fn run_loop_ticks_until_stopped() {
    let clock: Arc<dyn TimeSource> = Arc::new(MonotonicClock::start());
    let mut player = player(&ManualClock::new(0.0));
    let stop = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        flag.store(true, Ordering::SeqCst);
    });

    player.play();
    let ticks = player.run(clock, 60, stop).await;
    assert!(ticks >= 1);
    assert_eq!(player.presenter().times.len() as u64, ticks);
    assert!(player.store().current_time() > 0.0);
}

proptest::proptest! {
    #[test]
    fn paused_scrub_lands_source_on_mapped_time(times in proptest::collection::vec(1.0f64..10.9, 1..8)) {
        let clock = ManualClock::new(0.0);
        let mut player = player(&clock);
        for t in times {
            player.store_mut().set_current_time(t);
            clock.advance(0.1);
            player.tick(clock.now_secs());
            let source = player.pool().get(&video_id()).unwrap();
            proptest::prop_assert!(source.is_paused());
            proptest::prop_assert!((source.current_time() - (4.0 + t)).abs() < 1e-9);
        }
    }
}
