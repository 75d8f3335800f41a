//! Playback scheduler.
//!
//! [`PlaybackEngine`] owns the logical clock. It never reads media clocks;
//! media follow it. [`Player`] strings one tick together:
//! advance the clock, reconcile sources, present a frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use canvasreel_common::{FrameTicker, PlaybackDefaults, TimeSource};
use canvasreel_project_model::{AssetId, ClipId, ModelError, TimelineSnapshot, TimelineStore};
use tokio::time::MissedTickBehavior;

use crate::pool::MediaPool;
use crate::sync::{desired_states, reconcile, SyncReport};

/// Consumer of composed frames (compositor + rasterizer, a capture surface).
///
/// Presenting cannot fail: layers whose media or font is unavailable are
/// skipped for that frame.
pub trait FramePresenter: Send {
    fn present(&mut self, snapshot: &TimelineSnapshot, time: f64, pool: &MediaPool);
}

/// The logical playback clock.
#[derive(Debug, Clone)]
pub struct PlaybackEngine {
    time: f64,
    /// Last playhead value written to the store.
    published: Option<f64>,
    last_tick: Option<f64>,
    was_playing: bool,
    tolerance_secs: f64,
    stop_at_end: bool,
}

impl PlaybackEngine {
    pub fn new(config: &PlaybackDefaults) -> Self {
        Self {
            time: 0.0,
            published: None,
            last_tick: None,
            was_playing: false,
            tolerance_secs: config.drift_tolerance_secs,
            stop_at_end: true,
        }
    }

    /// Keep playing past the project duration.
    pub fn without_stop_at_end(mut self) -> Self {
        self.stop_at_end = false;
        self
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn tolerance_secs(&self) -> f64 {
        self.tolerance_secs
    }

    /// Jump the clock (and the store's playhead) to `time` and drop the
    /// delta baseline.
    pub fn reset(&mut self, store: &mut TimelineStore, time: f64) {
        store.set_current_time(time);
        self.time = store.current_time();
        self.published = Some(self.time);
        self.last_tick = None;
    }

    /// Advance by the time elapsed since the previous call.
    ///
    /// The first call after a play/pause toggle has a zero delta, so a long
    /// pause never turns into a jump. A playhead moved by someone else
    /// (scrub, skip) since the last publish is adopted before advancing.
    pub fn advance(&mut self, store: &mut TimelineStore, now: f64) -> f64 {
        let playing = store.is_playing();
        if playing != self.was_playing {
            self.last_tick = None;
            self.was_playing = playing;
        }

        let delta = match self.last_tick {
            Some(last) if now.is_finite() => (now - last).max(0.0),
            _ => 0.0,
        };
        if now.is_finite() {
            self.last_tick = Some(now);
        }

        if self.published != Some(store.current_time()) {
            self.time = store.current_time();
        }

        if playing {
            self.time += delta;
            let end = store.duration();
            if self.stop_at_end && self.time >= end {
                self.time = end;
                store.set_playing(false);
                tracing::debug!(at = end, "Reached end of timeline; stopping");
            }
            store.set_current_time(self.time);
        }

        self.published = Some(store.current_time());
        self.time
    }
}

/// Summary of one [`Player::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub time: f64,
    pub playing: bool,
    pub sync: SyncReport,
    /// Ticks since the player was created, including this one.
    pub frame: u64,
}

/// Owns the timeline and everything needed to play it.
pub struct Player<P> {
    store: TimelineStore,
    pool: MediaPool,
    engine: PlaybackEngine,
    presenter: P,
    frames: u64,
}

impl<P: FramePresenter> Player<P> {
    pub fn new(
        store: TimelineStore,
        pool: MediaPool,
        presenter: P,
        config: &PlaybackDefaults,
    ) -> Self {
        Self::with_engine(store, pool, presenter, PlaybackEngine::new(config))
    }

    pub fn with_engine(
        mut store: TimelineStore,
        pool: MediaPool,
        presenter: P,
        mut engine: PlaybackEngine,
    ) -> Self {
        let start = store.current_time();
        engine.reset(&mut store, start);
        Self {
            store,
            pool,
            engine,
            presenter,
            frames: 0,
        }
    }

    pub fn store(&self) -> &TimelineStore {
        &self.store
    }

    /// Mutations are picked up on the next tick.
    pub fn store_mut(&mut self) -> &mut TimelineStore {
        &mut self.store
    }

    pub fn pool(&self) -> &MediaPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut MediaPool {
        &mut self.pool
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn into_parts(self) -> (TimelineStore, MediaPool, P) {
        (self.store, self.pool, self.presenter)
    }

    pub fn play(&mut self) {
        self.store.set_playing(true);
    }

    /// Sources are paused on the next tick.
    pub fn pause(&mut self) {
        self.store.set_playing(false);
    }

    pub fn seek(&mut self, time: f64) {
        self.engine.reset(&mut self.store, time);
    }

    /// Remove an asset and release its source immediately.
    pub fn remove_asset(&mut self, id: &AssetId) -> Result<Vec<ClipId>, ModelError> {
        let removed = self.store.remove_asset(id)?;
        self.pool.release(id);
        Ok(removed)
    }

    /// Run one scheduler step at `now` (seconds on the driving clock).
    pub fn tick(&mut self, now: f64) -> TickReport {
        let time = self.engine.advance(&mut self.store, now);
        let snapshot = self.store.snapshot();

        self.pool.sync_assets(&snapshot.assets);
        let states = desired_states(&snapshot, time, snapshot.is_playing);
        let sync = reconcile(
            &mut self.pool,
            &states,
            snapshot.is_playing,
            self.engine.tolerance_secs(),
        );

        self.presenter.present(&snapshot, time, &self.pool);

        self.frames += 1;
        tracing::trace!(time, playing = snapshot.is_playing, ?sync, "Tick");
        TickReport {
            time,
            playing: snapshot.is_playing,
            sync,
            frame: self.frames,
        }
    }

    /// Drive [`Player::tick`] at `refresh_hz` until `stop` is raised.
    /// Returns the number of ticks run.
    pub async fn run(
        &mut self,
        clock: Arc<dyn TimeSource>,
        refresh_hz: u32,
        stop: Arc<AtomicBool>,
    ) -> u64 {
        let mut ticker = FrameTicker::new(refresh_hz);
        let mut interval = tokio::time::interval(Duration::from_secs_f64(ticker.interval_secs()));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(refresh_hz, "Playback loop started");
        let mut ticks = 0u64;
        while !stop.load(Ordering::SeqCst) {
            interval.tick().await;
            let now = clock.now_secs();
            if ticker.should_tick(now) {
                self.tick(now);
                ticks += 1;
            }
        }

        self.pool.pause_all();
        tracing::info!(ticks, "Playback loop stopped");
        ticks
    }
}
