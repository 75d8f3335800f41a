//! Media resource pool.
//!
//! One source per asset, created on first reference and released when the
//! asset leaves the timeline.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use canvasreel_common::TimeSource;
use canvasreel_project_model::{Asset, AssetId, AssetKind};
use image::RgbaImage;

use crate::error::MediaError;
use crate::media::{is_image_file, ClockedSource, FrameProvider, ImageSequence, MediaSource};

/// Creates media sources for assets.
pub trait MediaFactory: Send {
    fn create(&mut self, asset: &Asset) -> Result<Box<dyn MediaSource>, MediaError>;
}

/// Factory for sources on the local filesystem.
///
/// - images: the decoded still
/// - video: a directory of frames, or a single image used as a poster
/// - audio: a silent clock (no decoding)
pub struct FileMediaFactory {
    root: PathBuf,
    clock: Arc<dyn TimeSource>,
}

impl FileMediaFactory {
    /// Relative asset sources resolve against `root`.
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    fn resolve(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl MediaFactory for FileMediaFactory {
    fn create(&mut self, asset: &Asset) -> Result<Box<dyn MediaSource>, MediaError> {
        let clock = Arc::clone(&self.clock);
        let path = self.resolve(&asset.source);

        let source = match asset.kind {
            AssetKind::Image => ClockedSource::untimed(clock, FrameProvider::still(&path)?),
            AssetKind::Audio => ClockedSource::new(clock, FrameProvider::None, asset.duration),
            AssetKind::Video if path.is_dir() => ClockedSource::new(
                clock,
                FrameProvider::Sequence(ImageSequence::open(&path, asset.duration)?),
                asset.duration,
            ),
            AssetKind::Video if is_image_file(&path) => {
                ClockedSource::new(clock, FrameProvider::still(&path)?, asset.duration)
            }
            AssetKind::Video => {
                return Err(MediaError::unsupported(
                    asset.source.clone(),
                    "video must be a frame directory or an image file",
                ))
            }
        };

        tracing::debug!(asset = %asset.id, kind = ?asset.kind, path = %path.display(), "Created media source");
        Ok(Box::new(source))
    }
}

/// Live media sources keyed by asset id.
pub struct MediaPool {
    factory: Box<dyn MediaFactory>,
    sources: HashMap<AssetId, Box<dyn MediaSource>>,
    failed: HashSet<AssetId>,
}

impl MediaPool {
    pub fn new(factory: Box<dyn MediaFactory>) -> Self {
        Self {
            factory,
            sources: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.sources.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &AssetId> {
        self.sources.keys()
    }

    pub fn get(&self, id: &AssetId) -> Option<&dyn MediaSource> {
        self.sources.get(id).map(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: &AssetId) -> Option<&mut (dyn MediaSource + 'static)> {
        self.sources.get_mut(id).map(|s| s.as_mut())
    }

    /// Current frame of a drawable, ready source.
    pub fn frame(&self, id: &AssetId) -> Option<Arc<RgbaImage>> {
        let source = self.sources.get(id)?;
        if !source.is_ready() {
            return None;
        }
        source.frame()
    }

    /// Make sure `asset` has a source. A failed creation is logged once and
    /// not retried until the asset is removed.
    pub fn ensure(&mut self, asset: &Asset) -> bool {
        if self.sources.contains_key(&asset.id) {
            return true;
        }
        if self.failed.contains(&asset.id) {
            return false;
        }
        match self.factory.create(asset) {
            Ok(source) => {
                self.sources.insert(asset.id.clone(), source);
                true
            }
            Err(e) => {
                tracing::warn!(asset = %asset.id, error = %e, "Media source unavailable");
                self.failed.insert(asset.id.clone());
                false
            }
        }
    }

    /// Reconcile the pool with the current asset list: create sources for
    /// new assets and release those whose asset is gone.
    pub fn sync_assets(&mut self, assets: &[Asset]) {
        let live: HashSet<&AssetId> = assets.iter().map(|a| &a.id).collect();

        let stale: Vec<AssetId> = self
            .sources
            .keys()
            .filter(|id| !live.contains(id))
            .cloned()
            .collect();
        for id in stale {
            self.release(&id);
        }
        self.failed.retain(|id| live.contains(id));

        for asset in assets {
            self.ensure(asset);
        }
    }

    /// Pause and drop the source for `id`.
    pub fn release(&mut self, id: &AssetId) -> bool {
        self.failed.remove(id);
        match self.sources.remove(id) {
            Some(mut source) => {
                source.pause();
                tracing::debug!(asset = %id, "Released media source");
                true
            }
            None => false,
        }
    }

    /// Pause every source.
    pub fn pause_all(&mut self) {
        for source in self.sources.values_mut() {
            if !source.is_paused() {
                source.pause();
            }
        }
    }
}
