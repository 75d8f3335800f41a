//! Project documents.
//!
//! A project directory holds `meta/project.json` (the timeline: assets,
//! tracks, clips, markers) plus the media it references under `sources/`.
//! Exports land in `exports/`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::error::ModelError;
use crate::marker::Marker;
use crate::store::{StoreSettings, TimelineStore};
use crate::track::Track;

/// Current project schema version.
pub const PROJECT_VERSION: &str = "1.0";

/// Top-level project file (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier (UUID).
    pub id: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Output canvas.
    pub canvas: CanvasConfig,

    /// Timeline length in seconds.
    pub duration_secs: f64,

    #[serde(default)]
    pub assets: Vec<Asset>,

    #[serde(default = "Track::default_set")]
    pub tracks: Vec<Track>,

    #[serde(default)]
    pub markers: Vec<Marker>,
}

/// Output canvas dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Project {
    /// Create a new project with the default track set.
    pub fn new(name: impl Into<String>, width: u32, height: u32, duration_secs: f64) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: PROJECT_VERSION.to_string(),
            name: name.into(),
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now.clone(),
            modified_at: now,
            canvas: CanvasConfig { width, height },
            duration_secs,
            assets: Vec::new(),
            tracks: Track::default_set(),
            markers: Vec::new(),
        }
    }

    /// Build a mutation store holding this project's timeline.
    pub fn to_store(&self, settings: StoreSettings) -> Result<TimelineStore, ModelError> {
        TimelineStore::from_parts(
            settings,
            self.assets.clone(),
            self.tracks.clone(),
            self.markers.clone(),
            self.duration_secs,
        )
    }

    /// Copy the store's timeline back into the document.
    pub fn update_from_store(&mut self, store: &TimelineStore) {
        self.assets = store.assets().to_vec();
        self.tracks = store.tracks().iter().map(|t| t.as_ref().clone()).collect();
        self.markers = store.markers().to_vec();
        self.duration_secs = store.duration();
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

/// A project together with the directory it lives in.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    /// Project document.
    pub project: Project,
}

impl LoadedProject {
    /// Load a project from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ModelError> {
        let root = root.as_ref().to_path_buf();
        let project_path = root.join("meta").join("project.json");

        let json = std::fs::read_to_string(&project_path).map_err(|e| ModelError::Io {
            path: project_path.clone(),
            source: e,
        })?;
        let project: Project = serde_json::from_str(&json).map_err(|e| ModelError::Parse {
            path: project_path,
            source: e,
        })?;

        tracing::debug!(root = %root.display(), name = %project.name, "Loaded project");
        Ok(Self { root, project })
    }

    /// Write the project document to `meta/project.json`.
    pub fn save(&self) -> Result<(), ModelError> {
        let meta_dir = self.root.join("meta");
        std::fs::create_dir_all(&meta_dir).map_err(|e| ModelError::Io {
            path: meta_dir.clone(),
            source: e,
        })?;

        let project_path = meta_dir.join("project.json");
        let json = serde_json::to_string_pretty(&self.project).map_err(|e| ModelError::Parse {
            path: project_path.clone(),
            source: e,
        })?;
        std::fs::write(&project_path, json).map_err(|e| ModelError::Io {
            path: project_path,
            source: e,
        })?;
        Ok(())
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(
        root: impl AsRef<Path>,
        name: impl Into<String>,
        width: u32,
        height: u32,
        duration_secs: f64,
    ) -> Result<Self, ModelError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["sources", "meta", "exports"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ModelError::Io {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let loaded = Self {
            root,
            project: Project::new(name, width, height, duration_secs),
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Resolve an asset source against the project root.
    pub fn resolve_source(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Check that every asset source exists and every clip satisfies the
    /// model invariants. Returns one message per problem.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];

        for asset in &self.project.assets {
            if !self.resolve_source(&asset.source).exists() {
                errors.push(format!("Asset {} source missing: {}", asset.id, asset.source));
            }
        }

        for track in &self.project.tracks {
            for clip in &track.clips {
                if clip.track_id != track.id {
                    errors.push(format!(
                        "Clip {} is stored on {} but names track {}",
                        clip.id, track.id, clip.track_id
                    ));
                }
                if !track.kind.accepts(clip.kind) {
                    errors.push(format!(
                        "Clip {} ({:?}) is on incompatible track {} ({:?})",
                        clip.id, clip.kind, track.id, track.kind
                    ));
                }
                let asset = clip
                    .asset_id
                    .as_ref()
                    .and_then(|id| self.project.assets.iter().find(|a| &a.id == id));
                if let (Some(id), None) = (&clip.asset_id, asset) {
                    errors.push(format!("Clip {} references unknown asset {id}", clip.id));
                }
                if let Err(e) = clip.validate(asset) {
                    errors.push(e.to_string());
                }
                for (property, seq) in &clip.keyframes {
                    if seq.windows(2).any(|w| w[1].time < w[0].time) {
                        errors.push(format!(
                            "Clip {} has unsorted {} keyframes",
                            clip.id,
                            property.name()
                        ));
                    }
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetKind;
    use crate::clip::Clip;

    #[test]
    fn test_project_creation() {
        let project = Project::new("Promo", 1920, 1080, 120.0);
        assert_eq!(project.name, "Promo");
        assert_eq!(project.canvas.width, 1920);
        assert_eq!(project.tracks.len(), 4);
        assert_eq!(project.version, PROJECT_VERSION);
    }

    #[test]
    fn test_missing_tracks_default_on_load() {
        let mut value = serde_json::to_value(Project::new("Legacy", 1280, 720, 300.0)).unwrap();
        value.as_object_mut().unwrap().remove("tracks");
        let parsed: Project = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.tracks.len(), 4);
    }

    #[test]
    fn test_loaded_project_create_and_load() {
        let dir = std::env::temp_dir().join("canvasreel_test_project");
        let _ = std::fs::remove_dir_all(&dir);

        let created = LoadedProject::create(&dir, "Integration Test", 1280, 720, 300.0).unwrap();
        assert_eq!(created.project.name, "Integration Test");
        assert!(dir.join("sources").is_dir());

        let loaded = LoadedProject::load(&dir).unwrap();
        assert_eq!(loaded.project.id, created.project.id);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_validate_reports_missing_sources_and_bad_clips() {
        let dir = std::env::temp_dir().join("canvasreel_test_validate");
        let _ = std::fs::remove_dir_all(&dir);

        let mut loaded = LoadedProject::create(&dir, "Validate", 1280, 720, 300.0).unwrap();
        let asset = Asset::new("a1", "talk.mp4", AssetKind::Video, "sources/talk.mp4", 4.0);
        let clip = Clip::from_asset(&asset, "track-3", 0.0, 6.0);
        loaded.project.assets.push(asset);
        loaded.project.tracks[3].clips.push(clip);

        let errors = loaded.validate();
        assert!(errors.iter().any(|e| e.contains("source missing")));
        assert!(errors.iter().any(|e| e.contains("incompatible track")));
        assert!(errors.iter().any(|e| e.contains("reads")));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_store_round_trip() {
        let mut project = Project::new("Round trip", 1280, 720, 60.0);
        let asset = Asset::new("a1", "clip.mp4", AssetKind::Video, "clip.mp4", 10.0);
        project.tracks[1]
            .clips
            .push(Clip::from_asset(&asset, "track-1", 1.0, 4.0));
        project.assets.push(asset);

        let mut store = project.to_store(StoreSettings::default()).unwrap();
        assert_eq!(store.duration(), 60.0);
        store.add_marker_at_playhead();

        project.update_from_store(&store);
        assert_eq!(project.markers.len(), 1);
        assert_eq!(project.tracks[1].clips.len(), 1);
    }
}
