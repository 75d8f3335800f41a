pub mod check;
pub mod export;
pub mod info;
pub mod init;
pub mod validate;

use canvasreel_common::AppConfig;
use canvasreel_project_model::{LoadedProject, StoreSettings, TimelineStore};

/// Load a project directory and build its timeline store.
pub(crate) fn open(
    path: &std::path::Path,
    config: &AppConfig,
) -> anyhow::Result<(LoadedProject, TimelineStore)> {
    let project =
        LoadedProject::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;
    let store = project
        .project
        .to_store(StoreSettings::from(&config.timeline))
        .map_err(|e| anyhow::anyhow!("Invalid timeline: {e}"))?;
    Ok((project, store))
}
