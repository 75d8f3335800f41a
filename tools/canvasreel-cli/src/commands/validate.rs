//! Validate a CanvasReel project.

use std::path::PathBuf;

use canvasreel_common::AppConfig;
use canvasreel_project_model::LoadedProject;

pub fn run(path: PathBuf, config: &AppConfig) -> anyhow::Result<()> {
    println!("Validating project at: {}", path.display());

    let project =
        LoadedProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    println!("  Name: {}", project.project.name);
    println!("  Version: {}", project.project.version);
    println!(
        "  Canvas: {}x{}",
        project.project.canvas.width, project.project.canvas.height
    );
    println!("  Assets: {}", project.project.assets.len());
    println!("  Tracks: {}", project.project.tracks.len());
    println!(
        "  Clips: {}",
        project
            .project
            .tracks
            .iter()
            .map(|t| t.clips.len())
            .sum::<usize>()
    );

    let mut errors = project.validate();
    if let Err(e) = project
        .project
        .to_store(canvasreel_project_model::StoreSettings::from(&config.timeline))
    {
        errors.push(format!("Timeline rejected: {e}"));
    }

    if errors.is_empty() {
        println!("\nProject is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!(
            "\n{} issue(s) found. Project may not render as expected.",
            errors.len()
        );
    }

    Ok(())
}
