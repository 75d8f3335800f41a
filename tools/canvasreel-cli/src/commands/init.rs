//! Create a new CanvasReel project.

use std::path::PathBuf;

use canvasreel_project_model::LoadedProject;

pub fn run(
    name: String,
    output: PathBuf,
    width: u32,
    height: u32,
    duration: f64,
) -> anyhow::Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!("Canvas size must be non-zero");
    }
    if !(duration.is_finite() && duration > 0.0) {
        anyhow::bail!("Duration must be positive");
    }

    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let project = LoadedProject::create(&project_dir, &name, width, height, duration)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created:");
    println!("  Directory: {}", project.root.display());
    println!("  Canvas: {width}x{height}");
    println!("  Duration: {duration}s");
    println!("  Tracks: {}", project.project.tracks.len());
    println!();
    println!("  {name}/");
    println!("  ├── sources/     (media referenced by assets)");
    println!("  ├── meta/        (project.json)");
    println!("  └── exports/     (frame archives)");

    Ok(())
}
