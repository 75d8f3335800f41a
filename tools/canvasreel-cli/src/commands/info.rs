//! Show project information.

use std::path::PathBuf;

use canvasreel_common::{format_timecode, AppConfig};
use canvasreel_render_engine::compose;

pub fn run(path: PathBuf, at: Option<f64>, config: &AppConfig) -> anyhow::Result<()> {
    let (loaded, store) = super::open(&path, config)?;
    let project = &loaded.project;

    println!("Project: {}", project.name);
    println!("  ID: {}", project.id);
    println!("  Version: {}", project.version);
    println!("  Created: {}", project.created_at);
    println!("  Modified: {}", project.modified_at);
    println!("  Canvas: {}x{}", project.canvas.width, project.canvas.height);
    println!("  Duration: {}", format_timecode(store.duration()));
    println!("  Content end: {}", format_timecode(store.content_end()));

    println!("\nAssets ({}):", store.assets().len());
    for asset in store.assets() {
        println!(
            "  {} [{:?}] {} ({:.2}s) -> {}",
            asset.id, asset.kind, asset.name, asset.duration, asset.source
        );
    }

    println!("\nTracks ({}):", store.tracks().len());
    for (index, track) in store.tracks().iter().enumerate() {
        let mut flags = Vec::new();
        if track.is_muted {
            flags.push("muted");
        }
        if track.is_hidden {
            flags.push("hidden");
        }
        println!(
            "  #{index} {} \"{}\" [{:?}] {} clip(s) {}",
            track.id,
            track.name,
            track.kind,
            track.clips.len(),
            flags.join(" ")
        );
        for clip in &track.clips {
            println!(
                "      {} {:<8} {} - {}  {}{}",
                clip.id,
                format!("{:?}", clip.kind),
                format_timecode(clip.start_time),
                format_timecode(clip.end_time()),
                clip.name,
                clip.group_id
                    .as_ref()
                    .map(|g| format!("  (group {g})"))
                    .unwrap_or_default()
            );
        }
    }

    println!("\nMarkers ({}):", store.markers().len());
    for marker in store.markers() {
        println!(
            "  {} {} {}",
            format_timecode(marker.time),
            marker.label,
            marker.color
        );
    }

    if let Some(time) = at {
        let frame = compose(
            &store.snapshot(),
            time,
            project.canvas.width,
            project.canvas.height,
        );
        println!("\nComposition at {}:", format_timecode(time));
        println!("{}", serde_json::to_string_pretty(&frame)?);
    }

    Ok(())
}
