//! Report configuration and font availability.

use canvasreel_common::AppConfig;
use canvasreel_render_engine::{ExportPipeline, ExportSettings, FontBook, MemoryRecorder};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("CanvasReel Check");
    println!("{}", "=".repeat(50));

    let path = AppConfig::path();
    if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        match AppConfig::from_json(&content) {
            Ok(_) => println!("[OK] Config: {}", path.display()),
            Err(e) => println!("[WARN] Config: {} ignored: {e}", path.display()),
        }
    } else {
        println!("[INFO] Config: {} (not found, using defaults)", path.display());
    }

    println!(
        "     Canvas {}x{} @ {} Hz, drift tolerance {}s",
        config.playback.canvas_width,
        config.playback.canvas_height,
        config.playback.refresh_hz,
        config.playback.drift_tolerance_secs
    );
    println!(
        "     Export {} fps, capture {} fps, pacing {:?}",
        config.export.fps, config.export.capture_fps, config.export.pacing
    );

    let pipeline = ExportPipeline::new(ExportSettings::from_config(config), MemoryRecorder::new());
    match pipeline.negotiate_codec() {
        Ok(codec) => println!("[OK] Capture codec: {codec}"),
        Err(e) => println!("[WARN] {e}"),
    }

    println!();
    let fonts = FontBook::load(&config.fonts);
    if fonts.is_empty() {
        println!("[WARN] No fonts loaded; text clips will not render.");
        println!("       Add entries under \"fonts.faces\" in {}", path.display());
    } else {
        println!("[OK] Fonts loaded: {}", fonts.len());
        for family in fonts.families() {
            println!("     {family}");
        }
    }
    if let Some(fallback) = &config.fonts.fallback_family {
        if fonts.resolve(fallback, false, false).is_some() {
            println!("[OK] Fallback family: {fallback}");
        } else {
            println!("[WARN] Fallback family '{fallback}' has no loaded face");
        }
    }

    Ok(())
}
