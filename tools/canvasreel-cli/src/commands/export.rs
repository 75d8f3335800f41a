//! Export a timeline range as a zip of frame images.

use std::path::PathBuf;
use std::sync::Arc;

use canvasreel_common::{AppConfig, ExportPacing, ManualClock, MonotonicClock, TimeSource};
use canvasreel_playback_engine::{FileMediaFactory, MediaPool, Player};
use canvasreel_render_engine::{
    CanvasPresenter, ExportPipeline, ExportProgress, ExportRequest, ExportSettings, FontBook,
    FrameFormat, MemoryRecorder, Pacer, ProgressCallback, Rasterizer,
};

pub struct ExportArgs {
    pub path: PathBuf,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub fps: Option<u32>,
    pub format: String,
    pub output: Option<PathBuf>,
}

pub async fn run(args: ExportArgs, config: &AppConfig) -> anyhow::Result<()> {
    let (loaded, store) = super::open(&args.path, config)?;
    let format: FrameFormat = args.format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let (default_start, default_end) = ExportRequest::default_range(&store);
    let request = ExportRequest::new(
        args.start.unwrap_or(default_start),
        args.end.unwrap_or(default_end),
        args.fps.unwrap_or(config.export.fps),
        format,
    );
    request.validate_within(store.duration())?;

    let output = args.output.unwrap_or_else(|| {
        loaded
            .root
            .join("exports")
            .join(format!("{}_frames.zip", loaded.project.name))
    });

    println!("Exporting: {}", loaded.project.name);
    println!("  Range: {:.3}s - {:.3}s", request.start_time, request.end_time);
    println!("  FPS: {}", request.fps);
    println!("  Format: {}", request.image_format);
    println!("  Frames: {}", request.total_frames());
    println!("  Output: {}", output.display());

    let (pacer, clock): (Pacer, Arc<dyn TimeSource>) = match config.export.pacing {
        ExportPacing::Stepped => {
            let clock = ManualClock::new(0.0);
            (Pacer::Stepped(clock.clone()), Arc::new(clock))
        }
        ExportPacing::Realtime => {
            let clock: Arc<dyn TimeSource> = Arc::new(MonotonicClock::start());
            (
                Pacer::Realtime {
                    clock: Arc::clone(&clock),
                    refresh_hz: config.playback.refresh_hz,
                },
                clock,
            )
        }
    };

    let canvas = loaded.project.canvas;
    let rasterizer = Rasterizer::new(canvas.width, canvas.height, FontBook::load(&config.fonts))?;
    let pool = MediaPool::new(Box::new(FileMediaFactory::new(&loaded.root, clock)));
    let mut player = Player::new(
        store,
        pool,
        CanvasPresenter::new(rasterizer),
        &config.playback,
    );

    let mut pipeline = ExportPipeline::new(ExportSettings::from_config(config), MemoryRecorder::new());

    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling export");
            cancel.cancel();
        }
    });

    let progress: ProgressCallback = Box::new(|p: ExportProgress| {
        eprint!(
            "\r  {:>5.1}% {:?} ({}/{} frames)   ",
            p.percent, p.phase, p.frames_written, p.total_frames
        );
    });

    let result = pipeline.run(&mut player, &pacer, &request, Some(progress)).await;
    eprintln!();
    let archive = result?;
    archive.write_to(&output)?;

    println!(
        "\nExport complete: {} frame(s) -> {}",
        archive.frame_count(),
        output.display()
    );
    Ok(())
}
