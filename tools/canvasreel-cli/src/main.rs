//! CanvasReel CLI: create, inspect, validate, and export timeline projects.
//!
//! Usage:
//!   canvasreel init <NAME>        Create an empty project
//!   canvasreel info <PATH>        Show tracks, clips, and markers
//!   canvasreel validate <PATH>    Check a project for problems
//!   canvasreel export <PATH>      Render a range to a zip of frame images
//!   canvasreel check              Report configuration and fonts

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "canvasreel",
    about = "Multi-track timeline compositing and frame export",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Canvas width
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Canvas height
        #[arg(long, default_value = "720")]
        height: u32,

        /// Timeline length in seconds
        #[arg(long, default_value = "300")]
        duration: f64,
    },

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,

        /// Also print the frame composition at this time (seconds) as JSON
        #[arg(long)]
        at: Option<f64>,
    },

    /// Validate a project
    Validate {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Export a timeline range as numbered frame images in a zip archive
    Export {
        /// Path to the project directory
        path: PathBuf,

        /// Range start in seconds (default: selection or 0)
        #[arg(long)]
        start: Option<f64>,

        /// Range end in seconds (default: selection end or project duration)
        #[arg(long)]
        end: Option<f64>,

        /// Frames per second (default from config)
        #[arg(long)]
        fps: Option<u32>,

        /// Frame image format: png or jpeg
        #[arg(long, default_value = "png")]
        format: String,

        /// Output archive path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check configuration and fonts
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = canvasreel_common::config::AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    canvasreel_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init {
            name,
            output,
            width,
            height,
            duration,
        } => commands::init::run(name, output, width, height, duration),
        Commands::Info { path, at } => commands::info::run(path, at, &config),
        Commands::Validate { path } => commands::validate::run(path, &config),
        Commands::Export {
            path,
            start,
            end,
            fps,
            format,
            output,
        } => {
            commands::export::run(
                commands::export::ExportArgs {
                    path,
                    start,
                    end,
                    fps,
                    format,
                    output,
                },
                &config,
            )
            .await
        }
        Commands::Check => commands::check::run(&config),
    }
}
