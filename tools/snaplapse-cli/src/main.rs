//! Snaplapse CLI — Command-line interface for snapshot timelapse rendering.
//!
//! Usage:
//!   snaplapse render <DIR> [OPTIONS]       Render a snapshot directory to video
//!   snaplapse compare <DIR> <DIR>... [OPTIONS]
//!                                          Render a side-by-side comparison
//!   snaplapse check                        Check ffmpeg and codec availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "snaplapse",
    about = "Turn snapshot image series into timelapse videos",
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
    /// Render a snapshot directory into a timelapse video
    Render {
        /// Directory of snapshot images, rendered in filename order
        dir: PathBuf,

        /// Output name (defaults to a UTC-stamped name; the extension is
        /// decided by codec negotiation)
        #[arg(short, long)]
        output: Option<String>,

        /// Output frames per second
        #[arg(long, default_value = "10")]
        fps: u32,

        /// Burn capture timestamps into the frames
        #[arg(long)]
        burn_timestamp: bool,

        /// Run as a background job, polling progress until done
        #[arg(long)]
        background: bool,

        /// Directory to write the video into (defaults to the configured
        /// videos directory)
        #[arg(long)]
        videos_dir: Option<PathBuf>,
    },

    /// Render several snapshot directories side by side
    Compare {
        /// Two or more snapshot directories, one tile each, left to right
        #[arg(num_args = 2.., required = true)]
        dirs: Vec<PathBuf>,

        /// Output name (extension is decided by codec negotiation)
        #[arg(short, long, default_value = "comparison")]
        output: String,

        /// Output frames per second
        #[arg(long, default_value = "10")]
        fps: u32,

        /// Directory to write the video into (defaults to the configured
        /// videos directory)
        #[arg(long)]
        videos_dir: Option<PathBuf>,
    },

    /// Check ffmpeg availability and the negotiated codec
    Check {
        /// Drop the cached codec choice and probe again
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    snaplapse_common::logging::init_logging(&snaplapse_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Render {
            dir,
            output,
            fps,
            burn_timestamp,
            background,
            videos_dir,
        } => commands::render::run(dir, output, fps, burn_timestamp, background, videos_dir),
        Commands::Compare {
            dirs,
            output,
            fps,
            videos_dir,
        } => commands::compare::run(dirs, output, fps, videos_dir),
        Commands::Check { force } => commands::check::run(force),
    }
}
