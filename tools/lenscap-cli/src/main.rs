//! Lenscap CLI: drive capture sessions and inspect configuration.
//!
//! Usage:
//!   lenscap record [OPTIONS]    Record a clip with the synthetic backend
//!   lenscap config [--check]    Show (and optionally validate) configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lenscap_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "lenscap",
    about = "AR camera capture sessions: camera switching and clip recording",
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
    /// Record a clip
    Record {
        /// Stop after this many seconds (default: run to the duration limit)
        #[arg(long)]
        secs: Option<f64>,

        /// Switch camera this many seconds into the recording
        #[arg(long)]
        flip_at: Option<f64>,

        /// Directory the recording is saved to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Start on the front camera
        #[arg(long)]
        front: bool,

        /// User agent used to pick the device class
        #[arg(long)]
        user_agent: Option<String>,

        /// Offer the finished clip to the share sheet as well
        #[arg(long)]
        share: bool,
    },

    /// Show the resolved configuration
    Config {
        /// Fail if a required value is missing
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    lenscap_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Record {
            secs,
            flip_at,
            output,
            front,
            user_agent,
            share,
        } => {
            commands::record::run(
                config,
                commands::record::RecordOptions {
                    stop_after_secs: secs,
                    flip_at_secs: flip_at,
                    output,
                    front,
                    user_agent,
                    share,
                },
            )
            .await
        }
        Commands::Config { check } => commands::config::run(&config, check),
    }
}
