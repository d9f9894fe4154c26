//! BBoxLoader CLI - Command-line interface
//!
//! Inspects level configurations and replays viewport sessions against a
//! GeoJSON feature catalogue.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use bboxloader::logging::{default_log_dir, default_log_file, init_logging};
use error::CliError;

#[derive(Parser)]
#[command(name = "bboxloader")]
#[command(version, about = "Progressive level-of-detail feature loading", long_about = None)]
struct Cli {
    /// Directory for the log file
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the configured levels
    Levels {
        /// Loader configuration (INI)
        #[arg(long)]
        config: PathBuf,

        /// Also show which level this zoom resolves to
        #[arg(long, allow_negative_numbers = true)]
        zoom: Option<f64>,
    },

    /// Replay viewports against a feature catalogue
    Simulate {
        /// Loader configuration (INI)
        #[arg(long)]
        config: PathBuf,

        /// Feature catalogue (GeoJSON FeatureCollection)
        #[arg(long)]
        features: PathBuf,

        /// Viewport script (JSON array)
        #[arg(long)]
        viewports: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_dir = cli
        .log_dir
        .unwrap_or_else(|| PathBuf::from(default_log_dir()));
    let _logging_guard = match init_logging(&log_dir, default_log_file()) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e).exit(),
    };

    let result = match cli.command {
        Commands::Levels { config, zoom } => commands::levels::run(&config, zoom),
        Commands::Simulate {
            config,
            features,
            viewports,
        } => commands::simulate::run(&config, &features, &viewports),
    };

    if let Err(e) = result {
        e.exit();
    }
}
