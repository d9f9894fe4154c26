//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process;

use bboxloader::{ConfigError, LoaderError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(io::Error),
    /// Invalid loader or level configuration
    Config(ConfigError),
    /// An input file could not be read or parsed
    Input { path: PathBuf, reason: String },
    /// Failed to start the async runtime
    Runtime(io::Error),
    /// The loader stopped on a fatal error
    Loader(LoaderError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigError::OverlappingLevels { .. })
            | CliError::Loader(LoaderError::LevelResolution(_)) => {
                eprintln!();
                eprintln!("Level zoom ranges must not overlap and must leave no gaps.");
                eprintln!("Check with: bboxloader levels --config <file> --zoom <z>");
            }
            CliError::Input { .. } => {
                eprintln!();
                eprintln!("Features must be a GeoJSON FeatureCollection whose features carry");
                eprintln!("an id, a numeric 'level' property and a [west, south, east, north] bbox.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Input { path, reason } => {
                write!(f, "Failed to read '{}': {}", path.display(), reason)
            }
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Loader(e) => write!(f, "Loader error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Loader(e) => Some(e),
            CliError::Input { .. } => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<LoaderError> for CliError {
    fn from(e: LoaderError) -> Self {
        CliError::Loader(e)
    }
}
