//! CLI subcommands.

pub mod levels;
pub mod simulate;

use std::path::Path;

use bboxloader::LoaderSettings;

use crate::error::CliError;

/// Load loader settings from an INI file.
pub fn load_settings(path: &Path) -> Result<LoaderSettings, CliError> {
    Ok(LoaderSettings::load(path)?)
}

/// Read and parse a JSON input file.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let input_error = |reason: String| CliError::Input {
        path: path.to_path_buf(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| input_error(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| input_error(e.to_string()))
}
