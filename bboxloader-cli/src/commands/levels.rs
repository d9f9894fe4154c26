//! `levels` command: show the configured detail levels.

use std::path::Path;

use console::style;

use bboxloader::{Level, LevelRegistry};

use super::load_settings;
use crate::error::CliError;

/// Print the levels in `config`, and the level a zoom resolves to.
pub fn run(config: &Path, zoom: Option<f64>) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let registry = LevelRegistry::new(settings.levels.clone())?;

    println!("{}", style("Levels").bold());
    for level in registry.levels() {
        println!("  {}", describe(level));
    }
    println!();
    println!(
        "buffer ratio {}, bbox order {}, ingest policy {}",
        settings.buffer_ratio, settings.bbox_order, settings.ingest_policy
    );

    if let Some(zoom) = zoom {
        let id = registry
            .resolve_level(zoom)
            .map_err(bboxloader::LoaderError::from)?;
        println!();
        println!("zoom {} -> {}", zoom, style(id).green().bold());
    }

    Ok(())
}

/// One-line summary of a level.
pub fn describe(level: &Level) -> String {
    let bound = |zoom: Option<f64>, open: &str| zoom.map_or(open.to_string(), |z| z.to_string());
    let tile = level
        .tile_size
        .map_or("unset".to_string(), |size| format!("{}°", size));

    format!(
        "{}  zoom [{}, {})  tile {}",
        level.id,
        bound(level.min_zoom, "-inf"),
        bound(level.max_zoom, "inf"),
        tile
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_describe_level() {
        let level = Level::new(1, 0.1).with_min_zoom(5.0).with_max_zoom(20.0);
        assert_eq!(describe(&level), "L1  zoom [5, 20)  tile 0.1°");

        let open = Level::new(0, 1.0).without_tile_size();
        assert_eq!(describe(&open), "L0  zoom [-inf, inf)  tile unset");
    }

    #[test]
    fn test_run_with_valid_config() {
        let file = config_file(
            "[level.0]\nmax_zoom = 5\ntile_size = 1\n[level.1]\nmin_zoom = 5\ntile_size = 0.1\n",
        );
        assert!(run(file.path(), Some(7.0)).is_ok());
    }

    #[test]
    fn test_run_reports_gap() {
        let file = config_file("[level.0]\nmin_zoom = 2\ntile_size = 1\n");
        let err = run(file.path(), Some(1.0)).unwrap_err();
        assert!(matches!(err, CliError::Loader(_)));
    }

    #[test]
    fn test_run_reports_overlap() {
        let file =
            config_file("[level.0]\ntile_size = 1\n[level.1]\nmin_zoom = 4\ntile_size = 0.5\n");
        let err = run(file.path(), None).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
