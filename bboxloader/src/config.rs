//! Loader settings.
//!
//! Settings can be built in code or loaded from an INI file:
//!
//! ```ini
//! [loader]
//! buffer_ratio = 0.5
//! bbox_order = swne
//! ingest_policy = skip
//!
//! [level.0]
//! max_zoom = 5
//! tile_size = 1.0
//!
//! [level.1]
//! min_zoom = 5
//! max_zoom = 20
//! tile_size = 0.1
//! ```
//!
//! Level sections are read in file order; the suffix after `level.` is the
//! level id. Every key is optional. Missing `[loader]` keys keep their
//! defaults.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ini::{Ini, Properties};

use crate::error::ConfigError;
use crate::geo::BBoxOrder;
use crate::level::{Level, LevelId};
use crate::planner::DEFAULT_BUFFER_RATIO;

/// INI section holding loader-wide settings.
pub const LOADER_SECTION: &str = "loader";

/// Prefix of INI sections describing a level.
pub const LEVEL_SECTION_PREFIX: &str = "level.";

/// What to do with a feature whose id or payload cannot be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestPolicy {
    /// Skip the feature, log a warning and keep ingesting the batch.
    #[default]
    SkipInvalid,
    /// Abort the whole batch before anything is displayed.
    Strict,
}

impl IngestPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestPolicy::SkipInvalid => "skip",
            IngestPolicy::Strict => "strict",
        }
    }
}

impl fmt::Display for IngestPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" | "skip-invalid" => Ok(IngestPolicy::SkipInvalid),
            "strict" => Ok(IngestPolicy::Strict),
            other => Err(ConfigError::InvalidValue {
                key: "ingest_policy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Settings for a loader instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    /// Fraction of the viewport extent prefetched on every side.
    pub buffer_ratio: f64,

    /// Edge order of the bbox string sent to the feature source.
    pub bbox_order: BBoxOrder,

    /// Handling of malformed features.
    pub ingest_policy: IngestPolicy,

    /// Levels in declaration order.
    pub levels: Vec<Level>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            buffer_ratio: DEFAULT_BUFFER_RATIO,
            bbox_order: BBoxOrder::default(),
            ingest_policy: IngestPolicy::default(),
            levels: Vec::new(),
        }
    }
}

impl LoaderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.levels.push(level);
        self
    }

    /// Set the buffer ratio.
    pub fn with_buffer_ratio(mut self, ratio: f64) -> Self {
        self.buffer_ratio = ratio;
        self
    }

    /// Set the bbox edge order.
    pub fn with_bbox_order(mut self, order: BBoxOrder) -> Self {
        self.bbox_order = order;
        self
    }

    /// Set the ingest policy.
    pub fn with_ingest_policy(mut self, policy: IngestPolicy) -> Self {
        self.ingest_policy = policy;
        self
    }

    /// Check values that do not depend on the level setup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.buffer_ratio.is_finite() || self.buffer_ratio < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "buffer_ratio".to_string(),
                value: self.buffer_ratio.to_string(),
            });
        }
        Ok(())
    }

    /// Load settings from an INI file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini_str(&text)
    }

    /// Parse settings from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut settings = Self::default();

        if let Some(section) = ini.section(Some(LOADER_SECTION)) {
            if let Some(ratio) = parse_f64(section, "buffer_ratio")? {
                settings.buffer_ratio = ratio;
            }
            if let Some(order) = section.get("bbox_order") {
                settings.bbox_order = order.parse()?;
            }
            if let Some(policy) = section.get("ingest_policy") {
                settings.ingest_policy = policy.parse()?;
            }
        }

        for (name, section) in ini.iter() {
            let Some(suffix) = name.and_then(|n| n.strip_prefix(LEVEL_SECTION_PREFIX)) else {
                continue;
            };
            let id: u32 = suffix.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "level".to_string(),
                value: suffix.to_string(),
            })?;

            settings.levels.push(Level {
                id: LevelId(id),
                min_zoom: parse_f64(section, "min_zoom")?,
                max_zoom: parse_f64(section, "max_zoom")?,
                tile_size: parse_f64(section, "tile_size")?,
            });
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn parse_f64(section: &Properties, key: &str) -> Result<Option<f64>, ConfigError> {
    section
        .get(key)
        .map(|raw| {
            raw.trim().parse::<f64>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[loader]
buffer_ratio = 0.25
bbox_order = wsen
ingest_policy = strict

[level.0]
max_zoom = 5
tile_size = 1.0

[level.1]
min_zoom = 5
max_zoom = 20
tile_size = 0.1
"#;

    #[test]
    fn test_default_settings() {
        let settings = LoaderSettings::default();
        assert_eq!(settings.buffer_ratio, DEFAULT_BUFFER_RATIO);
        assert_eq!(settings.bbox_order, BBoxOrder::SouthWestNorthEast);
        assert_eq!(settings.ingest_policy, IngestPolicy::SkipInvalid);
        assert!(settings.levels.is_empty());
    }

    #[test]
    fn test_builder_pattern() {
        let settings = LoaderSettings::new()
            .with_level(Level::new(0, 1.0))
            .with_buffer_ratio(1.0)
            .with_bbox_order(BBoxOrder::WestSouthEastNorth)
            .with_ingest_policy(IngestPolicy::Strict);

        assert_eq!(settings.levels.len(), 1);
        assert_eq!(settings.buffer_ratio, 1.0);
        assert_eq!(settings.ingest_policy, IngestPolicy::Strict);
    }

    #[test]
    fn test_parse_ini() {
        let settings = LoaderSettings::from_ini_str(SAMPLE).unwrap();

        assert_eq!(settings.buffer_ratio, 0.25);
        assert_eq!(settings.bbox_order, BBoxOrder::WestSouthEastNorth);
        assert_eq!(settings.ingest_policy, IngestPolicy::Strict);
        assert_eq!(
            settings.levels,
            vec![
                Level::new(0, 1.0).with_max_zoom(5.0),
                Level::new(1, 0.1).with_min_zoom(5.0).with_max_zoom(20.0),
            ]
        );
    }

    #[test]
    fn test_parse_keeps_declaration_order() {
        let text = "[level.7]\ntile_size = 2\n[level.3]\ntile_size = 1\n";
        let settings = LoaderSettings::from_ini_str(text).unwrap();
        let ids: Vec<_> = settings.levels.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![LevelId(7), LevelId(3)]);
    }

    #[test]
    fn test_parse_missing_tile_size_is_kept_unset() {
        let settings = LoaderSettings::from_ini_str("[level.0]\nmax_zoom = 3\n").unwrap();
        assert_eq!(settings.levels[0].tile_size, None);
    }

    #[test]
    fn test_parse_invalid_values() {
        assert!(matches!(
            LoaderSettings::from_ini_str("[level.x]\ntile_size = 1\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            LoaderSettings::from_ini_str("[level.0]\ntile_size = big\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            LoaderSettings::from_ini_str("[loader]\nbuffer_ratio = -1\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            LoaderSettings::from_ini_str("[loader]\ningest_policy = lenient\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = LoaderSettings::load(file.path()).unwrap();
        assert_eq!(settings.levels.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = LoaderSettings::load(Path::new("/nonexistent/loader.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
