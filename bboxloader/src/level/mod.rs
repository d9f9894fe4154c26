//! Level registry.
//!
//! A level is a detail tier with its own zoom range and tile size. Levels
//! partition the zoom axis: every zoom the map can reach must fall into
//! exactly one `[min_zoom, max_zoom)` range. An absent bound is unbounded on
//! that side.
//!
//! Level ids double as the detail rank. A feature loaded at `L2` is more
//! detailed than the same feature at `L1`, regardless of declaration order.

use std::fmt;

use crate::error::{ConfigError, LevelResolutionError};

/// Identifier and detail rank of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LevelId(pub u32);

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Level descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    /// Level identifier (higher = more detailed)
    pub id: LevelId,
    /// Inclusive lower zoom bound, `None` for unbounded
    pub min_zoom: Option<f64>,
    /// Exclusive upper zoom bound, `None` for unbounded
    pub max_zoom: Option<f64>,
    /// Edge length of a tile in degrees
    pub tile_size: Option<f64>,
}

impl Level {
    /// Create an unbounded level with the given tile size.
    pub fn new(id: u32, tile_size: f64) -> Self {
        Self {
            id: LevelId(id),
            min_zoom: None,
            max_zoom: None,
            tile_size: Some(tile_size),
        }
    }

    /// Set the inclusive lower zoom bound.
    pub fn with_min_zoom(mut self, zoom: f64) -> Self {
        self.min_zoom = Some(zoom);
        self
    }

    /// Set the exclusive upper zoom bound.
    pub fn with_max_zoom(mut self, zoom: f64) -> Self {
        self.max_zoom = Some(zoom);
        self
    }

    /// Clear the tile size.
    pub fn without_tile_size(mut self) -> Self {
        self.tile_size = None;
        self
    }

    /// Whether `zoom` falls in `[min_zoom, max_zoom)`.
    pub fn contains_zoom(&self, zoom: f64) -> bool {
        self.min_zoom.map_or(true, |min| zoom >= min)
            && self.max_zoom.map_or(true, |max| zoom < max)
    }

    fn lower(&self) -> f64 {
        self.min_zoom.unwrap_or(f64::NEG_INFINITY)
    }

    fn upper(&self) -> f64 {
        self.max_zoom.unwrap_or(f64::INFINITY)
    }
}

/// Ordered, validated collection of levels.
#[derive(Debug, Clone)]
pub struct LevelRegistry {
    levels: Vec<Level>,
}

impl LevelRegistry {
    /// Validate and wrap a list of levels.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the list is empty, an id repeats, a zoom range
    /// is empty, two ranges overlap, or a tile size is not a positive number.
    /// A missing tile size is accepted here and reported when the level is
    /// first planned against.
    pub fn new(levels: Vec<Level>) -> Result<Self, ConfigError> {
        if levels.is_empty() {
            return Err(ConfigError::NoLevels);
        }

        for (i, level) in levels.iter().enumerate() {
            if levels[..i].iter().any(|other| other.id == level.id) {
                return Err(ConfigError::DuplicateLevel(level.id));
            }
            if level.lower() >= level.upper() {
                return Err(ConfigError::EmptyZoomRange {
                    level: level.id,
                    min: level.lower(),
                    max: level.upper(),
                });
            }
            if let Some(size) = level.tile_size {
                if !size.is_finite() || size <= 0.0 {
                    return Err(ConfigError::InvalidTileSize {
                        level: level.id,
                        size,
                    });
                }
            }
            if let Some(other) = levels[..i]
                .iter()
                .find(|other| other.lower() < level.upper() && level.lower() < other.upper())
            {
                return Err(ConfigError::OverlappingLevels {
                    first: other.id,
                    second: level.id,
                });
            }
        }

        Ok(Self { levels })
    }

    /// Resolve the level whose zoom range contains `zoom`.
    ///
    /// Levels are checked in declaration order.
    pub fn resolve_level(&self, zoom: f64) -> Result<LevelId, LevelResolutionError> {
        self.levels
            .iter()
            .find(|level| level.contains_zoom(zoom))
            .map(|level| level.id)
            .ok_or(LevelResolutionError { zoom })
    }

    /// Tile size of a level.
    pub fn tile_size_of(&self, id: LevelId) -> Result<f64, ConfigError> {
        let level = self.get(id).ok_or(ConfigError::UnknownLevel(id))?;
        level.tile_size.ok_or(ConfigError::MissingTileSize(id))
    }

    /// Look up a level by id.
    pub fn get(&self, id: LevelId) -> Option<&Level> {
        self.levels.iter().find(|level| level.id == id)
    }

    /// Levels in declaration order.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
