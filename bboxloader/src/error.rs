//! Error types for the loader.
//!
//! Configuration and level-resolution errors are fatal: they indicate a
//! defect in the level setup rather than a transient runtime condition.
//! Viewport errors drop a single settle event. Ingest errors only ever
//! abort a single result batch, and fetch errors belong to the feature
//! source.

use std::path::PathBuf;

use thiserror::Error;

use crate::feature::FeatureId;
use crate::geo::GeoBounds;
use crate::level::LevelId;

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors raised while building or configuring a loader.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A required builder option was never supplied.
    #[error("'{0}' is required")]
    MissingOption(&'static str),

    /// The level list is empty.
    #[error("at least one level must be configured")]
    NoLevels,

    /// Two levels share the same id.
    #[error("level {0} is configured more than once")]
    DuplicateLevel(LevelId),

    /// A level's lower zoom bound is not below its upper bound.
    #[error("level {level} has an empty zoom range [{min}, {max})")]
    EmptyZoomRange { level: LevelId, min: f64, max: f64 },

    /// Two levels claim the same zoom values.
    #[error("levels {first} and {second} have overlapping zoom ranges")]
    OverlappingLevels { first: LevelId, second: LevelId },

    /// The resolved level has no tile size.
    #[error("tile size not set for level {0}")]
    MissingTileSize(LevelId),

    /// A tile size is zero, negative or not finite.
    #[error("invalid tile size {size} for level {level}")]
    InvalidTileSize { level: LevelId, size: f64 },

    /// A level id that the registry does not know.
    #[error("unknown level {0}")]
    UnknownLevel(LevelId),

    /// A setting holds a value that cannot be used.
    #[error("invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    /// The configuration text could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("failed to read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },
}

/// No configured level covers the requested zoom.
///
/// This means the level ranges leave a gap, so it is surfaced immediately
/// and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("could not determine level for zoom {zoom}")]
pub struct LevelResolutionError {
    /// The zoom value that fell outside every level.
    pub zoom: f64,
}

/// A viewport that cannot be mapped onto the tile grid.
///
/// The event is dropped without marking any tile. Later viewports are
/// planned as usual.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ViewportError {
    /// An edge is NaN or infinite, or a minimum exceeds its maximum.
    #[error("viewport bounds {0} are not finite and ordered")]
    InvalidBounds(GeoBounds),

    /// A tile index falls outside the representable grid.
    #[error("viewport bounds {bounds} leave the tile grid at level {level}")]
    OutOfRange { bounds: GeoBounds, level: LevelId },

    /// The padded viewport covers more tiles than a single pass may mark.
    #[error("viewport covers {tiles} tiles at level {level}, limit is {limit}")]
    TooManyTiles { level: LevelId, tiles: u64, limit: u64 },
}

/// Errors raised by a render target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The target cannot turn raw geometry into renderables.
    #[error("render target does not convert raw geometry")]
    ConversionUnsupported,

    /// The geometry was rejected during conversion.
    #[error("geometry conversion failed: {0}")]
    Conversion(String),
}

/// Errors reported by a feature source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The source dropped its reply handle without answering.
    #[error("feature source abandoned the request")]
    Abandoned,
}

/// Errors raised while ingesting a result batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The identity extractor yielded no id.
    #[error("could not retrieve id for feature #{index}")]
    MissingFeatureId { index: usize },

    /// The payload extractor yielded nothing.
    #[error("could not retrieve payload for feature {id}")]
    MissingPayload { id: FeatureId },

    /// Raw geometry could not be converted into renderables.
    #[error("could not render feature {id}: {source}")]
    Conversion {
        id: FeatureId,
        #[source]
        source: RenderError,
    },
}

/// Umbrella error for loader operations.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    LevelResolution(#[from] LevelResolutionError),

    #[error(transparent)]
    Viewport(#[from] ViewportError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl LoaderError {
    /// Whether the error invalidates the loader rather than a single batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoaderError::Config(_) | LoaderError::LevelResolution(_)
        )
    }
}
