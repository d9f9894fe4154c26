//! Viewport planner.
//!
//! Turns a settled viewport into the region that still has to be fetched:
//!
//! 1. Reject bounds that are not finite and ordered
//! 2. Resolve the level for the viewport zoom
//! 3. Pad the viewport bounds by the buffer ratio
//! 4. Map the padded bounds to a tile rectangle at the level's tile size
//! 5. Mark every tile not yet requested, collecting their rectangle
//! 6. Return the spatial extent of the new tiles, or `None` if all were known
//!
//! Marking happens here, synchronously, before any fetch is issued. Two
//! settle events arriving before the first fetch resolves therefore never
//! request the same tile twice.

use crate::error::{LoaderResult, ViewportError};
use crate::geo::GeoBounds;
use crate::level::{LevelId, LevelRegistry};
use crate::tile::{TileRect, TileRequestCache};

/// Default fraction of the viewport extent added on every side.
pub const DEFAULT_BUFFER_RATIO: f64 = 0.5;

/// Most tiles a single planning pass will visit.
pub const MAX_TILES_PER_PLAN: u64 = 1 << 20;

/// A settled map view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Current map zoom
    pub zoom: f64,
    /// Visible bounds
    pub bounds: GeoBounds,
}

impl Viewport {
    pub fn new(zoom: f64, bounds: GeoBounds) -> Self {
        Self { zoom, bounds }
    }

    /// Visible bounds grown by `ratio` of their extent on every side.
    pub fn padded_bounds(&self, ratio: f64) -> GeoBounds {
        self.bounds.pad(ratio)
    }
}

/// Work produced by a planning pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    /// Level resolved from the viewport zoom
    pub level: LevelId,
    /// Tile size of that level
    pub tile_size: f64,
    /// Every tile touched by the padded viewport
    pub tile_rect: TileRect,
    /// Bounding rectangle of the tiles marked by this pass
    pub new_tiles: TileRect,
    /// Number of tiles marked by this pass
    pub new_tile_count: usize,
    /// Region to fetch: the spatial extent of `new_tiles`
    pub required_bounds: GeoBounds,
}

/// Computes which tiles a viewport still needs.
#[derive(Debug, Clone, Copy)]
pub struct ViewportPlanner {
    buffer_ratio: f64,
}

impl Default for ViewportPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_RATIO)
    }
}

impl ViewportPlanner {
    pub fn new(buffer_ratio: f64) -> Self {
        Self { buffer_ratio }
    }

    pub fn buffer_ratio(&self) -> f64 {
        self.buffer_ratio
    }

    /// Plan a fetch for `viewport`, marking new tiles in `cache`.
    ///
    /// # Errors
    ///
    /// - `LevelResolutionError` if no level covers the viewport zoom
    /// - `ConfigError::MissingTileSize` if the resolved level has no tile size
    /// - `ViewportError` if the bounds are not finite and ordered, leave the
    ///   tile grid, or cover more than [`MAX_TILES_PER_PLAN`] tiles
    ///
    /// Nothing is marked when an error is returned.
    pub fn plan(
        &self,
        viewport: &Viewport,
        registry: &LevelRegistry,
        cache: &mut TileRequestCache,
    ) -> LoaderResult<Option<FetchPlan>> {
        if !viewport.bounds.is_valid() {
            tracing::warn!(bounds = %viewport.bounds, "Ignoring viewport with invalid bounds");
            return Err(ViewportError::InvalidBounds(viewport.bounds).into());
        }

        let level = registry.resolve_level(viewport.zoom)?;
        let tile_size = registry.tile_size_of(level)?;

        let padded = viewport.padded_bounds(self.buffer_ratio);
        let tile_rect = if padded.is_valid() {
            TileRect::from_bounds(&padded, tile_size)
        } else {
            None
        };
        let Some(tile_rect) = tile_rect else {
            tracing::warn!(bounds = %padded, level = %level, "Viewport leaves the tile grid");
            return Err(ViewportError::OutOfRange {
                bounds: padded,
                level,
            }
            .into());
        };

        let tiles = tile_rect.tile_count();
        if tiles > MAX_TILES_PER_PLAN {
            tracing::warn!(level = %level, tiles, "Viewport covers too many tiles");
            return Err(ViewportError::TooManyTiles {
                level,
                tiles,
                limit: MAX_TILES_PER_PLAN,
            }
            .into());
        }

        let mut new_tiles: Option<TileRect> = None;
        let mut new_tile_count = 0;
        for key in tile_rect.keys(level) {
            if cache.mark_requested(key) {
                new_tile_count += 1;
                match new_tiles.as_mut() {
                    Some(rect) => rect.extend(key.x, key.y),
                    None => new_tiles = Some(TileRect::from_tile(key.x, key.y)),
                }
            }
        }

        let Some(new_tiles) = new_tiles else {
            tracing::debug!(
                level = %level,
                tiles,
                rect = %tile_rect,
                "All tiles already requested"
            );
            return Ok(None);
        };

        let required_bounds = new_tiles.to_bounds(tile_size);
        tracing::debug!(
            level = %level,
            tiles,
            new_tiles = new_tile_count,
            rect = %new_tiles,
            "Planned fetch for new tiles"
        );

        Ok(Some(FetchPlan {
            level,
            tile_size,
            tile_rect,
            new_tiles,
            new_tile_count,
            required_bounds,
        }))
    }
}
