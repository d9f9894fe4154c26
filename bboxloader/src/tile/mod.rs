//! Tile grid and the tile request cache.
//!
//! Tiles are the unit of fetch deduplication. A tile key is derived by
//! dividing a coordinate by the level's tile size and flooring, so tile
//! `(x, y)` at size `s` covers `[x*s, (x+1)*s) x [y*s, (y+1)*s)` in
//! longitude/latitude.
//!
//! The cache records "have we asked", not "do features exist here". A tile
//! is marked before its fetch is issued and stays marked whatever the fetch
//! returns.

use std::collections::HashSet;
use std::fmt;

use crate::geo::GeoBounds;
use crate::level::LevelId;

/// Grid cell at a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Column index (longitude / tile size, floored)
    pub x: i64,
    /// Row index (latitude / tile size, floored)
    pub y: i64,
    /// Level the grid belongs to
    pub level: LevelId,
}

impl TileKey {
    pub fn new(x: i64, y: i64, level: LevelId) -> Self {
        Self { x, y, level }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.x, self.y, self.level)
    }
}

/// Largest absolute tile index on either axis.
///
/// Keeps `index + 1` and `index as f64 * tile_size` exact for any
/// rectangle built through [`TileRect::from_bounds`].
pub const MAX_TILE_INDEX: i64 = 1 << 40;

/// Inclusive rectangle of tile indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl TileRect {
    /// Rectangle covering a single tile.
    pub fn from_tile(x: i64, y: i64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// Tiles touched by `bounds` on a grid of `tile_size`.
    ///
    /// Both corners are floored, so a box ending exactly on a tile edge still
    /// includes the tile starting at that edge. Returns `None` when a corner
    /// is not finite or its index lies beyond [`MAX_TILE_INDEX`].
    pub fn from_bounds(bounds: &GeoBounds, tile_size: f64) -> Option<Self> {
        Some(Self {
            min_x: tile_index(bounds.min_lon, tile_size)?,
            min_y: tile_index(bounds.min_lat, tile_size)?,
            max_x: tile_index(bounds.max_lon, tile_size)?,
            max_y: tile_index(bounds.max_lat, tile_size)?,
        })
    }

    /// Grow the rectangle to include a tile.
    pub fn extend(&mut self, x: i64, y: i64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Number of tiles in the rectangle, saturating at `u64::MAX`.
    ///
    /// An inverted rectangle holds no tiles.
    pub fn tile_count(&self) -> u64 {
        span(self.min_x, self.max_x).saturating_mul(span(self.min_y, self.max_y))
    }

    /// Iterate tile keys row by row, south to north, west to east.
    pub fn keys(&self, level: LevelId) -> impl Iterator<Item = TileKey> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_y..=self.max_y)
            .flat_map(move |y| (min_x..=max_x).map(move |x| TileKey::new(x, y, level)))
    }

    /// Spatial extent of the rectangle, including the far edge of the last
    /// row and column.
    pub fn to_bounds(&self, tile_size: f64) -> GeoBounds {
        GeoBounds::new(
            self.min_y as f64 * tile_size,
            (self.max_y + 1) as f64 * tile_size,
            self.min_x as f64 * tile_size,
            (self.max_x + 1) as f64 * tile_size,
        )
    }
}

/// Floored grid index of `coord`, if it is finite and inside the grid.
fn tile_index(coord: f64, tile_size: f64) -> Option<i64> {
    let index = (coord / tile_size).floor();
    (index.is_finite() && index.abs() <= MAX_TILE_INDEX as f64).then_some(index as i64)
}

/// Inclusive length of `min..=max`.
fn span(min: i64, max: i64) -> u64 {
    if max < min {
        return 0;
    }
    max.abs_diff(min).saturating_add(1)
}

impl fmt::Display for TileRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x {}..={}, y {}..={}",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

/// Record of every tile that has been requested.
///
/// Owned by a single loader instance. Entries are only ever added; the whole
/// set can be forgotten through [`TileRequestCache::clear`].
#[derive(Debug, Clone, Default)]
pub struct TileRequestCache {
    requested: HashSet<TileKey>,
}

impl TileRequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the tile has already been requested.
    pub fn is_requested(&self, key: &TileKey) -> bool {
        self.requested.contains(key)
    }

    /// Mark a tile as requested.
    ///
    /// Returns `true` if the tile was not requested before. Marking an
    /// already-requested tile is a no-op.
    pub fn mark_requested(&mut self, key: TileKey) -> bool {
        self.requested.insert(key)
    }

    /// Number of requested tiles across all levels.
    pub fn len(&self) -> usize {
        self.requested.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }

    /// Number of requested tiles at one level.
    pub fn count_at_level(&self, level: LevelId) -> usize {
        self.requested.iter().filter(|key| key.level == level).count()
    }

    /// Forget every requested tile.
    pub fn clear(&mut self) {
        self.requested.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bounds_floors_both_corners() {
        let bounds = GeoBounds::new(-0.5, 1.5, 2.2, 3.9);
        let rect = TileRect::from_bounds(&bounds, 1.0).unwrap();

        assert_eq!(rect.min_x, 2);
        assert_eq!(rect.max_x, 3);
        assert_eq!(rect.min_y, -1);
        assert_eq!(rect.max_y, 1);
        assert_eq!(rect.tile_count(), 6);
    }

    #[test]
    fn test_from_bounds_fractional_tile_size() {
        let bounds = GeoBounds::new(0.05, 0.25, 0.0, 0.15);
        let rect = TileRect::from_bounds(&bounds, 0.1).unwrap();

        assert_eq!((rect.min_x, rect.max_x), (0, 1));
        assert_eq!((rect.min_y, rect.max_y), (0, 2));
    }

    #[test]
    fn test_from_bounds_rejects_non_finite_corners() {
        let nan = GeoBounds::new(f64::NAN, 1.0, 0.0, 1.0);
        assert_eq!(TileRect::from_bounds(&nan, 1.0), None);

        let infinite = GeoBounds::new(0.0, 1.0, f64::NEG_INFINITY, f64::INFINITY);
        assert_eq!(TileRect::from_bounds(&infinite, 1.0), None);
    }

    #[test]
    fn test_from_bounds_rejects_indices_beyond_grid() {
        let huge = GeoBounds::new(0.0, 0.5, 1e300, 1e300);
        assert_eq!(TileRect::from_bounds(&huge, 1.0), None);

        // Valid degrees, but a tile size small enough to leave the grid
        let world = GeoBounds::new(-90.0, 90.0, -180.0, 180.0);
        assert_eq!(TileRect::from_bounds(&world, 1e-12), None);

        let edge = MAX_TILE_INDEX as f64;
        let rect = TileRect::from_bounds(&GeoBounds::new(0.0, 0.5, edge, edge), 1.0).unwrap();
        assert_eq!(rect.max_x, MAX_TILE_INDEX);
        assert_eq!(rect.to_bounds(1.0).max_lon, edge + 1.0);
    }

    #[test]
    fn test_tile_count_of_inverted_rect_is_zero() {
        let rect = TileRect {
            min_x: 3,
            min_y: 0,
            max_x: 1,
            max_y: 0,
        };
        assert_eq!(rect.tile_count(), 0);

        let wide = TileRect {
            min_x: i64::MIN,
            min_y: i64::MIN,
            max_x: i64::MAX,
            max_y: i64::MAX,
        };
        assert_eq!(wide.tile_count(), u64::MAX);
    }

    #[test]
    fn test_keys_visit_every_tile_once() {
        let rect = TileRect {
            min_x: -1,
            min_y: 0,
            max_x: 1,
            max_y: 1,
        };
        let keys: Vec<_> = rect.keys(LevelId(0)).collect();

        assert_eq!(keys.len(), 6);
        assert_eq!(keys[0], TileKey::new(-1, 0, LevelId(0)));
        assert_eq!(keys[5], TileKey::new(1, 1, LevelId(0)));
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_extend_and_to_bounds() {
        let mut rect = TileRect::from_tile(2, 3);
        rect.extend(4, 1);

        assert_eq!(
            rect,
            TileRect {
                min_x: 2,
                min_y: 1,
                max_x: 4,
                max_y: 3
            }
        );
        assert_eq!(rect.tile_count(), 9);

        let bounds = rect.to_bounds(0.5);
        assert_eq!(bounds.min_lon, 1.0);
        assert_eq!(bounds.max_lon, 2.5);
        assert_eq!(bounds.min_lat, 0.5);
        assert_eq!(bounds.max_lat, 2.0);
    }

    #[test]
    fn test_mark_requested_is_idempotent() {
        let mut cache = TileRequestCache::new();
        let key = TileKey::new(1, 2, LevelId(0));

        assert!(!cache.is_requested(&key));
        assert!(cache.mark_requested(key));
        assert!(!cache.mark_requested(key));
        assert!(cache.is_requested(&key));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_same_indices_differ_per_level() {
        let mut cache = TileRequestCache::new();
        cache.mark_requested(TileKey::new(0, 0, LevelId(0)));

        assert!(!cache.is_requested(&TileKey::new(0, 0, LevelId(1))));
        assert_eq!(cache.count_at_level(LevelId(0)), 1);
        assert_eq!(cache.count_at_level(LevelId(1)), 0);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_tile_key_display() {
        assert_eq!(TileKey::new(3, -4, LevelId(1)).to_string(), "3:-4:L1");
    }
}
