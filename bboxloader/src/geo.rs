//! Geographic bounding boxes.
//!
//! The loader works on plain latitude/longitude rectangles. Longitude is the
//! x axis and latitude the y axis when bounds are mapped into tile space.
//! No projection math happens here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Minimum (southernmost) latitude
    pub min_lat: f64,
    /// Maximum (northernmost) latitude
    pub max_lat: f64,
    /// Minimum (westernmost) longitude
    pub min_lon: f64,
    /// Maximum (easternmost) longitude
    pub max_lon: f64,
}

impl GeoBounds {
    /// Create a new bounding box.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Create a bounding box from its south-west and north-east corners.
    pub fn from_corners(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(south, north, west, east)
    }

    /// Width of the bounds in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height of the bounds in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Whether all edges are finite and correctly ordered.
    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lon, self.max_lon]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
    }

    /// Grow the bounds on every side by `ratio` of their extent.
    ///
    /// A ratio of 0.5 adds half the width to both the west and east edges and
    /// half the height to both the south and north edges.
    pub fn pad(&self, ratio: f64) -> Self {
        let lat_buffer = self.height().abs() * ratio;
        let lon_buffer = self.width().abs() * ratio;
        Self {
            min_lat: self.min_lat - lat_buffer,
            max_lat: self.max_lat + lat_buffer,
            min_lon: self.min_lon - lon_buffer,
            max_lon: self.max_lon + lon_buffer,
        }
    }

    /// Whether two boxes share any area or edge.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
    }

    /// Serialize the bounds for the fetch protocol.
    pub fn to_bbox_string(&self, order: BBoxOrder) -> String {
        match order {
            BBoxOrder::SouthWestNorthEast => format!(
                "{},{},{},{}",
                self.min_lat, self.min_lon, self.max_lat, self.max_lon
            ),
            BBoxOrder::WestSouthEastNorth => format!(
                "{},{},{},{}",
                self.min_lon, self.min_lat, self.max_lon, self.max_lat
            ),
        }
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}] x [{:.4}, {:.4}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

/// Edge order used when serializing a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BBoxOrder {
    /// `south,west,north,east`
    #[default]
    SouthWestNorthEast,
    /// `west,south,east,north`, as produced by web map toolkits.
    WestSouthEastNorth,
}

impl BBoxOrder {
    /// Short configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BBoxOrder::SouthWestNorthEast => "swne",
            BBoxOrder::WestSouthEastNorth => "wsen",
        }
    }
}

impl fmt::Display for BBoxOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BBoxOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "swne" | "south,west,north,east" => Ok(BBoxOrder::SouthWestNorthEast),
            "wsen" | "west,south,east,north" => Ok(BBoxOrder::WestSouthEastNorth),
            other => Err(ConfigError::InvalidValue {
                key: "bbox_order".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_half_extent() {
        let bounds = GeoBounds::new(10.0, 12.0, 20.0, 24.0);
        let padded = bounds.pad(0.5);

        assert_eq!(padded.min_lat, 9.0);
        assert_eq!(padded.max_lat, 13.0);
        assert_eq!(padded.min_lon, 18.0);
        assert_eq!(padded.max_lon, 26.0);
    }

    #[test]
    fn test_pad_zero_is_identity() {
        let bounds = GeoBounds::new(-1.0, 1.0, -2.0, 2.0);
        assert_eq!(bounds.pad(0.0), bounds);
    }

    #[test]
    fn test_bbox_string_orders() {
        let bounds = GeoBounds::from_corners(1.0, 2.0, 3.5, 4.0);
        assert_eq!(
            bounds.to_bbox_string(BBoxOrder::SouthWestNorthEast),
            "1,2,3.5,4"
        );
        assert_eq!(
            bounds.to_bbox_string(BBoxOrder::WestSouthEastNorth),
            "2,1,4,3.5"
        );
    }

    #[test]
    fn test_intersects() {
        let a = GeoBounds::new(0.0, 2.0, 0.0, 2.0);
        let b = GeoBounds::new(1.0, 3.0, 1.0, 3.0);
        let c = GeoBounds::new(5.0, 6.0, 5.0, 6.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_is_valid() {
        assert!(GeoBounds::new(0.0, 1.0, 0.0, 1.0).is_valid());
        assert!(!GeoBounds::new(1.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!GeoBounds::new(0.0, f64::NAN, 0.0, 1.0).is_valid());
    }

    #[test]
    fn test_bbox_order_parse() {
        assert_eq!(
            "SWNE".parse::<BBoxOrder>().unwrap(),
            BBoxOrder::SouthWestNorthEast
        );
        assert_eq!(
            "wsen".parse::<BBoxOrder>().unwrap(),
            BBoxOrder::WestSouthEastNorth
        );
        assert!("nesw".parse::<BBoxOrder>().is_err());
    }
}
