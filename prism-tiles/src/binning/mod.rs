//! Spatial binning: tile coordinate to backend filter

mod bivariate;
mod geo;

pub use bivariate::Bivariate;
pub use geo::{GeoTiles, MAX_LAT, MIN_LAT};

use crate::coord::TileCoord;
use crate::error::Result;
use crate::params::TileParams;
use crate::query::Filter;

/// Axis-aligned tile bounds, always `min <= max` on both axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    pub(crate) fn from_corners(x0: f64, x1: f64, y0: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            max_x: x0.max(x1),
            min_y: y0.min(y1),
            max_y: y0.max(y1),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

/// Maps a tile to the region of the spatial field(s) it covers.
///
/// Implementations are pure: the same configuration and coordinate always
/// give the same filter.
pub trait SpatialBinner: Send + Sync + Sized {
    /// Read the binning configuration from the tile parameters
    fn parse(params: &TileParams) -> Result<Self>;

    fn tile_bounds(&self, coord: &TileCoord) -> Bounds;

    /// Inclusive filter selecting the records inside the tile
    fn bounds_filter(&self, coord: &TileCoord) -> Filter;
}

/// Linear interpolation that is exact at both ends
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}
