use super::{Bounds, SpatialBinner};
use crate::coord::TileCoord;
use crate::error::Result;
use crate::params::TileParams;
use crate::query::{Filter, GeoBox, GeoPoint};
use std::f64::consts::PI;

/// Web Mercator valid latitude range
pub const MAX_LAT: f64 = 85.051_128_779_806_59;
pub const MIN_LAT: f64 = -MAX_LAT;

/// Slippy-map tiles over a `geo_point` field.
///
/// Tile `x = 0` is at the antimeridian (west), `y = 0` is the northernmost row.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTiles {
    pub field: String,
}

impl GeoTiles {
    fn lon(x: u64, dim: f64) -> f64 {
        x as f64 / dim * 360.0 - 180.0
    }

    fn lat(y: u64, dim: f64) -> f64 {
        let n = PI * (1.0 - 2.0 * y as f64 / dim);
        n.sinh().atan().to_degrees()
    }
}

impl SpatialBinner for GeoTiles {
    fn parse(params: &TileParams) -> Result<Self> {
        Ok(Self {
            field: params.required_str("geoField")?.to_string(),
        })
    }

    fn tile_bounds(&self, coord: &TileCoord) -> Bounds {
        debug_assert!(u64::from(coord.x()) < coord.dim() && u64::from(coord.y()) < coord.dim());
        let dim = coord.dim() as f64;
        let (x, y) = (u64::from(coord.x()), u64::from(coord.y()));
        Bounds::from_corners(
            Self::lon(x, dim),
            Self::lon(x + 1, dim),
            Self::lat(y + 1, dim),
            Self::lat(y, dim),
        )
    }

    fn bounds_filter(&self, coord: &TileCoord) -> Filter {
        let b = self.tile_bounds(coord);
        Filter::geo_bounding_box(
            &self.field,
            GeoBox {
                top_left: GeoPoint {
                    lat: b.max_y,
                    lon: b.min_x,
                },
                bottom_right: GeoPoint {
                    lat: b.min_y,
                    lon: b.max_x,
                },
            },
        )
    }
}
