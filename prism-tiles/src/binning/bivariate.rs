use super::{lerp, Bounds, SpatialBinner};
use crate::coord::TileCoord;
use crate::error::{Result, TileError};
use crate::params::TileParams;
use crate::query::Filter;

/// Linear binning over two numeric fields.
///
/// The domain `[left, right] x [bottom, top]` is split into `2^zoom` equal
/// columns and rows. Tile `x = 0` starts at `left`, tile `y = 0` at `bottom`.
/// Either axis may be inverted (`left > right`).
#[derive(Debug, Clone, PartialEq)]
pub struct Bivariate {
    pub x_field: String,
    pub y_field: String,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl SpatialBinner for Bivariate {
    fn parse(params: &TileParams) -> Result<Self> {
        let x_field = params.required_str("xField")?.to_string();
        let y_field = params.required_str("yField")?.to_string();
        let left = params.required_f64("left")?;
        let right = params.required_f64("right")?;
        let bottom = params.required_f64("bottom")?;
        let top = params.required_f64("top")?;

        if left == right {
            return Err(TileError::config("`left` and `right` must differ"));
        }
        if bottom == top {
            return Err(TileError::config("`bottom` and `top` must differ"));
        }

        Ok(Self {
            x_field,
            y_field,
            left,
            right,
            bottom,
            top,
        })
    }

    fn tile_bounds(&self, coord: &TileCoord) -> Bounds {
        debug_assert!(u64::from(coord.x()) < coord.dim() && u64::from(coord.y()) < coord.dim());
        let dim = coord.dim() as f64;
        let tx0 = f64::from(coord.x()) / dim;
        let tx1 = f64::from(coord.x() + 1) / dim;
        let ty0 = f64::from(coord.y()) / dim;
        let ty1 = f64::from(coord.y() + 1) / dim;

        Bounds::from_corners(
            lerp(self.left, self.right, tx0),
            lerp(self.left, self.right, tx1),
            lerp(self.bottom, self.top, ty0),
            lerp(self.bottom, self.top, ty1),
        )
    }

    fn bounds_filter(&self, coord: &TileCoord) -> Filter {
        let b = self.tile_bounds(coord);
        Filter::must(vec![
            Filter::range_inclusive(&self.x_field, b.min_x, b.max_x),
            Filter::range_inclusive(&self.y_field, b.min_y, b.max_y),
        ])
    }
}
