//! Quadtree tile coordinates

use crate::error::{Result, TileError};
use std::fmt;

/// Deepest zoom level whose tile indices still fit in a `u32`
pub const MAX_ZOOM: u8 = 31;

/// A tile in a quadtree pyramid.
///
/// Always satisfies `x, y < 2^zoom`; the only way to build one is
/// [`TileCoord::new`], which enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    zoom: u8,
    x: u32,
    y: u32,
}

impl TileCoord {
    pub fn new(zoom: u8, x: u32, y: u32) -> Result<Self> {
        if zoom > MAX_ZOOM {
            return Err(TileError::config(format!(
                "zoom {} exceeds maximum of {}",
                zoom, MAX_ZOOM
            )));
        }
        let dim = 1u64 << zoom;
        if u64::from(x) >= dim || u64::from(y) >= dim {
            return Err(TileError::config(format!(
                "tile {}/{}/{} out of range, zoom {} has {} tiles per axis",
                zoom, x, y, zoom, dim
            )));
        }
        Ok(Self { zoom, x, y })
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    /// Number of tiles along one axis at this zoom
    pub fn dim(&self) -> u64 {
        1u64 << self.zoom
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}
