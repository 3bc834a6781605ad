//! Top-term count tiles
//!
//! Builds one map tile at a time: the tile's bounds are turned into a range
//! filter, ANDed with an optional caller query, and sent to an
//! Elasticsearch-compatible backend with a `terms` aggregation. The ranked
//! bucket counts come back as a compact JSON object of term to count.
//!
//! ```no_run
//! # async fn run() -> prism_tiles::Result<()> {
//! use prism_tiles::{ElasticBackend, TileCoord, TileParams, TopTermCountTile};
//! use prism_tiles::config::BackendConfig;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(ElasticBackend::new(&BackendConfig::default())?);
//! let tiles: TopTermCountTile = TopTermCountTile::new(backend);
//! let params = TileParams::from_value(serde_json::json!({
//!     "xField": "pixel.x", "yField": "pixel.y",
//!     "left": 0, "right": 256, "bottom": 0, "top": 256,
//!     "termsField": "country", "termsCount": 5
//! }))?;
//! let bytes = tiles.create("tweets", &TileCoord::new(2, 1, 1)?, &params, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod aggregations;
pub mod backend;
pub mod binning;
pub mod config;
pub mod coord;
pub mod error;
pub mod params;
pub mod payload;
pub mod query;
pub mod tile;

pub use aggregations::TopTerms;
pub use backend::{ElasticBackend, SearchBackend, SearchRequest, SearchResponse};
pub use binning::{Bivariate, GeoTiles, SpatialBinner};
pub use config::TilesConfig;
pub use coord::TileCoord;
pub use error::{Result, Stage, TileError};
pub use params::TileParams;
pub use payload::TilePayload;
pub use query::{Filter, JsonQuery, QueryBuilder};
pub use tile::{TileSpec, TopTermCountTile};
