//! Filter DSL, the caller query capability, and query composition

pub mod builder;
pub mod compose;
pub mod types;

pub use builder::{JsonQuery, QueryBuilder};
pub use compose::compose;
pub use types::{BoolQuery, Filter, GeoBox, GeoPoint, MinimumShouldMatch, RangeParams};
