//! Caller-supplied base query capability

use crate::error::{Result, TileError};
use crate::params::TileParams;
use crate::query::types::Filter;
use serde_json::Value;

/// Anything that can produce the caller's base filter.
///
/// The tile core only ever calls [`QueryBuilder::build`]; it never looks at
/// which kind of query it got back.
pub trait QueryBuilder: Send + Sync {
    fn build(&self) -> Result<Filter>;
}

impl QueryBuilder for Filter {
    fn build(&self) -> Result<Filter> {
        Ok(self.clone())
    }
}

/// A base query given as raw Query DSL JSON, validated when built
#[derive(Debug, Clone)]
pub struct JsonQuery {
    raw: Value,
}

impl JsonQuery {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Read the query DSL stored under `key`, if the parameters carry one
    pub fn from_params(params: &TileParams, key: &str) -> Option<Self> {
        match params.get(key) {
            None | Some(Value::Null) => None,
            Some(raw) => Some(Self::new(raw.clone())),
        }
    }
}

impl QueryBuilder for JsonQuery {
    fn build(&self) -> Result<Filter> {
        serde_json::from_value(self.raw.clone())
            .map_err(|e| TileError::QueryBuild(format!("invalid query DSL: {}", e)))
    }
}
