//! Raw per-request tile parameters

use crate::error::{Result, TileError};
use serde_json::{Map, Value};

/// Parameter mapping supplied with each tile request.
///
/// Keys the tile core does not know about are left alone; they belong to the
/// caller's base query.
#[derive(Debug, Clone, Default)]
pub struct TileParams {
    inner: Map<String, Value>,
}

impl TileParams {
    pub fn new(inner: Map<String, Value>) -> Self {
        Self { inner }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(inner) => Ok(Self { inner }),
            other => Err(TileError::config(format!(
                "tile parameters must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Required, non-empty string
    pub fn required_str(&self, key: &str) -> Result<&str> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Err(missing(key)),
            Some(Value::String(s)) if s.trim().is_empty() => Err(TileError::config(format!(
                "`{}` parameter must not be empty",
                key
            ))),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(wrong_type(key, "a string", other)),
        }
    }

    pub fn required_f64(&self, key: &str) -> Result<f64> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Err(missing(key)),
            Some(Value::Number(n)) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| TileError::config(format!("`{}` parameter is not finite", key))),
            Some(other) => Err(wrong_type(key, "a number", other)),
        }
    }

    /// Optional strictly positive integer; whole floats such as `5.0` are accepted
    pub fn optional_positive_int(&self, key: &str) -> Result<Option<u64>> {
        let n = match self.inner.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => n,
            Some(other) => return Err(wrong_type(key, "a positive integer", other)),
        };

        let value = if let Some(v) = n.as_u64() {
            v
        } else {
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 => f as u64,
                _ => {
                    return Err(TileError::config(format!(
                        "`{}` parameter must be a positive integer, got {}",
                        key, n
                    )))
                }
            }
        };

        if value == 0 {
            return Err(TileError::config(format!(
                "`{}` parameter must be a positive integer, got 0",
                key
            )));
        }
        Ok(Some(value))
    }
}

impl From<Map<String, Value>> for TileParams {
    fn from(inner: Map<String, Value>) -> Self {
        Self::new(inner)
    }
}

fn missing(key: &str) -> TileError {
    TileError::config(format!("`{}` parameter missing from tile", key))
}

fn wrong_type(key: &str, expected: &str, got: &Value) -> TileError {
    TileError::config(format!(
        "`{}` parameter must be {}, got {}",
        key,
        expected,
        json_type(got)
    ))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
