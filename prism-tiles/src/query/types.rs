//! Elasticsearch Query DSL filter types
//!
//! The subset of the Query DSL that tile requests send to the backend. Maps
//! are `BTreeMap` so the serialized request body is stable.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A filter clause
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Match all documents
    MatchAll(MatchAllQuery),

    /// Term query (exact match, not analyzed)
    Term(BTreeMap<String, Value>),

    /// Terms query (any of several exact matches)
    Terms(BTreeMap<String, Vec<Value>>),

    /// Range query
    Range(BTreeMap<String, RangeParams>),

    /// Exists query
    Exists(ExistsQuery),

    /// Query string (Lucene syntax)
    QueryString(QueryStringQuery),

    /// Bounding box over a `geo_point` field
    GeoBoundingBox(BTreeMap<String, GeoBox>),

    /// Bool query (must, filter, should, must_not)
    Bool(BoolQuery),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatchAllQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RangeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExistsQuery {
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryStringQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_wildcard: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeoBox {
    pub top_left: GeoPoint,
    pub bottom_right: GeoPoint,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BoolQuery {
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Filter>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Filter>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Filter>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<MinimumShouldMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

/// `minimum_should_match` as a count (`2`, `-1`) or a percentage string (`"75%"`)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MinimumShouldMatch {
    Number(i32),
    Percentage(String),
}

/// Bool clauses accept either a single query or a list
#[derive(Deserialize)]
#[serde(untagged)]
enum QueryList {
    Single(Box<Filter>),
    Multiple(Vec<Filter>),
}

impl QueryList {
    fn into_vec(self) -> Vec<Filter> {
        match self {
            QueryList::Single(q) => vec![*q],
            QueryList::Multiple(v) => v,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Filter>, D::Error>
where
    D: Deserializer<'de>,
{
    QueryList::deserialize(deserializer).map(QueryList::into_vec)
}

impl Filter {
    pub fn match_all() -> Filter {
        Filter::MatchAll(MatchAllQuery::default())
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Term(BTreeMap::from([(field.into(), value.into())]))
    }

    /// Inclusive range `gte <= field <= lte`
    pub fn range_inclusive(field: impl Into<String>, gte: f64, lte: f64) -> Filter {
        let params = RangeParams {
            gte: Some(Value::from(gte)),
            lte: Some(Value::from(lte)),
            ..RangeParams::default()
        };
        Filter::Range(BTreeMap::from([(field.into(), params)]))
    }

    pub fn geo_bounding_box(field: impl Into<String>, bbox: GeoBox) -> Filter {
        Filter::GeoBoundingBox(BTreeMap::from([(field.into(), bbox)]))
    }

    /// Conjunction of `clauses`, kept in the given order
    pub fn must(clauses: Vec<Filter>) -> Filter {
        Filter::Bool(BoolQuery {
            must: clauses,
            ..BoolQuery::default()
        })
    }
}
