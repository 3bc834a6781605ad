//! Aggregation request and response fragments

use crate::error::{Result, TileError};
use crate::query::Filter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One named entry of a search request's `aggs` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Aggregation {
    // Bucket aggregations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<TermsAgg>,

    // Single-bucket parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    // Nested aggregations
    #[serde(default, alias = "aggregations", skip_serializing_if = "Option::is_none")]
    pub aggs: Option<BTreeMap<String, Aggregation>>,
}

impl Aggregation {
    pub fn terms(terms: TermsAgg) -> Self {
        Self {
            terms: Some(terms),
            ..Self::default()
        }
    }

    pub fn filter(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    /// Attach a sub-aggregation, replacing any previous one with the same name
    pub fn with_sub(mut self, name: impl Into<String>, sub: Aggregation) -> Self {
        self.aggs
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), sub);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TermsAgg {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<BTreeMap<String, SortDirection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A terms aggregation as it appears in a search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TermsAggregate {
    pub buckets: Vec<TermsBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_other_doc_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_count_error_upper_bound: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TermsBucket {
    pub key: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
}

impl TermsBucket {
    /// The bucket's term as a string.
    ///
    /// Prefers `key_as_string`; numeric and boolean keys are stringified.
    /// A `null` key (documents without a value) yields `None`.
    pub fn term(&self) -> Result<Option<String>> {
        if let Some(s) = &self.key_as_string {
            return Ok(Some(s.clone()));
        }
        match &self.key {
            Value::String(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::Null => Ok(None),
            other => Err(TileError::shape(format!(
                "terms bucket key must be a scalar, got {}",
                other
            ))),
        }
    }
}

/// Per-term bucket metadata kept after extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketInfo {
    pub doc_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_nested_request() {
        let leaf = Aggregation::terms(TermsAgg {
            field: "country".into(),
            size: Some(5),
            order: vec![BTreeMap::from([("_count".to_string(), SortDirection::Desc)])],
            min_doc_count: None,
        });
        let agg = Aggregation::filter(Filter::term("lang", "en")).with_sub("top-terms", leaf);
        assert_eq!(
            serde_json::to_value(&agg).unwrap(),
            json!({
                "filter": {"term": {"lang": "en"}},
                "aggs": {"top-terms": {"terms": {
                    "field": "country", "size": 5, "order": [{"_count": "desc"}]
                }}}
            })
        );
    }

    #[test]
    fn test_deserialize_aggregations_alias() {
        let agg: Aggregation = serde_json::from_value(json!({
            "filter": {"exists": {"field": "tag"}},
            "aggregations": {"inner": {"terms": {"field": "tag"}}}
        }))
        .unwrap();
        assert!(agg.filter.is_some());
        assert!(agg.aggs.unwrap().contains_key("inner"));
    }

    #[test]
    fn test_bucket_term_stringification() {
        let b: TermsBucket = serde_json::from_value(json!({"key": "US", "doc_count": 1})).unwrap();
        assert_eq!(b.term().unwrap().as_deref(), Some("US"));

        let b: TermsBucket = serde_json::from_value(json!({"key": 42, "doc_count": 1})).unwrap();
        assert_eq!(b.term().unwrap().as_deref(), Some("42"));

        let b: TermsBucket = serde_json::from_value(json!({"key": 2.5, "doc_count": 1})).unwrap();
        assert_eq!(b.term().unwrap().as_deref(), Some("2.5"));

        let b: TermsBucket = serde_json::from_value(json!({
            "key": 1, "key_as_string": "true", "doc_count": 1
        }))
        .unwrap();
        assert_eq!(b.term().unwrap().as_deref(), Some("true"));

        let b: TermsBucket = serde_json::from_value(json!({"key": false, "doc_count": 1})).unwrap();
        assert_eq!(b.term().unwrap().as_deref(), Some("false"));

        let b: TermsBucket = serde_json::from_value(json!({"key": null, "doc_count": 1})).unwrap();
        assert_eq!(b.term().unwrap(), None);

        let b: TermsBucket =
            serde_json::from_value(json!({"key": ["a"], "doc_count": 1})).unwrap();
        assert!(b.term().is_err());
    }
}
