//! Top-terms aggregation descriptor

use crate::aggregations::types::{
    Aggregation, BucketInfo, SortDirection, TermsAgg, TermsAggregate,
};
use crate::error::{Result, TileError};
use crate::params::TileParams;
use crate::query::Filter;
use serde_json::{Map, Value};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the terms aggregation in requests and responses
pub const TOP_TERMS_AGG: &str = "top-terms";

pub const DEFAULT_TERMS_COUNT: usize = 10;

/// Largest `termsCount` accepted, matching the backend's default bucket limit
pub const MAX_TERMS_COUNT: usize = 10_000;

/// Describes a "top N terms of a field" aggregation and reads its result.
///
/// The aggregation can sit below caller-imposed `filter` parents; extraction
/// walks the same path the request was built with. Parents can only narrow
/// the request query, so the counts always stay inside the tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TopTerms {
    pub field: String,
    pub count: usize,
    /// Parent filter aggregations, outermost first
    parents: Vec<(String, Filter)>,
}

impl TopTerms {
    pub fn new(field: impl Into<String>, count: usize) -> Self {
        Self {
            field: field.into(),
            count,
            parents: Vec::new(),
        }
    }

    /// Read `termsField` (required) and `termsCount` (optional) from the tile parameters
    pub fn parse(params: &TileParams) -> Result<Self> {
        let field = params.required_str("termsField")?;
        let count = match params.optional_positive_int("termsCount")? {
            None => DEFAULT_TERMS_COUNT,
            Some(n) if n > MAX_TERMS_COUNT as u64 => {
                return Err(TileError::config(format!(
                    "`termsCount` parameter must not exceed {}, got {}",
                    MAX_TERMS_COUNT, n
                )))
            }
            Some(n) => n as usize,
        };
        Ok(Self::new(field, count))
    }

    /// Wrap the aggregation in a `filter` parent.
    ///
    /// Each call adds a new outermost level, so the last parent given is the
    /// one that appears at the top of the request.
    pub fn nested_under(mut self, name: impl Into<String>, filter: Filter) -> Self {
        self.parents.insert(0, (name.into(), filter));
        self
    }

    /// Aggregation names from the top of the response down to the terms leaf
    pub fn path(&self) -> Vec<&str> {
        self.parents
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(std::iter::once(TOP_TERMS_AGG))
            .collect()
    }

    /// The leaf terms aggregation: top `count` by document count, ties by term
    pub fn terms_agg(&self) -> TermsAgg {
        TermsAgg {
            field: self.field.clone(),
            size: Some(self.count),
            order: vec![
                BTreeMap::from([("_count".to_string(), SortDirection::Desc)]),
                BTreeMap::from([("_key".to_string(), SortDirection::Asc)]),
            ],
            min_doc_count: None,
        }
    }

    /// The top-level aggregation name and the full (possibly nested) tree
    pub fn aggregation_request(&self) -> (String, Aggregation) {
        let leaf = (TOP_TERMS_AGG.to_string(), Aggregation::terms(self.terms_agg()));
        self.parents
            .iter()
            .rev()
            .fold(leaf, |(child_name, child), (name, filter)| {
                let parent = Aggregation::filter(filter.clone());
                (name.clone(), parent.with_sub(child_name, child))
            })
    }

    /// Pull the term buckets out of a response's `aggregations` object.
    ///
    /// A missing aggregation at any level of the path is an error; a present
    /// aggregation with no buckets is an empty map.
    pub fn extract_terms(&self, aggregations: &Map<String, Value>) -> Result<BTreeMap<String, BucketInfo>> {
        let mut level = aggregations;
        for (name, _) in &self.parents {
            level = level
                .get(name)
                .and_then(Value::as_object)
                .ok_or_else(|| not_found(name))?;
        }

        let raw = level.get(TOP_TERMS_AGG).ok_or_else(|| not_found(TOP_TERMS_AGG))?;
        let aggregate: TermsAggregate = serde_json::from_value(raw.clone()).map_err(|e| {
            TileError::shape(format!(
                "aggregation `{}` is not a terms aggregation: {}",
                TOP_TERMS_AGG, e
            ))
        })?;

        let mut terms = BTreeMap::new();
        for bucket in aggregate.buckets {
            let Some(term) = bucket.term()? else {
                continue;
            };
            match terms.entry(term) {
                Entry::Vacant(slot) => {
                    slot.insert(BucketInfo {
                        doc_count: bucket.doc_count,
                    });
                }
                Entry::Occupied(slot) => {
                    return Err(TileError::shape(format!(
                        "duplicate term `{}` in aggregation `{}`",
                        slot.key(),
                        TOP_TERMS_AGG
                    )));
                }
            }
        }

        debug!(
            aggregation = TOP_TERMS_AGG,
            buckets = terms.len(),
            sum_other_doc_count = aggregate.sum_other_doc_count.unwrap_or(0),
            "extracted terms"
        );
        Ok(terms)
    }

    /// Order terms by count descending, then term ascending, keeping at most `count`
    pub fn rank(&self, terms: BTreeMap<String, BucketInfo>) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = terms
            .into_iter()
            .map(|(term, info)| (term, info.doc_count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.count);
        ranked
    }
}

fn not_found(name: &str) -> TileError {
    TileError::shape(format!("aggregation `{}` was not found in response", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use serde_json::json;

    fn aggs(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_parse_defaults_count() {
        let params = TileParams::from_value(json!({"termsField": "hashtags"})).unwrap();
        let t = TopTerms::parse(&params).unwrap();
        assert_eq!(t.field, "hashtags");
        assert_eq!(t.count, DEFAULT_TERMS_COUNT);
        assert_eq!(t.path(), vec![TOP_TERMS_AGG]);
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            json!({}),
            json!({"termsField": ""}),
            json!({"termsField": "tag", "termsCount": 0}),
            json!({"termsField": "tag", "termsCount": -1}),
            json!({"termsField": "tag", "termsCount": 10_001}),
        ] {
            let params = TileParams::from_value(bad.clone()).unwrap();
            let err = TopTerms::parse(&params).unwrap_err();
            assert_eq!(err.stage(), Stage::Config, "params {} should fail", bad);
        }
    }

    #[test]
    fn test_aggregation_request() {
        let (name, agg) = TopTerms::new("country", 2).aggregation_request();
        assert_eq!(name, "top-terms");
        assert_eq!(
            serde_json::to_value(&agg).unwrap(),
            json!({"terms": {
                "field": "country",
                "size": 2,
                "order": [{"_count": "desc"}, {"_key": "asc"}]
            }})
        );
    }

    #[test]
    fn test_nested_aggregation_request() {
        let t = TopTerms::new("country", 3)
            .nested_under("english", Filter::term("lang", "en"))
            .nested_under("recent", Filter::range_inclusive("year", 2020.0, 2024.0));
        assert_eq!(t.path(), vec!["recent", "english", "top-terms"]);

        let (name, agg) = t.aggregation_request();
        assert_eq!(name, "recent");
        let v = serde_json::to_value(&agg).unwrap();
        assert_eq!(
            v["filter"],
            json!({"range": {"year": {"gte": 2020.0, "lte": 2024.0}}})
        );
        assert_eq!(v["aggs"]["english"]["filter"], json!({"term": {"lang": "en"}}));
        assert_eq!(
            v["aggs"]["english"]["aggs"]["top-terms"]["terms"]["field"],
            json!("country")
        );
    }

    #[test]
    fn test_extract_terms() {
        let t = TopTerms::new("country", 10);
        let terms = t
            .extract_terms(&aggs(json!({"top-terms": {
                "doc_count_error_upper_bound": 0,
                "sum_other_doc_count": 7,
                "buckets": [
                    {"key": "US", "doc_count": 120},
                    {"key": "FR", "doc_count": 45}
                ]
            }})))
            .unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms["US"].doc_count, 120);
        assert_eq!(terms["FR"].doc_count, 45);
    }

    #[test]
    fn test_extract_empty_buckets() {
        let t = TopTerms::new("country", 10);
        let terms = t.extract_terms(&aggs(json!({"top-terms": {"buckets": []}}))).unwrap();
        assert!(terms.is_empty());
    }

    #[test]
    fn test_extract_missing_aggregation() {
        let t = TopTerms::new("country", 10);
        let err = t.extract_terms(&Map::new()).unwrap_err();
        assert_eq!(err.stage(), Stage::ResponseShape);
        assert!(err.to_string().contains("top-terms"));
    }

    #[test]
    fn test_extract_not_a_terms_aggregate() {
        let t = TopTerms::new("country", 10);
        let err = t
            .extract_terms(&aggs(json!({"top-terms": {"value": 3.0}})))
            .unwrap_err();
        assert_eq!(err.stage(), Stage::ResponseShape);
    }

    #[test]
    fn test_extract_duplicate_term() {
        let t = TopTerms::new("code", 10);
        let err = t
            .extract_terms(&aggs(json!({"top-terms": {"buckets": [
                {"key": 7, "doc_count": 1},
                {"key": "7", "doc_count": 2}
            ]}})))
            .unwrap_err();
        assert_eq!(err.stage(), Stage::ResponseShape);
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_extract_skips_null_keys_and_stringifies_numbers() {
        let t = TopTerms::new("code", 10);
        let terms = t
            .extract_terms(&aggs(json!({"top-terms": {"buckets": [
                {"key": 404, "doc_count": 9},
                {"key": null, "doc_count": 50}
            ]}})))
            .unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms["404"].doc_count, 9);
    }

    #[test]
    fn test_extract_nested() {
        let t = TopTerms::new("country", 10)
            .nested_under("english", Filter::term("lang", "en"));
        let terms = t
            .extract_terms(&aggs(json!({"english": {
                "doc_count": 12,
                "top-terms": {"buckets": [{"key": "CA", "doc_count": 12}]}
            }})))
            .unwrap();
        assert_eq!(terms["CA"].doc_count, 12);

        // the leaf alone at the top level is not where this descriptor looks
        let err = t
            .extract_terms(&aggs(json!({"top-terms": {"buckets": []}})))
            .unwrap_err();
        assert!(err.to_string().contains("english"));
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let t = TopTerms::new("country", 3);
        let terms = BTreeMap::from([
            ("DE".to_string(), BucketInfo { doc_count: 40 }),
            ("US".to_string(), BucketInfo { doc_count: 120 }),
            ("BE".to_string(), BucketInfo { doc_count: 40 }),
            ("FR".to_string(), BucketInfo { doc_count: 45 }),
        ]);
        assert_eq!(
            t.rank(terms),
            vec![
                ("US".to_string(), 120),
                ("FR".to_string(), 45),
                ("BE".to_string(), 40),
            ]
        );
    }
}
