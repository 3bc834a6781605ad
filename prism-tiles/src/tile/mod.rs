//! Top-term count tile generation
//!
//! [`TopTermCountTile`] runs one tile request end to end:
//!
//! 1. parse the spatial binning and top-terms configuration
//! 2. build the caller's base query and AND it with the tile bounds
//! 3. attach the top-terms aggregation, asking for zero hits
//! 4. send the request to the [`SearchBackend`]
//! 5. extract and rank the term buckets
//! 6. encode the ranked counts as a [`TilePayload`]
//!
//! Any failure ends the call; no partial tile is returned.

mod metrics;

use crate::aggregations::TopTerms;
use crate::backend::{SearchBackend, SearchRequest};
use crate::binning::{Bivariate, SpatialBinner};
use crate::coord::TileCoord;
use crate::error::{Result, TileError};
use crate::params::TileParams;
use crate::payload::TilePayload;
use crate::query::{compose, Filter, QueryBuilder};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Parsed per-request configuration: where the tile is and what to count
#[derive(Debug, Clone)]
pub struct TileSpec<B> {
    pub binner: B,
    pub terms: TopTerms,
}

impl<B: SpatialBinner> TileSpec<B> {
    /// Read the binning and top-terms configuration; the first failure wins
    pub fn parse(params: &TileParams) -> Result<Self> {
        let binner = B::parse(params)?;
        let terms = TopTerms::parse(params)?;
        Ok(Self { binner, terms })
    }

    /// Compose the query for `coord` and wrap it with the aggregation
    pub fn search_request(
        &self,
        coord: &TileCoord,
        base: Option<&dyn QueryBuilder>,
    ) -> Result<SearchRequest> {
        let base = base.map(|q| q.build()).transpose()?;
        let query = compose(base, self.binner.bounds_filter(coord));
        let (name, aggregation) = self.terms.aggregation_request();

        Ok(SearchRequest {
            query,
            aggregations: BTreeMap::from([(name, aggregation)]),
            size: 0,
        })
    }
}

/// Generates top-term count tiles against a search backend.
///
/// Holds no per-request state, so one instance can serve any number of
/// concurrent tile requests.
pub struct TopTermCountTile<B = Bivariate> {
    backend: Arc<dyn SearchBackend>,
    parents: Vec<(String, Filter)>,
    _binner: PhantomData<fn() -> B>,
}

impl<B: SpatialBinner> TopTermCountTile<B> {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            parents: Vec::new(),
            _binner: PhantomData,
        }
    }

    /// Nest the top-terms aggregation under a `filter` parent on every request
    pub fn nested_under(mut self, name: impl Into<String>, filter: Filter) -> Self {
        self.parents.push((name.into(), filter));
        self
    }

    /// Validate the tile parameters into a [`TileSpec`] carrying this
    /// generator's aggregation path
    pub fn parse(&self, params: &TileParams) -> Result<TileSpec<B>> {
        let spec = TileSpec::<B>::parse(params)?;
        let terms = self
            .parents
            .iter()
            .fold(spec.terms, |terms, (name, filter)| {
                terms.nested_under(name.clone(), filter.clone())
            });
        Ok(TileSpec {
            binner: spec.binner,
            terms,
        })
    }

    /// Parse and compose without contacting the backend
    pub fn prepare(
        &self,
        coord: &TileCoord,
        params: &TileParams,
        base: Option<&dyn QueryBuilder>,
    ) -> Result<(TileSpec<B>, SearchRequest)> {
        let spec = self.parse(params)?;
        let request = spec.search_request(coord, base)?;
        Ok((spec, request))
    }

    /// Generate the ranked term counts for one tile
    #[instrument(
        skip_all,
        fields(index = %index, tile = %coord, backend = self.backend.backend_name())
    )]
    pub async fn generate(
        &self,
        index: &str,
        coord: &TileCoord,
        params: &TileParams,
        base: Option<&dyn QueryBuilder>,
    ) -> Result<TilePayload> {
        let start = Instant::now();
        let result = self.run(index, coord, params, base).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(payload) => {
                metrics::record_tile_success(elapsed, payload.len());
                debug!(
                    terms = payload.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "tile generated"
                );
            }
            Err(e) => {
                metrics::record_tile_error(e.stage(), elapsed);
                warn!(stage = %e.stage(), error = %e, "tile generation failed");
            }
        }
        result
    }

    /// Generate one tile and encode it
    pub async fn create(
        &self,
        index: &str,
        coord: &TileCoord,
        params: &TileParams,
        base: Option<&dyn QueryBuilder>,
    ) -> Result<Vec<u8>> {
        self.generate(index, coord, params, base).await?.encode()
    }

    async fn run(
        &self,
        index: &str,
        coord: &TileCoord,
        params: &TileParams,
        base: Option<&dyn QueryBuilder>,
    ) -> Result<TilePayload> {
        validate_index(index)?;
        let (spec, request) = self.prepare(coord, params, base)?;

        let response = self.backend.search(index, &request).await?;

        let terms = spec.terms.extract_terms(&response.aggregations)?;
        TilePayload::from_ranked(spec.terms.rank(terms))
    }
}

const MAX_INDEX_BYTES: usize = 255;
const INDEX_FORBIDDEN: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ':'];

/// Reject names Elasticsearch would refuse as an index
fn validate_index(index: &str) -> Result<()> {
    let invalid = |why: &str| TileError::config(format!("invalid index name `{}`: {}", index, why));

    if index.is_empty() {
        return Err(TileError::config("index name must not be empty"));
    }
    if index == "." || index == ".." {
        return Err(invalid("must not be `.` or `..`"));
    }
    if index.len() > MAX_INDEX_BYTES {
        return Err(invalid("longer than 255 bytes"));
    }
    if index.starts_with(['-', '_', '+']) {
        return Err(invalid("must not start with '-', '_' or '+'"));
    }
    if index.chars().any(char::is_uppercase) {
        return Err(invalid("must be lowercase"));
    }
    if let Some(c) = index
        .chars()
        .find(|c| c.is_whitespace() || INDEX_FORBIDDEN.contains(c))
    {
        return Err(invalid(&format!("contains {:?}", c)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SearchResponse;
    use crate::binning::GeoTiles;
    use crate::error::Stage;
    use crate::query::{Filter, JsonQuery};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    /// Answers every search with a fixed `aggregations` object
    struct FixedBackend {
        aggregations: Value,
    }

    #[async_trait]
    impl SearchBackend for FixedBackend {
        async fn search(&self, _index: &str, _request: &SearchRequest) -> Result<SearchResponse> {
            Ok(SearchResponse {
                aggregations: self.aggregations.as_object().cloned().unwrap_or_default(),
                ..SearchResponse::default()
            })
        }

        fn backend_name(&self) -> &str {
            "fixed"
        }
    }

    fn tile(aggregations: Value) -> TopTermCountTile {
        TopTermCountTile::new(Arc::new(FixedBackend { aggregations }))
    }

    fn params(v: Value) -> TileParams {
        TileParams::from_value(v).unwrap()
    }

    fn bivariate_params() -> Value {
        json!({
            "xField": "x", "yField": "y",
            "left": 0, "right": 100, "bottom": 0, "top": 100,
            "termsField": "country", "termsCount": 2
        })
    }

    #[test]
    fn test_prepare_without_base() {
        let t = tile(json!({}));
        let coord = TileCoord::new(1, 0, 1).unwrap();
        let (spec, request) = t.prepare(&coord, &params(bivariate_params()), None).unwrap();

        assert_eq!(request.size, 0);
        assert_eq!(request.query, spec.binner.bounds_filter(&coord));
        assert_eq!(
            serde_json::to_value(&request).unwrap()["aggs"]["top-terms"]["terms"]["size"],
            json!(2)
        );
    }

    #[test]
    fn test_prepare_with_base() {
        let t = tile(json!({}));
        let coord = TileCoord::new(0, 0, 0).unwrap();
        let base = Filter::term("lang", "en");
        let (_, request) = t
            .prepare(&coord, &params(bivariate_params()), Some(&base))
            .unwrap();

        match request.query {
            Filter::Bool(b) => {
                assert_eq!(b.must.len(), 2);
                assert_eq!(b.must[0], base);
            }
            other => panic!("Expected Bool, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_nested_path() {
        let t = tile(json!({})).nested_under("english", Filter::term("lang", "en"));
        let coord = TileCoord::new(0, 0, 0).unwrap();
        let (spec, request) = t.prepare(&coord, &params(bivariate_params()), None).unwrap();

        assert_eq!(spec.terms.path(), vec!["english", "top-terms"]);
        assert!(request.aggregations.contains_key("english"));
    }

    #[test]
    fn test_prepare_geo_binning() {
        let t: TopTermCountTile<GeoTiles> =
            TopTermCountTile::new(Arc::new(FixedBackend { aggregations: json!({}) }));
        let coord = TileCoord::new(3, 2, 5).unwrap();
        let (_, request) = t
            .prepare(
                &coord,
                &params(json!({"geoField": "location", "termsField": "hashtags"})),
                None,
            )
            .unwrap();
        assert!(matches!(request.query, Filter::GeoBoundingBox(_)));
    }

    #[test]
    fn test_parse_failure_is_config_error() {
        let t = tile(json!({}));
        let coord = TileCoord::new(0, 0, 0).unwrap();
        let mut p = bivariate_params();
        p.as_object_mut().unwrap().remove("termsField");

        let err = t.prepare(&coord, &params(p), None).unwrap_err();
        assert_eq!(err.stage(), Stage::Config);
    }

    #[test]
    fn test_base_query_failure_propagates() {
        let t = tile(json!({}));
        let coord = TileCoord::new(0, 0, 0).unwrap();
        let base = JsonQuery::new(json!({"bogus": true}));

        let err = t
            .prepare(&coord, &params(bivariate_params()), Some(&base))
            .unwrap_err();
        assert_eq!(err.stage(), Stage::QueryBuild);
    }

    #[test]
    fn test_validate_index() {
        for ok in ["tweets", "logs-2024.01", ".hidden", "a_b+c", "tw\u{e9}ets"] {
            assert!(validate_index(ok).is_ok(), "{}", ok);
        }

        let too_long = "a".repeat(256);
        let rejected = [
            "", ".", "..", "a/b", "../_cluster", "tweets?q=x", "tweets#top", "Tweets", "a b",
            "a\tb", " tweets", "-tweets", "_all", "+x", "a*", "a,b", "a:b", "a\\b", "a|b",
            "a<b", "a>b", "a\"b", too_long.as_str(),
        ];
        for bad in rejected {
            let err = validate_index(bad).unwrap_err();
            assert_eq!(err.stage(), Stage::Config, "{:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_create_top_two() {
        let t = tile(json!({"top-terms": {"buckets": [
            {"key": "US", "doc_count": 120},
            {"key": "FR", "doc_count": 45},
            {"key": "DE", "doc_count": 40}
        ]}}));
        let coord = TileCoord::new(2, 1, 1).unwrap();
        let bytes = t
            .create("tweets", &coord, &params(bivariate_params()), None)
            .await
            .unwrap();
        assert_eq!(bytes, br#"{"US":120,"FR":45}"#.to_vec());
    }

    #[tokio::test]
    async fn test_create_missing_aggregation() {
        let t = tile(json!({"other": {"buckets": []}}));
        let coord = TileCoord::new(0, 0, 0).unwrap();
        let err = t
            .create("tweets", &coord, &params(bivariate_params()), None)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::ResponseShape);
    }
}
