mod top_terms;
pub mod types;

pub use top_terms::{TopTerms, DEFAULT_TERMS_COUNT, MAX_TERMS_COUNT, TOP_TERMS_AGG};
pub use types::{
    Aggregation, BucketInfo, SortDirection, TermsAgg, TermsAggregate, TermsBucket,
};
