use crate::query::types::Filter;

/// Combine the caller's base filter with a tile's spatial filter.
///
/// With no base filter the spatial clause is returned as is. Otherwise both
/// become `must` clauses of one bool query, base first.
pub fn compose(base: Option<Filter>, spatial: Filter) -> Filter {
    match base {
        None => spatial,
        Some(base) => Filter::must(vec![base, spatial]),
    }
}
