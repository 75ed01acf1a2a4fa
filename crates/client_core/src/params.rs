//! Search parameter merging and resolution.
//!
//! Precedence, per field: the override value when present, else the held
//! value, else the default (page 1, limit [`DEFAULT_PAGE_SIZE`]). A page or
//! limit of zero counts as absent.

use shared::protocol::{BookSearchParams, SearchRequest};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 12;

pub fn merge_params(current: &BookSearchParams, overrides: &BookSearchParams) -> BookSearchParams {
    BookSearchParams {
        query: overrides.query.clone().or_else(|| current.query.clone()),
        page: positive(overrides.page).or(positive(current.page)),
        limit: positive(overrides.limit).or(positive(current.limit)),
        owner: overrides.owner.clone().or_else(|| current.owner.clone()),
        availability: overrides.availability.or(current.availability),
    }
}

/// Fills in defaults. `default_limit` of zero falls back to [`DEFAULT_PAGE_SIZE`].
pub fn resolve(params: &BookSearchParams, default_limit: u32) -> SearchRequest {
    SearchRequest {
        query: params.query.clone().unwrap_or_default(),
        page: positive(params.page).unwrap_or(DEFAULT_PAGE),
        limit: positive(params.limit)
            .or(positive(Some(default_limit)))
            .unwrap_or(DEFAULT_PAGE_SIZE),
        owner: params.owner.clone().filter(|owner| !owner.is_empty()),
        availability: params.availability,
    }
}

fn positive(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}
