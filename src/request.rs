//! Page-request ingestion.
//!
//! Turns the query string of a list or export request into a [`PageRequest`] plus
//! the resource's raw [`FilterValues`].
//!
//! | Parameter     | Meaning                                                     |
//! |---------------|-------------------------------------------------------------|
//! | `page`        | 1-based page; unparsable values become `0`                  |
//! | `per_page`    | page size; unparsable values become `0`                     |
//! | `sort_by`     | resource sort key                                           |
//! | `sort_order`  | `ASC` / `DESC`, anything else sorts `DESC`                  |
//! | `search`      | free text                                                   |
//! | `projections` | `|`-separated column aliases                                |
//! | `filter[]`    | JSON array of `{"field", "operator", "value"}` entries      |
//!
//! Every other parameter is a resource filter (`status=active,planned`).
//!
//! In [`IngestionMode::Bounded`] a `per_page` of `0` is rejected before any
//! query runs; [`IngestionMode::Unbounded`] passes it on and lets the executor
//! normalise it.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::ApiError;
use crate::filtering::FilterValues;

const PAGE: &str = "page";
const PER_PAGE: &str = "per_page";
const SORT_BY: &str = "sort_by";
const SORT_ORDER: &str = "sort_order";
const SEARCH: &str = "search";
const PROJECTIONS: &str = "projections";
const FILTER: &str = "filter[]";

/// One structured filter entry from `filter[]`, passed downstream untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterEntry {
    #[serde(alias = "name")]
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub value: Vec<serde_json::Value>,
}

fn default_operator() -> String {
    "eq".to_string()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<serde_json::Value>),
        One(serde_json::Value),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(values) => values,
        OneOrMany::One(serde_json::Value::Null) => Vec::new(),
        OneOrMany::One(value) => vec![value],
    })
}

/// Parsed list parameters. Never mutated after ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    page: i64,
    per_page: i64,
    search: String,
    sort_by: String,
    sort_order: String,
    filters: Vec<FilterEntry>,
    projections: Vec<String>,
}

impl PageRequest {
    #[must_use]
    pub fn builder() -> PageRequestBuilder {
        PageRequestBuilder::default()
    }

    #[must_use]
    pub fn page(&self) -> i64 {
        self.page
    }

    #[must_use]
    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn sort_by(&self) -> &str {
        &self.sort_by
    }

    #[must_use]
    pub fn sort_order(&self) -> &str {
        &self.sort_order
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterEntry] {
        &self.filters
    }

    #[must_use]
    pub fn projections(&self) -> &[String] {
        &self.projections
    }
}

/// Builds a [`PageRequest`] outside of ingestion, e.g. for internal callers and tests.
#[derive(Debug, Clone, Default)]
pub struct PageRequestBuilder {
    inner: PageRequest,
}

impl PageRequestBuilder {
    #[must_use]
    pub fn page(mut self, page: i64) -> Self {
        self.inner.page = page;
        self
    }

    #[must_use]
    pub fn per_page(mut self, per_page: i64) -> Self {
        self.inner.per_page = per_page;
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.inner.search = search.into();
        self
    }

    #[must_use]
    pub fn sort(mut self, sort_by: impl Into<String>, sort_order: impl Into<String>) -> Self {
        self.inner.sort_by = sort_by.into();
        self.inner.sort_order = sort_order.into();
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: Vec<FilterEntry>) -> Self {
        self.inner.filters = filters;
        self
    }

    #[must_use]
    pub fn projections(mut self, projections: Vec<String>) -> Self {
        self.inner.projections = projections;
        self
    }

    #[must_use]
    pub fn build(self) -> PageRequest {
        self.inner
    }
}

/// Whether ingestion rejects `per_page == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionMode {
    Bounded,
    Unbounded,
}

/// Everything a list handler needs from the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub request: PageRequest,
    /// Resource filter values from extra parameters and `filter[]` entries
    pub filter: FilterValues,
}

/// Parses decoded query pairs into [`ListParams`].
///
/// # Errors
///
/// Returns [`ApiError::InvalidParameter`] when `filter[]` is not a JSON array of
/// entries, or when `mode` is bounded and `per_page` is `0`.
pub fn parse_list_params<K, V>(pairs: &[(K, V)], mode: IngestionMode) -> Result<ListParams, ApiError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut request = PageRequest::default();
    let mut filter = FilterValues::new();

    for (key, value) in pairs {
        let value = value.as_ref();
        match key.as_ref() {
            PAGE => request.page = parse_int(value),
            PER_PAGE => request.per_page = parse_int(value),
            SORT_BY => request.sort_by = value.to_string(),
            SORT_ORDER => request.sort_order = value.to_string(),
            SEARCH => request.search = value.to_string(),
            PROJECTIONS => {
                request.projections = value
                    .split('|')
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            FILTER => {
                if !value.trim().is_empty() {
                    request.filters = serde_json::from_str(value).map_err(|err| {
                        tracing::debug!(error = %err, "malformed filter[] parameter");
                        ApiError::invalid_parameter("filter[] must be a JSON array of filter entries")
                    })?;
                }
            }
            other => filter.push(other, value),
        }
    }

    if mode == IngestionMode::Bounded && request.per_page == 0 {
        return Err(ApiError::invalid_parameter("per_page must be greater than zero"));
    }

    filter.extend_from_entries(&request.filters);
    Ok(ListParams { request, filter })
}

/// Decodes a raw `application/x-www-form-urlencoded` query string, then parses it.
///
/// # Errors
///
/// See [`parse_list_params`].
pub fn parse_query_string(query: &str, mode: IngestionMode) -> Result<ListParams, ApiError> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    parse_list_params(&pairs, mode)
}

fn parse_int(value: &str) -> i64 {
    value.trim().parse().unwrap_or(0)
}

/// Extractor that rejects `per_page == 0` with a 400 response.
#[derive(Debug, Clone)]
pub struct BoundedListParams(pub ListParams);

/// Extractor that forwards `per_page` as given; the executor normalises it.
#[derive(Debug, Clone)]
pub struct UnboundedListParams(pub ListParams);

impl<S: Send + Sync> FromRequestParts<S> for BoundedListParams {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_query_string(parts.uri.query().unwrap_or_default(), IngestionMode::Bounded).map(Self)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for UnboundedListParams {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_query_string(parts.uri.query().unwrap_or_default(), IngestionMode::Unbounded).map(Self)
    }
}
