//! # Pagination executor
//!
//! Every list endpoint funnels through [`paginate`]:
//!
//! 1. relevance search from `request.search` (first `ORDER BY` key)
//! 2. the resource's structured filters
//! 3. the caller's sort, resolved against [`SortOptions`] (secondary `ORDER BY`)
//! 4. `SELECT COUNT(*)` over the predicates alone
//! 5. page normalisation (`page >= 1`, `1 <= per_page <= max_per_page`)
//! 6. `LIMIT per_page OFFSET (page - 1) * per_page` and the row fetch
//!
//! Steps 1-3 never fail; bad input degrades to defaults. The count and the fetch
//! surface their database error unchanged and no partial page is ever returned.
//! Dropping the returned future cancels whichever statement is in flight.

use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, FromQueryResult, QuerySelect, Select,
    sea_query::Expr,
};
use serde::Serialize;

use crate::config::Settings;
use crate::filtering::{FilterDescriptor, FilterValues};
use crate::identifier::is_safe_identifier;
use crate::query::ListQuery;
use crate::request::PageRequest;
use crate::search::{DEFAULT_SIMILARITY_THRESHOLD, SearchDescriptor, apply_search, effective_threshold};
use crate::sort::{SortOptions, export_sort, resolve_sort};

/// Page size used when the caller asks for less than one row.
pub const DEFAULT_PER_PAGE: u64 = 10;

/// Per-call executor settings.
#[derive(Debug, Clone, Copy)]
pub struct PaginationConfig<'a> {
    pub sort: SortOptions<'a>,
    /// Upper bound for `per_page`; `0` disables the bound
    pub max_per_page: u64,
    /// Used when the search descriptor has no override
    pub similarity_threshold: f64,
}

impl Default for PaginationConfig<'_> {
    fn default() -> Self {
        Self {
            sort: SortOptions::default(),
            max_per_page: 0,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl<'a> PaginationConfig<'a> {
    #[must_use]
    pub fn new(sort: SortOptions<'a>) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    /// Takes the global threshold and page-size cap from `settings`
    #[must_use]
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.max_per_page = settings.max_per_page;
        self.similarity_threshold = settings.similarity_threshold;
        self
    }

    #[must_use]
    pub fn with_max_per_page(mut self, max_per_page: u64) -> Self {
        self.max_per_page = max_per_page;
        self
    }
}

/// One page of rows plus the row count before pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<M> {
    pub rows: Vec<M>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<M> Page<M> {
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.per_page.max(1))
    }
}

/// Clamps the requested page window: `page < 1` becomes `1`, `per_page < 1` becomes
/// [`DEFAULT_PER_PAGE`], and `per_page` is capped at `max_per_page` when that is non-zero.
#[must_use]
pub fn normalise_pagination(page: i64, per_page: i64, max_per_page: u64) -> (u64, u64) {
    let page = u64::try_from(page).ok().filter(|p| *p >= 1).unwrap_or(1);
    let mut per_page = u64::try_from(per_page)
        .ok()
        .filter(|p| *p >= 1)
        .unwrap_or(DEFAULT_PER_PAGE);
    if max_per_page > 0 && per_page > max_per_page {
        per_page = max_per_page;
    }
    (page, per_page)
}

/// Applies search, filters and sort to `query` without touching the database.
#[must_use]
pub fn compose<E, D>(
    query: ListQuery<E>,
    descriptor: &D,
    request: &PageRequest,
    filters: &FilterValues,
    config: &PaginationConfig<'_>,
) -> ListQuery<E>
where
    E: EntityTrait,
    D: SearchDescriptor + FilterDescriptor,
{
    let threshold = effective_threshold(descriptor, config.similarity_threshold);
    let query = apply_search(query, request.search(), descriptor, threshold);
    let query = descriptor.apply_filters(query, filters);
    let sort = resolve_sort(request.sort_by(), request.sort_order(), &config.sort);
    query.order_by_sort(&sort)
}

/// Composes the listing, counts it, and fetches one page as `M`.
///
/// # Errors
///
/// Returns the `DbErr` from the count or the fetch, whichever fails first.
pub async fn paginate<E, D, M, C>(
    db: &C,
    query: ListQuery<E>,
    descriptor: &D,
    request: &PageRequest,
    filters: &FilterValues,
    config: &PaginationConfig<'_>,
) -> Result<Page<M>, DbErr>
where
    E: EntityTrait,
    E::Model: Sync,
    D: SearchDescriptor + FilterDescriptor,
    M: FromQueryResult + Sized + Send + Sync,
    C: ConnectionTrait,
{
    let query = compose(query, descriptor, request, filters, config);
    execute(db, query, request, config).await
}

/// Like [`paginate`], but returns only the requested projections as JSON objects.
///
/// Aliases are resolved through `projection`; unknown ones are dropped. When none
/// survive, every entity column is returned.
///
/// # Errors
///
/// Returns the `DbErr` from the count or the fetch, whichever fails first.
pub async fn paginate_projected<E, D, C>(
    db: &C,
    query: ListQuery<E>,
    descriptor: &D,
    request: &PageRequest,
    filters: &FilterValues,
    config: &PaginationConfig<'_>,
    projection: fn(&str) -> Option<&'static str>,
) -> Result<Page<serde_json::Value>, DbErr>
where
    E: EntityTrait,
    E::Model: Sync,
    D: SearchDescriptor + FilterDescriptor,
    C: ConnectionTrait,
{
    let query = compose(query, descriptor, request, filters, config);
    let query = project(query, request.projections(), projection);
    execute(db, query, request, config).await
}

/// Restricts the select list to the resolved projections.
#[must_use]
pub fn project<E: EntityTrait>(
    query: ListQuery<E>,
    aliases: &[String],
    projection: fn(&str) -> Option<&'static str>,
) -> ListQuery<E> {
    let columns: Vec<(&str, &'static str)> = aliases
        .iter()
        .filter(|alias| is_safe_identifier(alias))
        .filter_map(|alias| projection(alias).map(|column| (alias.as_str(), column)))
        .filter(|(_, column)| is_safe_identifier(column))
        .collect();
    if columns.is_empty() {
        return query;
    }

    query.map_select(|select| {
        columns
            .into_iter()
            .fold(select.select_only(), |select, (alias, column)| {
                select.column_as(Expr::cust(column), alias)
            })
    })
}

async fn execute<E, M, C>(
    db: &C,
    query: ListQuery<E>,
    request: &PageRequest,
    config: &PaginationConfig<'_>,
) -> Result<Page<M>, DbErr>
where
    E: EntityTrait,
    E::Model: Sync,
    M: FromQueryResult + Sized + Send + Sync,
    C: ConnectionTrait,
{
    let total = query.count(db).await.inspect_err(|err| {
        tracing::warn!(error = %err, "list count failed");
    })?;

    let (page, per_page) =
        normalise_pagination(request.page(), request.per_page(), config.max_per_page);
    let offset = (page - 1).saturating_mul(per_page);

    let rows = query
        .fetch_page::<M, C>(db, per_page, offset)
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "list fetch failed"))?;

    tracing::debug!(total, page, per_page, rows = rows.len(), "list page fetched");

    Ok(Page {
        rows,
        total,
        page,
        per_page,
    })
}

/// Applies search, filters and the export sort, returning an ordered select with no
/// page window for streaming every matching row.
#[must_use]
pub fn compose_export<E, D>(
    query: ListQuery<E>,
    descriptor: &D,
    search: &str,
    filters: &FilterValues,
    sort_by: Option<&str>,
    sort_order: Option<&str>,
    config: &PaginationConfig<'_>,
) -> Select<E>
where
    E: EntityTrait,
    D: SearchDescriptor + FilterDescriptor,
{
    let threshold = effective_threshold(descriptor, config.similarity_threshold);
    let query = apply_search(query, search, descriptor, threshold);
    let query = descriptor.apply_filters(query, filters);
    query
        .order_by_sort(&export_sort(sort_by, sort_order, &config.sort))
        .into_ordered_select()
}
