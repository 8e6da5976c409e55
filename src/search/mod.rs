//! # Relevance search
//!
//! Multi-token fuzzy search across a resource's declared columns and correlated
//! subqueries, backed by trigram `SIMILARITY` plus an `ILIKE` substring leg.
//!
//! ## How a search string is matched
//!
//! `"blue shark"` becomes the tokens `blue`, `shark` and the spaces-removed
//! `blueshark`. For every token and every searchable column the builder emits
//!
//! ```text
//! SIMILARITY(LOWER(REPLACE(col,' ','')), $1) >= 0.30 OR LOWER(col) ILIKE $2
//! ```
//!
//! and every `EXISTS` template has its `<col> ILIKE ?` marker rewritten to the same
//! similarity predicate. The per-token groups are combined with `OR`, so a row that
//! matches any token on any target is admitted.
//!
//! Fragments carry Postgres-style `$n` placeholders numbered from `$1` within each
//! fragment; Sea-Query renumbers them when the fragment joins a statement.
//!
//! Rows are ranked by the sum of `SIMILARITY` over every (token, column) pair, which
//! becomes the first `ORDER BY` key ahead of the caller's requested sort.
//!
//! ## Descriptors
//!
//! ```rust,ignore
//! use listcrate::search::StaticSearch;
//!
//! pub const SEARCH: StaticSearch = StaticSearch {
//!     columns: &["parameters.parameter_code", "parameters.parameter_name"],
//!     exists_subqueries: &[],
//!     threshold: None,
//! };
//! ```

pub mod raw;

use sea_orm::{
    EntityTrait,
    sea_query::{Expr, Order},
};

use crate::identifier::{is_safe_identifier, log_prefix};
use crate::query::ListQuery;

/// Trigram similarity threshold used when a descriptor carries no override.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.30;

/// Marker inside an `EXISTS` template that is rewritten into a similarity predicate.
pub const EXISTS_MARKER: &str = "ILIKE ?";

/// Per-resource declaration of what free-text search looks at.
pub trait SearchDescriptor {
    /// Fully-qualified column references, each interpolated into SQL
    fn search_columns(&self) -> &[&'static str];

    /// Correlated subquery templates, each holding exactly one `<col> ILIKE ?` marker
    fn search_exists_subqueries(&self) -> &[&'static str] {
        &[]
    }

    /// Similarity threshold override in `[0.0, 1.0]`
    fn similarity_threshold(&self) -> Option<f64> {
        None
    }
}

/// A search descriptor declared as a constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSearch {
    pub columns: &'static [&'static str],
    pub exists_subqueries: &'static [&'static str],
    pub threshold: Option<f64>,
}

impl SearchDescriptor for StaticSearch {
    fn search_columns(&self) -> &[&'static str] {
        self.columns
    }

    fn search_exists_subqueries(&self) -> &[&'static str] {
        self.exists_subqueries
    }

    fn similarity_threshold(&self) -> Option<f64> {
        self.threshold
    }
}

/// Picks the descriptor override when it is a valid threshold, else `default`.
#[must_use]
pub fn effective_threshold<D: SearchDescriptor + ?Sized>(descriptor: &D, default: f64) -> f64 {
    match descriptor.similarity_threshold() {
        Some(threshold) if (0.0..=1.0).contains(&threshold) => threshold,
        Some(threshold) => {
            tracing::warn!(threshold, "similarity threshold outside [0, 1]; using default");
            default
        }
        None => default,
    }
}

/// Splits `search` on whitespace and appends the whitespace-removed form of the whole string.
///
/// Whitespace-only input counts as blank and yields no tokens.
#[must_use]
pub fn tokenise(search: &str) -> Vec<String> {
    let mut tokens: Vec<String> = search.split_whitespace().map(str::to_string).collect();
    if tokens.is_empty() {
        return tokens;
    }
    tokens.push(tokens.concat());
    tokens
}

/// Replaces each `?` of `fragment` with `$next`, `$next + 1`, ... and advances `next`.
pub(crate) fn number_placeholders(fragment: &str, next: &mut usize) -> String {
    let mut numbered = String::with_capacity(fragment.len() + 4);
    for ch in fragment.chars() {
        if ch == '?' {
            numbered.push('$');
            numbered.push_str(&next.to_string());
            *next += 1;
        } else {
            numbered.push(ch);
        }
    }
    numbered
}

/// Escape LIKE wildcards so user input only ever matches literally
/// Escapes: % (match any) and _ (match single char)
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub(crate) fn similarity_expr(column: &str) -> String {
    format!("SIMILARITY(LOWER(REPLACE({column},' ','')), ?)")
}

pub(crate) fn similarity_predicate(column: &str, threshold: f64) -> String {
    format!("{} >= {threshold:.2}", similarity_expr(column))
}

/// Rewrites the single `<col> ILIKE ?` marker of an `EXISTS` template.
///
/// Returns `None` when the template does not hold exactly one marker (and no other
/// `?`) or when the column in front of it is not a safe identifier. The result keeps a
/// single `?` for the caller to number.
pub(crate) fn rewrite_exists_template(template: &str, threshold: f64) -> Option<String> {
    if template.matches('?').count() != 1 {
        return None;
    }
    let mut markers = template.match_indices(EXISTS_MARKER);
    let (marker_at, _) = markers.next()?;
    if markers.next().is_some() {
        return None;
    }

    let head = template[..marker_at].trim_end();
    let column_start = head
        .rfind(|c: char| c.is_whitespace() || c == '(')
        .map_or(0, |idx| idx + 1);
    let column = &head[column_start..];
    if !is_safe_identifier(column) {
        return None;
    }

    Some(format!(
        "{}{}{}",
        &template[..column_start],
        similarity_predicate(column, threshold),
        &template[marker_at + EXISTS_MARKER.len()..]
    ))
}

/// Descriptor columns that pass the identifier whitelist.
pub(crate) fn safe_columns<D: SearchDescriptor + ?Sized>(descriptor: &D) -> Vec<&'static str> {
    descriptor
        .search_columns()
        .iter()
        .copied()
        .filter(|column| {
            let safe = is_safe_identifier(column);
            if !safe {
                tracing::warn!(column = log_prefix(column), "unsafe search column dropped");
            }
            safe
        })
        .collect()
}

/// Rewritten `EXISTS` templates; malformed ones are dropped.
pub(crate) fn rewritten_templates<D: SearchDescriptor + ?Sized>(
    descriptor: &D,
    threshold: f64,
) -> Vec<String> {
    descriptor
        .search_exists_subqueries()
        .iter()
        .filter_map(|template| {
            let rewritten = rewrite_exists_template(template, threshold);
            if rewritten.is_none() {
                tracing::warn!(
                    template = log_prefix(template),
                    "EXISTS search template needs exactly one safe `<column> ILIKE ?` marker; dropped"
                );
            }
            rewritten
        })
        .collect()
}

/// SQL fragments and bound values produced for one search string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchClause {
    /// Parenthesised `WHERE` fragment with placeholders `$1..$n`
    pub predicate: String,
    pub predicate_params: Vec<String>,
    /// Relevance sum with its own `$1..$n`, sorted descending; empty when no column
    /// survived the whitelist
    pub relevance: String,
    pub relevance_params: Vec<String>,
}

/// Builds the search predicate and relevance expression for `search`.
///
/// Returns `None` when there is nothing to search: blank input, or a descriptor with
/// no usable columns and no usable templates.
#[must_use]
pub fn build_search_clause<D: SearchDescriptor + ?Sized>(
    search: &str,
    descriptor: &D,
    threshold: f64,
) -> Option<SearchClause> {
    if search.trim().is_empty() {
        return None;
    }

    let columns = safe_columns(descriptor);
    let templates = rewritten_templates(descriptor, threshold);
    if columns.is_empty() && templates.is_empty() {
        return None;
    }

    let tokens = tokenise(search);
    if tokens.is_empty() {
        return None;
    }

    let mut clause = SearchClause::default();
    let mut groups = Vec::with_capacity(tokens.len());
    let mut rank_terms = Vec::new();
    let mut next_predicate_arg = 1;
    let mut next_rank_arg = 1;

    for token in &tokens {
        let lowered = token.to_lowercase();
        let mut legs = Vec::with_capacity(columns.len() * 2 + templates.len());

        for column in &columns {
            legs.push(number_placeholders(
                &similarity_predicate(column, threshold),
                &mut next_predicate_arg,
            ));
            clause.predicate_params.push(lowered.clone());

            legs.push(number_placeholders(
                &format!("LOWER({column}) ILIKE ?"),
                &mut next_predicate_arg,
            ));
            clause
                .predicate_params
                .push(format!("%{}%", escape_like_wildcards(&lowered)));

            rank_terms.push(number_placeholders(&similarity_expr(column), &mut next_rank_arg));
            clause.relevance_params.push(lowered.clone());
        }

        for template in &templates {
            legs.push(number_placeholders(template, &mut next_predicate_arg));
            clause.predicate_params.push(lowered.clone());
        }

        groups.push(format!("({})", legs.join(" OR ")));
    }

    clause.predicate = format!("({})", groups.join(" OR "));
    if !rank_terms.is_empty() {
        clause.relevance = format!("({})", rank_terms.join(" + "));
    }

    tracing::debug!(
        tokens = tokens.len(),
        columns = columns.len(),
        templates = templates.len(),
        "search clause composed"
    );

    Some(clause)
}

/// Adds the search predicate and the relevance ordering to `query`.
///
/// Blank input leaves the query untouched.
#[must_use]
pub fn apply_search<E, D>(
    query: ListQuery<E>,
    search: &str,
    descriptor: &D,
    threshold: f64,
) -> ListQuery<E>
where
    E: EntityTrait,
    D: SearchDescriptor + ?Sized,
{
    let Some(clause) = build_search_clause(search, descriptor, threshold) else {
        return query;
    };

    let mut query = query.and_where(Expr::cust_with_values(
        clause.predicate,
        clause.predicate_params,
    ));
    if !clause.relevance.is_empty() {
        query = query.order_by_expr(
            Expr::cust_with_values(clause.relevance, clause.relevance_params),
            Order::Desc,
        );
    }
    query
}
