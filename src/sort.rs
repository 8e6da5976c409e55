use sea_orm::sea_query::Order;
use std::fmt;

use crate::identifier::{is_safe_identifier, log_prefix};

/// Column every unsafe or missing sort reference degrades to.
pub const FALLBACK_SORT_COLUMN: &str = "created_at";

/// Maps a caller-supplied `sort_by` key to a SQL-safe column reference, or `None` when unknown.
pub type SortMapping = fn(&str) -> Option<&'static str>;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Trims and uppercases `input`; anything other than `ASC` or `DESC` becomes `DESC`.
#[must_use]
pub fn sanitise_order(input: &str) -> SortOrder {
    match input.trim().to_uppercase().as_str() {
        "ASC" => SortOrder::Asc,
        _ => SortOrder::Desc,
    }
}

/// Looks `input` up case-insensitively in `allowed` and returns `prefix` joined to the
/// matching entry. Unknown input yields `None`.
#[must_use]
pub fn sanitise_column(input: &str, allowed: &[&str], prefix: &str) -> Option<String> {
    let wanted = input.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    allowed
        .iter()
        .find(|entry| entry.eq_ignore_ascii_case(&wanted))
        .map(|entry| format!("{prefix}{entry}"))
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// SQL expression; always built from whitelisted identifiers
    pub expr: String,
    pub order: SortOrder,
    pub nulls_last: bool,
}

impl SortKey {
    fn new(expr: impl Into<String>, order: SortOrder) -> Self {
        Self {
            expr: expr.into(),
            order,
            nulls_last: false,
        }
    }

    fn with_nulls_last(mut self) -> Self {
        self.nulls_last = true;
        self
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, self.order)?;
        if self.nulls_last {
            f.write_str(" NULLS LAST")?;
        }
        Ok(())
    }
}

/// A resolved, comma-separated `ORDER BY` list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortExpression {
    keys: Vec<SortKey>,
}

impl SortExpression {
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    fn single(column: &str, order: SortOrder) -> Self {
        Self {
            keys: vec![SortKey::new(column, order)],
        }
    }
}

impl fmt::Display for SortExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, key) in self.keys.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Builds the `ORDER BY` list for an already resolved `column`.
///
/// A column that fails [`is_safe_identifier`] degrades to `created_at <order>`.
/// With `natural` set, the column is split into three keys sharing `order`:
///
/// 1. the leading non-digit run, trimmed
/// 2. the first digit run cast to `bigint`, `NULLS LAST`
/// 3. the raw column as a tie breaker
///
/// so `A1, A2, A10, B1` sort the way a person would read them.
#[must_use]
pub fn build_sort_expression(column: &str, order: SortOrder, natural: bool) -> SortExpression {
    if !is_safe_identifier(column) {
        tracing::warn!(
            column = log_prefix(column),
            "unsafe sort column; falling back to {FALLBACK_SORT_COLUMN}"
        );
        return SortExpression::single(FALLBACK_SORT_COLUMN, order);
    }

    if !natural {
        return SortExpression::single(column, order);
    }

    let digits = format!("(regexp_match({column},'[0-9]+'))[1]");
    SortExpression {
        keys: vec![
            SortKey::new(format!("TRIM(SUBSTRING({column} FROM '^([^0-9]*)'))"), order),
            SortKey::new(
                format!("(CASE WHEN {digits} IS NULL THEN NULL ELSE ({digits})::bigint END)"),
                order,
            )
            .with_nulls_last(),
            SortKey::new(column, order),
        ],
    }
}

/// Sort defaults and whitelists shared by paged listings and exports.
#[derive(Debug, Clone, Copy)]
pub struct SortOptions<'a> {
    /// Column used when the caller supplies none; empty means `created_at`
    pub default_sort_by: &'a str,
    /// Direction used when the caller supplies none; empty means `DESC`
    pub default_sort_order: &'a str,
    /// Consulted with `column_prefix` only when `sort_mapping` is absent
    pub allowed_columns: &'a [&'a str],
    pub column_prefix: &'a str,
    pub sort_mapping: Option<SortMapping>,
    /// Resolved column references that sort naturally
    pub natural_sort_columns: &'a [&'a str],
}

impl Default for SortOptions<'_> {
    fn default() -> Self {
        Self {
            default_sort_by: FALLBACK_SORT_COLUMN,
            default_sort_order: "DESC",
            allowed_columns: &[],
            column_prefix: "",
            sort_mapping: None,
            natural_sort_columns: &[],
        }
    }
}

/// Resolves the caller's `sort_by` / `sort_order` against `options`.
///
/// Never fails: unknown columns keep the default, unknown directions become `DESC`.
#[must_use]
pub fn resolve_sort(sort_by: &str, sort_order: &str, options: &SortOptions<'_>) -> SortExpression {
    let default_column = options.default_sort_by.trim();
    let mut column = if default_column.is_empty() {
        FALLBACK_SORT_COLUMN.to_string()
    } else {
        default_column.to_string()
    };

    let mut order = if options.default_sort_order.trim().is_empty() {
        SortOrder::Desc
    } else {
        sanitise_order(options.default_sort_order)
    };

    let requested = sort_by.trim();
    if !requested.is_empty() {
        let resolved = match options.sort_mapping {
            Some(mapping) => mapping(requested).map(str::to_string),
            None => sanitise_column(requested, options.allowed_columns, options.column_prefix),
        };
        match resolved {
            Some(mapped) if !mapped.is_empty() => column = mapped,
            _ => tracing::debug!(
                sort_by = log_prefix(requested),
                "unrecognised sort column ignored"
            ),
        }
    }

    if !sort_order.trim().is_empty() {
        order = sanitise_order(sort_order);
    }

    let natural = options.natural_sort_columns.contains(&column.as_str());
    build_sort_expression(&column, order, natural)
}

/// Sort resolution for export paths, which stream every row and have no page request.
///
/// Produces the same ordering as the paged listing given the same inputs.
#[must_use]
pub fn export_sort(
    sort_by: Option<&str>,
    sort_order: Option<&str>,
    options: &SortOptions<'_>,
) -> SortExpression {
    resolve_sort(sort_by.unwrap_or_default(), sort_order.unwrap_or_default(), options)
}
