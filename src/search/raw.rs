//! Search clause for hand-written SQL.
//!
//! Same tokens, columns, templates and threshold as [`build_search_clause`], but the
//! output is a `HAVING`/`WHERE` clause with positional `$n` placeholders that callers
//! splice into their own statement. Only the similarity leg is emitted: there is no
//! `ILIKE` substring leg here, so short tokens that are substrings of long values can
//! miss rows the builder path would return.
//!
//! [`build_search_clause`]: super::build_search_clause

use std::fmt;

use super::{
    SearchDescriptor, number_placeholders, rewritten_templates, safe_columns, similarity_predicate,
    tokenise,
};

/// Keyword the raw clause starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClauseType {
    #[default]
    Having,
    Where,
}

impl fmt::Display for ClauseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Having => "HAVING",
            Self::Where => "WHERE",
        })
    }
}

/// A clause ready to splice into hand-written SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSearchClause {
    /// e.g. `HAVING ((SIMILARITY(...) >= 0.30 OR ...))`
    pub clause: String,
    /// Value for `$start`, `$start + 1`, ... in order
    pub params: Vec<String>,
    /// First placeholder index still free after this clause
    pub next_arg_index: usize,
}

/// Builds a similarity-only search clause whose placeholders start at `$start_arg_index`.
///
/// Returns `None` for blank input or when the descriptor has nothing searchable.
#[must_use]
pub fn build_raw_search_clause<D: SearchDescriptor + ?Sized>(
    search: &str,
    descriptor: &D,
    threshold: f64,
    start_arg_index: usize,
    clause_type: ClauseType,
) -> Option<RawSearchClause> {
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

    let mut next = start_arg_index.max(1);
    let mut params = Vec::new();
    let mut groups = Vec::with_capacity(tokens.len());

    for token in &tokens {
        let lowered = token.to_lowercase();
        let mut legs = Vec::with_capacity(columns.len() + templates.len());

        for fragment in columns
            .iter()
            .map(|column| similarity_predicate(column, threshold))
            .chain(templates.iter().cloned())
        {
            legs.push(number_placeholders(&fragment, &mut next));
            params.push(lowered.clone());
        }

        groups.push(format!("({})", legs.join(" OR ")));
    }

    Some(RawSearchClause {
        clause: format!("{clause_type} ({})", groups.join(" OR ")),
        params,
        next_arg_index: next,
    })
}
