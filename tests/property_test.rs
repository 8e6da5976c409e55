use listcrate::{
    ListResource, PageRequest, SortOptions, StaticSearch, build_raw_search_clause,
    build_search_clause, compose, filtering::FilterValues, is_safe_identifier,
    pagination::normalise_pagination,
    resolve_sort,
    resources::{Expeditions, Roles},
    search::{raw::ClauseType, tokenise},
};
use proptest::prelude::*;
use sea_orm::{DbBackend, Statement};

fn bound_values(statement: &Statement) -> usize {
    statement.values.as_ref().map_or(0, |values| values.0.len())
}

const DESCRIPTOR: StaticSearch = StaticSearch {
    columns: &["t.name", "t.code"],
    exists_subqueries: &["EXISTS (SELECT 1 FROM regions r WHERE r.code = t.region_code AND r.name ILIKE ?)"],
    threshold: None,
};

fn mapping(key: &str) -> Option<&'static str> {
    match key {
        "name" => Some("t.name"),
        "code" => Some("t.code"),
        _ => None,
    }
}

proptest! {
    #[test]
    fn safe_identifiers_only_hold_whitelisted_chars(s in ".{0,40}") {
        if is_safe_identifier(&s) {
            prop_assert!(!s.is_empty());
            prop_assert!(s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'));
        }
    }

    #[test]
    fn search_placeholders_match_bound_values(search in ".{0,60}") {
        if let Some(clause) = build_search_clause(&search, &DESCRIPTOR, 0.3) {
            prop_assert!(!clause.predicate.contains('?'));
            prop_assert_eq!(clause.predicate.matches('$').count(), clause.predicate_params.len());
            prop_assert_eq!(clause.relevance.matches('$').count(), clause.relevance_params.len());
        }
    }

    #[test]
    fn raw_search_numbers_every_value(search in "[a-z ]{0,30}", start in 0usize..20) {
        if let Some(raw) = build_raw_search_clause(&search, &DESCRIPTOR, 0.3, start, ClauseType::Where) {
            let first = start.max(1);
            prop_assert_eq!(raw.next_arg_index, first + raw.params.len());
            prop_assert!(!raw.clause.contains('?'));
            for index in first..raw.next_arg_index {
                let placeholder = format!("${index})");
                prop_assert!(raw.clause.contains(&placeholder));
            }
        }
    }

    #[test]
    fn rendered_statement_binds_every_placeholder(
        search in ".{0,40}",
        statuses in prop::collection::vec("[a-z]{1,8}", 0..4),
        sort_by in prop_oneof![Just("code"), Just("name"), Just("unknown")],
    ) {
        let mut filters = FilterValues::new();
        for status in &statuses {
            filters.push("status", status);
        }
        filters.push("parameter_id", "00000000-0000-0000-0000-000000000001");
        let request = PageRequest::builder().search(search).sort(sort_by, "asc").build();

        let expeditions = compose(
            Expeditions.base_query(),
            &Expeditions,
            &request,
            &filters,
            &Expeditions.pagination_config(),
        );
        let roles = compose(Roles.base_query(), &Roles, &request, &filters, &Roles.pagination_config());

        for statement in [
            expeditions.statement(DbBackend::Postgres),
            expeditions.count_statement(DbBackend::Postgres),
            roles.statement(DbBackend::Postgres),
        ] {
            prop_assert!(!statement.sql.contains('?'), "{}", statement.sql);
            prop_assert_eq!(statement.sql.matches('$').count(), bound_values(&statement));
        }
    }

    #[test]
    fn blank_search_is_a_noop(search in "\\s{0,10}") {
        prop_assert!(tokenise(&search).is_empty());
        prop_assert!(build_search_clause(&search, &DESCRIPTOR, 0.3).is_none());
    }

    #[test]
    fn resolved_sort_is_always_well_formed(sort_by in ".{0,30}", sort_order in ".{0,10}") {
        let options = SortOptions {
            sort_mapping: Some(mapping),
            natural_sort_columns: &["t.code"],
            ..SortOptions::default()
        };
        let sort = resolve_sort(&sort_by, &sort_order, &options);
        prop_assert!(!sort.keys().is_empty());
        let last = sort.keys().last().unwrap();
        prop_assert!(is_safe_identifier(&last.expr));
        prop_assert!(["created_at", "t.name", "t.code"].contains(&last.expr.as_str()));
        for key in sort.keys() {
            prop_assert_eq!(key.order, sort.keys()[0].order);
        }
    }

    #[test]
    fn normalised_window_is_bounded(page in any::<i64>(), per_page in any::<i64>(), max in 0u64..500) {
        let (page, per_page) = normalise_pagination(page, per_page, max);
        prop_assert!(page >= 1);
        prop_assert!(per_page >= 1);
        if max > 0 {
            prop_assert!(per_page <= max);
        }
    }
}
