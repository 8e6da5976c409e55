//! # Structured filters
//!
//! Each resource declares a static table of filter rules keyed by field name. The
//! ingestion layer collects the caller's raw values into [`FilterValues`] and the
//! descriptor turns every known field into a bound predicate. Unknown fields and
//! values that do not parse as the rule's type are ignored.
//!
//! ```rust,ignore
//! pub const FILTERS: &[(&str, FilterRule)] = &[
//!     ("status", FilterRule::In { column: "expeditions.status", value_type: FilterValueType::Text }),
//!     ("parameter", FilterRule::AnyIn {
//!         columns: ["parameters.parameter_code", "parameters.parameter_name"],
//!         value_type: FilterValueType::Text,
//!     }),
//! ];
//! ```
//!
//! ```text
//! GET /expeditions?status=active,planned&region_code=NO-50
//! GET /expeditions?filter[]=[{"field":"status","operator":"in","value":["active"]}]
//! ```

use sea_orm::{EntityTrait, Value, sea_query::Expr};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::identifier::{is_safe_identifier, log_prefix};
use crate::query::ListQuery;
use crate::request::FilterEntry;

/// Marker inside an `Exists` rule template expanded to one placeholder per value.
pub const IN_MARKER: &str = "IN (?)";

/// Type raw filter values are parsed into before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterValueType {
    Text,
    Integer,
    Uuid,
    Boolean,
}

impl FilterValueType {
    /// Parses one raw value, returning `None` when it does not fit the type.
    #[must_use]
    pub fn parse(self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match self {
            Self::Text => Some(raw.to_string().into()),
            Self::Integer => raw.parse::<i64>().ok().map(Into::into),
            Self::Uuid => Uuid::parse_str(raw).ok().map(Into::into),
            Self::Boolean => match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true.into()),
                "false" | "0" | "no" => Some(false.into()),
                _ => None,
            },
        }
    }
}

/// How one filter field maps onto SQL.
///
/// Predicates bind their values through `$1..$n`, numbered within the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRule {
    /// `col = $1` with the first value
    Eq {
        column: &'static str,
        value_type: FilterValueType,
    },
    /// `col IN ($1, ...)`
    In {
        column: &'static str,
        value_type: FilterValueType,
    },
    /// `(c1 IN ($1, ...) OR c2 IN ($k, ...))`, for inputs mixing codes and names
    AnyIn {
        columns: [&'static str; 2],
        value_type: FilterValueType,
    },
    /// Correlated subquery holding exactly one `IN (?)` marker and no other `?`
    Exists {
        template: &'static str,
        value_type: FilterValueType,
    },
}

impl FilterRule {
    const fn value_type(&self) -> FilterValueType {
        match self {
            Self::Eq { value_type, .. }
            | Self::In { value_type, .. }
            | Self::AnyIn { value_type, .. }
            | Self::Exists { value_type, .. } => *value_type,
        }
    }

    /// Builds the predicate for `raw` values, or `None` when the rule cannot apply.
    #[must_use]
    pub fn predicate(&self, raw: &[String]) -> Option<(String, Vec<Value>)> {
        let value_type = self.value_type();
        let values: Vec<Value> = raw.iter().filter_map(|v| value_type.parse(v)).collect();
        if values.is_empty() {
            return None;
        }

        match self {
            Self::Eq { column, .. } => {
                let column = checked(column)?;
                let first = values.into_iter().next()?;
                Some((format!("{column} = $1"), vec![first]))
            }
            Self::In { column, .. } => {
                let column = checked(column)?;
                Some((format!("{column} IN ({})", placeholders(1, values.len())), values))
            }
            Self::AnyIn { columns: [first, second], .. } => {
                let first = checked(first)?;
                let second = checked(second)?;
                let count = values.len();
                let first_list = placeholders(1, count);
                let second_list = placeholders(count + 1, count);
                let mut bound = values.clone();
                bound.extend(values);
                Some((
                    format!("({first} IN ({first_list}) OR {second} IN ({second_list}))"),
                    bound,
                ))
            }
            Self::Exists { template, .. } => {
                if template.matches(IN_MARKER).count() != 1 || template.matches('?').count() != 1 {
                    tracing::warn!(
                        template = log_prefix(template),
                        "EXISTS filter template needs exactly one `IN (?)` marker; skipped"
                    );
                    return None;
                }
                let expanded = format!("IN ({})", placeholders(1, values.len()));
                Some((template.replacen(IN_MARKER, &expanded, 1), values))
            }
        }
    }
}

fn checked(column: &str) -> Option<&str> {
    if is_safe_identifier(column) {
        Some(column)
    } else {
        tracing::warn!(column = log_prefix(column), "unsafe filter column; rule skipped");
        None
    }
}

/// `$start, $start + 1, ...` for `count` values
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|index| format!("${index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Raw filter values collected from a request, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterValues {
    values: BTreeMap<String, Vec<String>>,
}

impl FilterValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds comma-separated values for `field`; a trailing `[]` on the name is ignored.
    pub fn push(&mut self, field: &str, raw: &str) {
        let field = field.strip_suffix("[]").unwrap_or(field).trim();
        if field.is_empty() {
            return;
        }
        let parsed = raw
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        self.values.entry(field.to_string()).or_default().extend(parsed);
    }

    /// Folds structured `filter[]` entries in alongside query-parameter filters.
    pub fn extend_from_entries(&mut self, entries: &[FilterEntry]) {
        for entry in entries {
            for value in &entry.value {
                if let Some(raw) = scalar_to_string(value) {
                    self.push(&entry.field, &raw);
                }
            }
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.values.get(field).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.values().all(Vec::is_empty)
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Per-resource structured filtering.
pub trait FilterDescriptor {
    /// Field name to rule table
    fn filter_rules(&self) -> &[(&'static str, FilterRule)];

    /// Attaches one `AND`ed predicate per known field with at least one usable value.
    #[must_use]
    fn apply_filters<E: EntityTrait>(&self, query: ListQuery<E>, filters: &FilterValues) -> ListQuery<E> {
        let mut query = query;
        for (field, rule) in self.filter_rules() {
            let Some(raw) = filters.get(field) else {
                continue;
            };
            if let Some((sql, values)) = rule.predicate(raw) {
                query = query.and_where(Expr::cust_with_values(sql, values));
            }
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_eq_uses_first_value() {
        let rule = FilterRule::Eq {
            column: "regions.level",
            value_type: FilterValueType::Text,
        };
        let (sql, values) = rule.predicate(&raw(&["province", "city"])).unwrap();
        assert_eq!(sql, "regions.level = $1");
        assert_eq!(values, vec![Value::from("province".to_string())]);
    }

    #[test]
    fn test_in_expands_placeholders() {
        let rule = FilterRule::In {
            column: "expeditions.status",
            value_type: FilterValueType::Text,
        };
        let (sql, values) = rule.predicate(&raw(&["active", "planned", "closed"])).unwrap();
        assert_eq!(sql, "expeditions.status IN ($1, $2, $3)");
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_any_in_binds_values_twice() {
        let rule = FilterRule::AnyIn {
            columns: ["p.code", "p.name"],
            value_type: FilterValueType::Text,
        };
        let (sql, values) = rule.predicate(&raw(&["PH", "Salinity"])).unwrap();
        assert_eq!(sql, "(p.code IN ($1, $2) OR p.name IN ($3, $4))");
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], values[2]);
    }

    #[test]
    fn test_exists_expands_marker() {
        let rule = FilterRule::Exists {
            template: "EXISTS (SELECT 1 FROM role_permissions rp WHERE rp.role_id = roles.id AND rp.permission_id IN (?))",
            value_type: FilterValueType::Uuid,
        };
        let id = Uuid::new_v4().to_string();
        let (sql, values) = rule.predicate(&[id, "not-a-uuid".to_string()]).unwrap();
        assert!(sql.ends_with("rp.permission_id IN ($1))"));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_exists_without_marker_is_skipped() {
        let rule = FilterRule::Exists {
            template: "EXISTS (SELECT 1 FROM x)",
            value_type: FilterValueType::Text,
        };
        assert!(rule.predicate(&raw(&["a"])).is_none());

        let stray = FilterRule::Exists {
            template: "EXISTS (SELECT 1 FROM x WHERE x.a = ? AND x.b IN (?))",
            value_type: FilterValueType::Text,
        };
        assert!(stray.predicate(&raw(&["a"])).is_none());
    }

    #[test]
    fn test_filters_bind_every_value_on_postgres() {
        use crate::resources::region;
        use sea_orm::DbBackend;

        struct Rules;
        impl FilterDescriptor for Rules {
            fn filter_rules(&self) -> &[(&'static str, FilterRule)] {
                &[
                    (
                        "level",
                        FilterRule::Eq {
                            column: "regions.level",
                            value_type: FilterValueType::Text,
                        },
                    ),
                    (
                        "code",
                        FilterRule::AnyIn {
                            columns: ["regions.code", "regions.name"],
                            value_type: FilterValueType::Text,
                        },
                    ),
                ]
            }
        }

        let mut filters = FilterValues::new();
        filters.push("level", "province");
        filters.push("code", "NO-50,Agder");
        let statement = Rules
            .apply_filters(ListQuery::new(region::Entity::find()), &filters)
            .count_statement(DbBackend::Postgres);

        assert_eq!(statement.values.as_ref().map_or(0, |v| v.0.len()), 5);
        assert!(!statement.sql.contains('?'), "{}", statement.sql);
        assert!(statement.sql.contains("regions.level = $1"), "{}", statement.sql);
        assert!(
            statement
                .sql
                .contains("(regions.code IN ($2, $3) OR regions.name IN ($4, $5))"),
            "{}",
            statement.sql
        );
    }

    #[test]
    fn test_unparsable_values_skip_rule() {
        let rule = FilterRule::In {
            column: "t.count",
            value_type: FilterValueType::Integer,
        };
        assert!(rule.predicate(&raw(&["abc", ""])).is_none());
        let (_, values) = rule.predicate(&raw(&["abc", "42"])).unwrap();
        assert_eq!(values, vec![Value::from(42_i64)]);
    }

    #[test]
    fn test_unsafe_column_skips_rule() {
        let rule = FilterRule::Eq {
            column: "t.name; --",
            value_type: FilterValueType::Text,
        };
        assert!(rule.predicate(&raw(&["a"])).is_none());
    }

    #[test]
    fn test_boolean_parsing() {
        assert_eq!(FilterValueType::Boolean.parse("TRUE"), Some(Value::from(true)));
        assert_eq!(FilterValueType::Boolean.parse("0"), Some(Value::from(false)));
        assert_eq!(FilterValueType::Boolean.parse("maybe"), None);
    }

    #[test]
    fn test_filter_values_push_and_merge() {
        let mut values = FilterValues::new();
        values.push("status[]", "active, planned");
        values.push("status", "closed");
        values.push("", "ignored");
        values.extend_from_entries(&[FilterEntry {
            field: "region_code".to_string(),
            operator: "in".to_string(),
            value: vec![serde_json::json!("NO-50"), serde_json::json!(7), serde_json::json!(null)],
        }]);

        assert_eq!(
            values.get("status"),
            Some(raw(&["active", "planned", "closed"]).as_slice())
        );
        assert_eq!(values.get("region_code"), Some(raw(&["NO-50", "7"]).as_slice()));
        assert!(values.get("unknown").is_none());
        assert!(!values.is_empty());
    }
}
