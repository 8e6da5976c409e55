//! Roles, searchable by the names of the permissions they grant.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::filtering::{FilterDescriptor, FilterRule, FilterValueType};
use crate::pagination::PaginationConfig;
use crate::query::ListQuery;
use crate::search::{SearchDescriptor, StaticSearch};
use crate::sort::SortOptions;

use super::ListResource;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Role names are short, so matching is stricter than the global default.
pub const SIMILARITY_THRESHOLD: f64 = 0.35;

const SEARCH: StaticSearch = StaticSearch {
    columns: &["roles.name", "roles.description"],
    exists_subqueries: &[
        "EXISTS (SELECT 1 FROM role_permissions rp JOIN permissions p ON p.id = rp.permission_id \
         WHERE rp.role_id = roles.id AND p.deleted_at IS NULL AND p.name ILIKE ?)",
    ],
    threshold: Some(SIMILARITY_THRESHOLD),
};

const FILTERS: &[(&str, FilterRule)] = &[
    (
        "permission_id",
        FilterRule::Exists {
            template: "EXISTS (SELECT 1 FROM role_permissions rp WHERE rp.role_id = roles.id AND rp.permission_id IN (?))",
            value_type: FilterValueType::Uuid,
        },
    ),
    (
        "is_system",
        FilterRule::Eq {
            column: "roles.is_system",
            value_type: FilterValueType::Boolean,
        },
    ),
];

fn sort_column(key: &str) -> Option<&'static str> {
    match key.trim().to_lowercase().as_str() {
        "name" => Some("roles.name"),
        "is_system" | "system" => Some("roles.is_system"),
        "created_at" => Some("roles.created_at"),
        _ => None,
    }
}

/// List descriptor for `roles`
#[derive(Debug, Clone, Copy, Default)]
pub struct Roles;

impl SearchDescriptor for Roles {
    fn search_columns(&self) -> &[&'static str] {
        SEARCH.columns
    }

    fn search_exists_subqueries(&self) -> &[&'static str] {
        SEARCH.exists_subqueries
    }

    fn similarity_threshold(&self) -> Option<f64> {
        SEARCH.threshold
    }
}

impl FilterDescriptor for Roles {
    fn filter_rules(&self) -> &[(&'static str, FilterRule)] {
        FILTERS
    }
}

impl ListResource for Roles {
    type Entity = Entity;

    const RESOURCE_NAME_PLURAL: &'static str = "roles";

    fn base_query(&self) -> ListQuery<Entity> {
        ListQuery::new(Entity::find().filter(Column::DeletedAt.is_null()))
    }

    fn pagination_config(&self) -> PaginationConfig<'static> {
        PaginationConfig::new(SortOptions {
            default_sort_by: "roles.name",
            default_sort_order: "ASC",
            sort_mapping: Some(sort_column),
            ..SortOptions::default()
        })
    }

    fn projection_column(alias: &str) -> Option<&'static str> {
        match alias {
            "id" => Some("roles.id"),
            "name" => Some("roles.name"),
            "description" => Some("roles.description"),
            "is_system" => Some("roles.is_system"),
            _ => None,
        }
    }
}
