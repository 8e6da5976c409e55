use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::filtering::{FilterDescriptor, FilterRule, FilterValueType};
use crate::pagination::PaginationConfig;
use crate::query::ListQuery;
use crate::search::{SearchDescriptor, StaticSearch};
use crate::sort::SortOptions;

use super::ListResource;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "permissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub module: String,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

const SEARCH: StaticSearch = StaticSearch {
    columns: &["permissions.name", "permissions.module"],
    exists_subqueries: &[],
    threshold: None,
};

const FILTERS: &[(&str, FilterRule)] = &[(
    "module",
    FilterRule::In {
        column: "permissions.module",
        value_type: FilterValueType::Text,
    },
)];

#[derive(Debug, Clone, Copy, Default)]
pub struct Permissions;

impl SearchDescriptor for Permissions {
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

impl FilterDescriptor for Permissions {
    fn filter_rules(&self) -> &[(&'static str, FilterRule)] {
        FILTERS
    }
}

impl ListResource for Permissions {
    type Entity = Entity;

    const RESOURCE_NAME_PLURAL: &'static str = "permissions";

    fn base_query(&self) -> ListQuery<Entity> {
        ListQuery::new(Entity::find().filter(Column::DeletedAt.is_null()))
    }

    // Plain whitelist; permissions have no sort aliases
    fn pagination_config(&self) -> PaginationConfig<'static> {
        PaginationConfig::new(SortOptions {
            default_sort_by: "permissions.name",
            default_sort_order: "ASC",
            allowed_columns: &["name", "module", "created_at"],
            column_prefix: "permissions.",
            ..SortOptions::default()
        })
    }

    fn projection_column(alias: &str) -> Option<&'static str> {
        match alias {
            "id" => Some("permissions.id"),
            "name" => Some("permissions.name"),
            "module" => Some("permissions.module"),
            "description" => Some("permissions.description"),
            _ => None,
        }
    }
}
