//! Administrative regions, nested through `parent_code`.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::filtering::{FilterDescriptor, FilterRule, FilterValueType};
use crate::pagination::PaginationConfig;
use crate::query::ListQuery;
use crate::search::{SearchDescriptor, StaticSearch};
use crate::sort::SortOptions;

use super::ListResource;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "regions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub level: String,
    pub parent_code: Option<String>,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

const SEARCH: StaticSearch = StaticSearch {
    columns: &["regions.name", "regions.code"],
    exists_subqueries: &[],
    threshold: None,
};

const FILTERS: &[(&str, FilterRule)] = &[
    (
        "level",
        FilterRule::Eq {
            column: "regions.level",
            value_type: FilterValueType::Text,
        },
    ),
    (
        "parent_code",
        FilterRule::In {
            column: "regions.parent_code",
            value_type: FilterValueType::Text,
        },
    ),
];

fn sort_column(key: &str) -> Option<&'static str> {
    match key.trim().to_lowercase().as_str() {
        "code" => Some("regions.code"),
        "name" => Some("regions.name"),
        "level" => Some("regions.level"),
        "parent" | "parent_code" => Some("regions.parent_code"),
        "created_at" => Some("regions.created_at"),
        _ => None,
    }
}

/// List descriptor for `regions`
#[derive(Debug, Clone, Copy, Default)]
pub struct Regions;

impl SearchDescriptor for Regions {
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

impl FilterDescriptor for Regions {
    fn filter_rules(&self) -> &[(&'static str, FilterRule)] {
        FILTERS
    }
}

impl ListResource for Regions {
    type Entity = Entity;

    const RESOURCE_NAME_PLURAL: &'static str = "regions";

    fn base_query(&self) -> ListQuery<Entity> {
        ListQuery::new(Entity::find().filter(Column::DeletedAt.is_null()))
    }

    fn pagination_config(&self) -> PaginationConfig<'static> {
        PaginationConfig::new(SortOptions {
            default_sort_by: "regions.code",
            default_sort_order: "ASC",
            sort_mapping: Some(sort_column),
            natural_sort_columns: &["regions.code"],
            ..SortOptions::default()
        })
    }

    fn projection_column(alias: &str) -> Option<&'static str> {
        match alias {
            "id" => Some("regions.id"),
            "code" => Some("regions.code"),
            "name" => Some("regions.name"),
            "level" => Some("regions.level"),
            "parent_code" => Some("regions.parent_code"),
            _ => None,
        }
    }
}
