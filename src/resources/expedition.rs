//! Expeditions: field campaigns tied to a region and a set of measured parameters.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::filtering::{FilterDescriptor, FilterRule, FilterValueType};
use crate::pagination::PaginationConfig;
use crate::query::ListQuery;
use crate::search::{SearchDescriptor, StaticSearch};
use crate::sort::SortOptions;

use super::ListResource;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "expeditions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub expedition_code: String,
    pub expedition_name: String,
    pub region_code: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

const SEARCH: StaticSearch = StaticSearch {
    columns: &["expeditions.expedition_name", "expeditions.expedition_code"],
    exists_subqueries: &[
        "EXISTS (SELECT 1 FROM regions r WHERE r.code = expeditions.region_code AND r.deleted_at IS NULL AND r.name ILIKE ?)",
    ],
    threshold: None,
};

const FILTERS: &[(&str, FilterRule)] = &[
    (
        "status",
        FilterRule::In {
            column: "expeditions.status",
            value_type: FilterValueType::Text,
        },
    ),
    (
        "region_code",
        FilterRule::In {
            column: "expeditions.region_code",
            value_type: FilterValueType::Text,
        },
    ),
    (
        "parameter_id",
        FilterRule::Exists {
            template: "EXISTS (SELECT 1 FROM expedition_parameters ep WHERE ep.expedition_id = expeditions.id AND ep.parameter_id IN (?))",
            value_type: FilterValueType::Uuid,
        },
    ),
];

const NATURAL_SORT: &[&str] = &["expeditions.expedition_code"];

fn sort_column(key: &str) -> Option<&'static str> {
    match key.trim().to_lowercase().as_str() {
        "name" | "expedition_name" => Some("expeditions.expedition_name"),
        "code" | "expedition_code" => Some("expeditions.expedition_code"),
        "region" | "region_code" => Some("expeditions.region_code"),
        "status" => Some("expeditions.status"),
        "created_at" => Some("expeditions.created_at"),
        _ => None,
    }
}

/// List descriptor for `expeditions`
#[derive(Debug, Clone, Copy, Default)]
pub struct Expeditions;

impl SearchDescriptor for Expeditions {
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

impl FilterDescriptor for Expeditions {
    fn filter_rules(&self) -> &[(&'static str, FilterRule)] {
        FILTERS
    }
}

impl ListResource for Expeditions {
    type Entity = Entity;

    const RESOURCE_NAME_PLURAL: &'static str = "expeditions";

    fn base_query(&self) -> ListQuery<Entity> {
        ListQuery::new(Entity::find().filter(Column::DeletedAt.is_null()))
    }

    fn pagination_config(&self) -> PaginationConfig<'static> {
        PaginationConfig::new(SortOptions {
            default_sort_by: "expeditions.created_at",
            default_sort_order: "DESC",
            sort_mapping: Some(sort_column),
            natural_sort_columns: NATURAL_SORT,
            ..SortOptions::default()
        })
    }

    fn projection_column(alias: &str) -> Option<&'static str> {
        match alias {
            "id" => Some("expeditions.id"),
            "code" | "expedition_code" => Some("expeditions.expedition_code"),
            "name" | "expedition_name" => Some("expeditions.expedition_name"),
            "region_code" => Some("expeditions.region_code"),
            "status" => Some("expeditions.status"),
            "created_at" => Some("expeditions.created_at"),
            _ => None,
        }
    }
}
