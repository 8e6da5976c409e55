//! Measured parameters (salinity, pH, ...). Codes like `P2`, `P10` sort naturally.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::filtering::{FilterDescriptor, FilterRule, FilterValueType};
use crate::pagination::PaginationConfig;
use crate::query::ListQuery;
use crate::search::{SearchDescriptor, StaticSearch};
use crate::sort::SortOptions;

use super::ListResource;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "parameters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub parameter_code: String,
    pub parameter_name: String,
    pub unit: Option<String>,
    pub category: String,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

const SEARCH: StaticSearch = StaticSearch {
    columns: &[
        "parameters.parameter_code",
        "parameters.parameter_name",
        "parameters.unit",
    ],
    exists_subqueries: &[],
    threshold: None,
};

const FILTERS: &[(&str, FilterRule)] = &[
    (
        "category",
        FilterRule::In {
            column: "parameters.category",
            value_type: FilterValueType::Text,
        },
    ),
    // Accepts codes and names interchangeably
    (
        "parameter",
        FilterRule::AnyIn {
            columns: ["parameters.parameter_code", "parameters.parameter_name"],
            value_type: FilterValueType::Text,
        },
    ),
];

fn sort_column(key: &str) -> Option<&'static str> {
    match key.trim().to_lowercase().as_str() {
        "code" | "parameter_code" => Some("parameters.parameter_code"),
        "name" | "parameter_name" => Some("parameters.parameter_name"),
        "unit" => Some("parameters.unit"),
        "category" => Some("parameters.category"),
        "created_at" => Some("parameters.created_at"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Parameters;

impl SearchDescriptor for Parameters {
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

impl FilterDescriptor for Parameters {
    fn filter_rules(&self) -> &[(&'static str, FilterRule)] {
        FILTERS
    }
}

impl ListResource for Parameters {
    type Entity = Entity;

    const RESOURCE_NAME_PLURAL: &'static str = "parameters";

    fn base_query(&self) -> ListQuery<Entity> {
        ListQuery::new(Entity::find().filter(Column::DeletedAt.is_null()))
    }

    fn pagination_config(&self) -> PaginationConfig<'static> {
        PaginationConfig::new(SortOptions {
            default_sort_by: "parameters.parameter_code",
            default_sort_order: "ASC",
            sort_mapping: Some(sort_column),
            natural_sort_columns: &["parameters.parameter_code"],
            ..SortOptions::default()
        })
    }

    fn projection_column(alias: &str) -> Option<&'static str> {
        match alias {
            "id" => Some("parameters.id"),
            "code" | "parameter_code" => Some("parameters.parameter_code"),
            "name" | "parameter_name" => Some("parameters.parameter_name"),
            "unit" => Some("parameters.unit"),
            "category" => Some("parameters.category"),
            _ => None,
        }
    }
}
