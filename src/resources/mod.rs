//! Reference-data resources and their list descriptors.
//!
//! Each resource module holds a Sea-ORM entity plus a unit descriptor declaring
//! which columns are searched, which filters exist, how `sort_by` keys map to
//! columns and which aliases may be projected.

pub mod expedition;
pub mod parameter;
pub mod permission;
pub mod region;
pub mod role;

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Select};
use tracing::Instrument;

use crate::config::Settings;
use crate::filtering::FilterDescriptor;
use crate::pagination::{Page, PaginationConfig, compose_export, paginate, paginate_projected};
use crate::query::ListQuery;
use crate::request::ListParams;
use crate::search::SearchDescriptor;

pub use expedition::Expeditions;
pub use parameter::Parameters;
pub use permission::Permissions;
pub use region::Regions;
pub use role::Roles;

/// A resource that can be listed through the pagination executor.
pub trait ListResource: SearchDescriptor + FilterDescriptor {
    type Entity: EntityTrait;

    const RESOURCE_NAME_PLURAL: &'static str;

    /// Select scoped to live rows of this resource
    fn base_query(&self) -> ListQuery<Self::Entity>;

    /// Sort defaults, mapping and natural-sort columns for this resource
    fn pagination_config(&self) -> PaginationConfig<'static>;

    /// Column behind a projection alias, or `None` when the alias is not exposed
    fn projection_column(alias: &str) -> Option<&'static str>;
}

/// Lists one page of `resource` as entity models.
///
/// # Errors
///
/// Returns the database error from the count or the fetch.
pub async fn list<R, C>(
    db: &C,
    resource: &R,
    params: &ListParams,
    settings: &Settings,
) -> Result<Page<<R::Entity as EntityTrait>::Model>, DbErr>
where
    R: ListResource,
    <R::Entity as EntityTrait>::Model: Sync,
    C: ConnectionTrait,
{
    let config = resource.pagination_config().with_settings(settings);
    paginate(
        db,
        resource.base_query(),
        resource,
        &params.request,
        &params.filter,
        &config,
    )
    .instrument(tracing::debug_span!("list", resource = R::RESOURCE_NAME_PLURAL))
    .await
}

/// Lists one page of `resource` restricted to the requested projections.
///
/// # Errors
///
/// Returns the database error from the count or the fetch.
pub async fn list_projected<R, C>(
    db: &C,
    resource: &R,
    params: &ListParams,
    settings: &Settings,
) -> Result<Page<serde_json::Value>, DbErr>
where
    R: ListResource,
    <R::Entity as EntityTrait>::Model: Sync,
    C: ConnectionTrait,
{
    let config = resource.pagination_config().with_settings(settings);
    paginate_projected(
        db,
        resource.base_query(),
        resource,
        &params.request,
        &params.filter,
        &config,
        R::projection_column,
    )
    .instrument(tracing::debug_span!("list_projected", resource = R::RESOURCE_NAME_PLURAL))
    .await
}

/// Ordered select over every matching row, for spreadsheet export.
#[must_use]
pub fn export_select<R: ListResource>(
    resource: &R,
    params: &ListParams,
    settings: &Settings,
) -> Select<R::Entity> {
    let config = resource.pagination_config().with_settings(settings);
    let request = &params.request;
    compose_export(
        resource.base_query(),
        resource,
        request.search(),
        &params.filter,
        Some(request.sort_by()),
        Some(request.sort_order()),
        &config,
    )
}
