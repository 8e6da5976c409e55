//! Paginated, searchable, sortable listings over Postgres reference data.
//!
//! ```rust,ignore
//! use axum::{Json, extract::State};
//! use listcrate::{ApiError, BoundedListParams, Page, Settings, resources::{self, Regions, region}};
//!
//! async fn list_regions(
//!     State((db, settings)): State<(DatabaseConnection, Settings)>,
//!     BoundedListParams(params): BoundedListParams,
//! ) -> Result<Json<Page<region::Model>>, ApiError> {
//!     Ok(Json(resources::list(&db, &Regions, &params, &settings).await?))
//! }
//! ```

pub mod config;
pub mod errors;
pub mod filtering;
pub mod identifier;
pub mod pagination;
pub mod query;
pub mod request;
pub mod resources;
pub mod search;
pub mod sort;

pub use config::Settings;
pub use errors::ApiError;
pub use filtering::{FilterDescriptor, FilterRule, FilterValueType, FilterValues};
pub use identifier::is_safe_identifier;
pub use pagination::{Page, PaginationConfig, compose, compose_export, paginate, paginate_projected};
pub use query::ListQuery;
pub use request::{BoundedListParams, IngestionMode, ListParams, PageRequest, UnboundedListParams};
pub use resources::ListResource;
pub use search::{SearchDescriptor, StaticSearch, apply_search, build_search_clause};
pub use search::raw::{ClauseType, RawSearchClause, build_raw_search_clause};
pub use sort::{SortExpression, SortOptions, SortOrder, resolve_sort};
