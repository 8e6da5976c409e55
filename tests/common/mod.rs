#![allow(dead_code)]

use axum::{Json, Router, extract::State, routing::get};
use chrono::{TimeZone, Utc};
use listcrate::{
    ApiError, BoundedListParams, Page, Settings, UnboundedListParams,
    resources::{self, Regions, region},
};
use sea_orm::{
    ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, Statement,
    Value,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Row shape `PaginatorTrait::count` reads back on Postgres.
pub fn count_row(total: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(total)))])
}

pub fn region(code: &str, name: &str) -> region::Model {
    region::Model {
        id: Uuid::new_v4(),
        code: code.to_string(),
        name: name.to_string(),
        level: "province".to_string(),
        parent_code: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        deleted_at: None,
    }
}

/// Mock connection answering one count and one page fetch.
pub fn mock_regions(total: i64, rows: Vec<region::Model>) -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![count_row(total)]])
        .append_query_results([rows])
        .into_connection()
}

/// Mock connection whose first query fails.
pub fn mock_failure(message: &str) -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([DbErr::Custom(message.to_string())])
        .into_connection()
}

async fn bounded_regions(
    State(db): State<Arc<DatabaseConnection>>,
    BoundedListParams(params): BoundedListParams,
) -> Result<Json<Page<region::Model>>, ApiError> {
    let page = resources::list(db.as_ref(), &Regions, &params, &Settings::default()).await?;
    Ok(Json(page))
}

async fn unbounded_regions(
    State(db): State<Arc<DatabaseConnection>>,
    UnboundedListParams(params): UnboundedListParams,
) -> Result<Json<Page<region::Model>>, ApiError> {
    let page = resources::list(db.as_ref(), &Regions, &params, &Settings::default()).await?;
    Ok(Json(page))
}

/// The mock connection is not `Clone`, so handlers share it through an `Arc`.
pub fn setup_regions_app(db: DatabaseConnection) -> Router {
    let api = Router::new()
        .route("/regions", get(bounded_regions))
        .route("/regions/export", get(unbounded_regions))
        .with_state(Arc::new(db));

    Router::new().nest("/api/v1", api)
}

/// Connects to the database named by `DATABASE_URL` when it is a Postgres URL.
///
/// Tests that need real trigram matching return early when this is `None`.
pub async fn postgres() -> Option<DatabaseConnection> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let url = std::env::var("DATABASE_URL").ok()?;
    if !url.starts_with("postgres") {
        return None;
    }
    let db = Database::connect(&url).await.ok()?;
    if let Err(err) = prepare_schema(&db).await {
        eprintln!("skipping Postgres tests: {err}");
        return None;
    }
    Some(db)
}

async fn prepare_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    for sql in [
        "CREATE EXTENSION IF NOT EXISTS pg_trgm",
        "DROP TABLE IF EXISTS expeditions",
        "DROP TABLE IF EXISTS regions",
        "CREATE TABLE regions (
            id uuid PRIMARY KEY,
            code text NOT NULL UNIQUE,
            name text NOT NULL,
            level text NOT NULL,
            parent_code text,
            created_at timestamptz NOT NULL DEFAULT now(),
            deleted_at timestamptz
        )",
        "CREATE TABLE expeditions (
            id uuid PRIMARY KEY,
            expedition_code text NOT NULL,
            expedition_name text NOT NULL,
            region_code text NOT NULL,
            status text NOT NULL,
            created_at timestamptz NOT NULL DEFAULT now(),
            deleted_at timestamptz
        )",
    ] {
        db.execute(Statement::from_string(DatabaseBackend::Postgres, sql))
            .await?;
    }
    Ok(())
}

pub async fn insert_region(db: &DatabaseConnection, code: &str, name: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        "INSERT INTO regions (id, code, name, level) VALUES ($1, $2, $3, 'province')",
        [Uuid::new_v4().into(), code.into(), name.into()],
    ))
    .await
    .map(|_| ())
}

pub async fn insert_expedition(
    db: &DatabaseConnection,
    code: &str,
    name: &str,
    region_code: &str,
) -> Result<(), DbErr> {
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        "INSERT INTO expeditions (id, expedition_code, expedition_name, region_code, status) \
         VALUES ($1, $2, $3, $4, 'active')",
        [Uuid::new_v4().into(), code.into(), name.into(), region_code.into()],
    ))
    .await
    .map(|_| ())
}
