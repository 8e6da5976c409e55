//! Process-level settings.
//!
//! ```text
//! DATABASE_URL=postgres://app@localhost/reference_data
//! DATABASE_MAX_CONNECTIONS=10
//! DATABASE_SQLX_LOGGING=false
//! LIST_SIMILARITY_THRESHOLD=0.30
//! LIST_MAX_PER_PAGE=100
//! ```

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use serde::Deserialize;

use crate::search::DEFAULT_SIMILARITY_THRESHOLD;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/reference_data";
pub const DEFAULT_MAX_PER_PAGE: u64 = 100;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub sqlx_logging: bool,
    /// Used when a search descriptor has no override; always within `[0, 1]`
    pub similarity_threshold: f64,
    /// `0` disables the page-size cap
    pub max_per_page: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            sqlx_logging: false,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_per_page: DEFAULT_MAX_PER_PAGE,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment, keeping defaults for unset or
    /// unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, so callers and tests can supply their own source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.database_url),
            max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.max_connections),
            sqlx_logging: parsed(&lookup, "DATABASE_SQLX_LOGGING").unwrap_or(defaults.sqlx_logging),
            similarity_threshold: parsed::<f64>(&lookup, "LIST_SIMILARITY_THRESHOLD")
                .filter(|t| t.is_finite())
                .map_or(defaults.similarity_threshold, |t| t.clamp(0.0, 1.0)),
            max_per_page: parsed(&lookup, "LIST_MAX_PER_PAGE").unwrap_or(defaults.max_per_page),
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, "ignoring unparsable setting");
            None
        }
    }
}

/// Opens the connection pool described by `settings`.
///
/// # Errors
///
/// Returns the connection error from Sea-ORM.
pub async fn connect(settings: &Settings) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(settings.database_url.clone());
    options
        .max_connections(settings.max_connections)
        .sqlx_logging(settings.sqlx_logging);
    Database::connect(options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(Settings::from_lookup(lookup(&[])), Settings::default());
    }

    #[test]
    fn test_reads_values() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/test"),
            ("LIST_SIMILARITY_THRESHOLD", "0.45"),
            ("LIST_MAX_PER_PAGE", "0"),
            ("DATABASE_SQLX_LOGGING", "true"),
        ]));
        assert_eq!(settings.database_url, "postgres://db/test");
        assert!((settings.similarity_threshold - 0.45).abs() < f64::EPSILON);
        assert_eq!(settings.max_per_page, 0);
        assert!(settings.sqlx_logging);
    }

    #[test]
    fn test_threshold_is_clamped_and_validated() {
        let high = Settings::from_lookup(lookup(&[("LIST_SIMILARITY_THRESHOLD", "4")]));
        assert!((high.similarity_threshold - 1.0).abs() < f64::EPSILON);

        let junk = Settings::from_lookup(lookup(&[("LIST_SIMILARITY_THRESHOLD", "lots")]));
        assert!((junk.similarity_threshold - DEFAULT_SIMILARITY_THRESHOLD).abs() < f64::EPSILON);

        let nan = Settings::from_lookup(lookup(&[("LIST_SIMILARITY_THRESHOLD", "NaN")]));
        assert!((nan.similarity_threshold - DEFAULT_SIMILARITY_THRESHOLD).abs() < f64::EPSILON);
    }
}
