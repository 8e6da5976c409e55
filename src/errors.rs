//! # Error Handling for List Endpoints
//!
//! The query core reports only two kinds of failure:
//! - **Invalid parameter** (400): a bounded listing received `per_page=0`, or
//!   `filter[]` was not a JSON array of filter entries
//! - **Database** (500): the `COUNT` or the page `SELECT` failed, including
//!   timeouts and cancelled statements
//!
//! Unsafe or unknown sort and search input never produces an error; it degrades to
//! the defaults instead.
//!
//! Database details are logged with `tracing` and never sent to clients.
//!
//! ```rust,ignore
//! use listcrate::{ApiError, BoundedListParams, resources::{self, Regions}};
//!
//! async fn list_regions(
//!     State(db): State<DatabaseConnection>,
//!     BoundedListParams(params): BoundedListParams,
//! ) -> Result<Json<Vec<region::Model>>, ApiError> {
//!     let page = resources::list(&db, &Regions, &params, &Settings::default()).await?;
//!     Ok(Json(page.rows))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - A list parameter could not be accepted
    InvalidParameter {
        /// User-facing error message
        message: String,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },
}

impl ApiError {
    /// Create a 400 error for a rejected list parameter
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            Self::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller, rather than the server, is at fault
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    fn user_message(&self) -> &str {
        match self {
            Self::InvalidParameter { message } | Self::Database { message, .. } => message,
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::InvalidParameter { .. } => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let body = Json(ErrorResponse {
            error: self.user_message(),
        });
        (self.status_code(), body).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database { internal, .. } => Some(internal),
            Self::InvalidParameter { .. } => None,
        }
    }
}

/// Every `DbErr` from the count or the page fetch is a server error.
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::database(err)
    }
}
