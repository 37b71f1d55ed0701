use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use muralist_core::error::CoreError;
use muralist_core::storage::StorageError;
use muralist_db::error::LedgerError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds persistence and
/// internal variants. Implements [`IntoResponse`] to produce
/// consistent `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `muralist_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A job ledger error.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An artifact store error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::NotReady(msg) => (StatusCode::CONFLICT, "NOT_READY", msg.clone()),
                CoreError::Internal(msg) => internal(msg),
            },

            // --- Persistence errors ---
            AppError::Ledger(err) => match err {
                LedgerError::AlreadyExists(id) => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Generation {id} already exists"),
                ),
                LedgerError::InvalidPatch(msg) => internal(msg),
                LedgerError::Database(db) => classify_sqlx_error(db),
            },
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Storage(err) => match err {
                StorageError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "Image file not found".to_string(),
                ),
                other => internal(&other.to_string()),
            },

            // --- HTTP-specific errors ---
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Log the real cause and return a sanitized 500.
fn internal(msg: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (23505) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("Duplicate value violates unique constraint: {constraint}"),
            )
        }
        other => internal(&other.to_string()),
    }
}
