use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use painel_core::error::CoreError;
use painel_pipeline::{FlowError, SessionError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps domain errors and adds HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Operator action that the import flow refused.
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type ErrorParts = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Flow(flow) => classify_flow_error(flow),
            AppError::Session(session) => classify_session_error(session),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> ErrorParts {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(err: &CoreError) -> ErrorParts {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
    }
}

fn classify_flow_error(err: &FlowError) -> ErrorParts {
    match err {
        FlowError::Core(core) => classify_core_error(core),
        FlowError::Session(session) => classify_session_error(session),
        FlowError::EmptySelection => (
            StatusCode::BAD_REQUEST,
            "EMPTY_SELECTION",
            err.to_string(),
        ),
        FlowError::NoFile | FlowError::Busy | FlowError::NotConfirmed => {
            (StatusCode::CONFLICT, "CONFLICT", err.to_string())
        }
    }
}

fn classify_session_error(err: &SessionError) -> ErrorParts {
    match err {
        SessionError::EmptySelection => (
            StatusCode::BAD_REQUEST,
            "EMPTY_SELECTION",
            err.to_string(),
        ),
        SessionError::InvalidTransition { .. } | SessionError::StaleRun { .. } => {
            (StatusCode::CONFLICT, "INVALID_STATE", err.to_string())
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorParts {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
