//! Centralized translation of handler failures into error envelopes.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sea_orm::{DbErr, IdenStatic, Iterable, SqlErr};

use crate::config::AppEnv;
use crate::entities::task;
use crate::task::ValidationError;
use crate::web::response::send_error;

const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Every failure a handler can surface.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A uniqueness rule caught by the application before touching storage.
    #[error("{0}")]
    Duplicate(String),
    /// The referenced record does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Any failure reported by the database layer.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// Anything else.
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationError::single(
            "body",
            format!("Invalid JSON body: {}", rejection.body_text()),
        ))
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::Validation(ValidationError::single("id", "Task id must be an integer"))
    }
}

impl ApiError {
    /// Maps the error to the status and message sent to the client.
    ///
    /// Outside production, unclassified errors expose their own text.
    pub fn classify(&self, env: AppEnv) -> (StatusCode, String) {
        match self {
            ApiError::Validation(error) => (StatusCode::BAD_REQUEST, error.to_string()),
            ApiError::Duplicate(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ApiError::Database(error) => classify_db_error(error),
            ApiError::Unknown(error) => {
                let message = if env.is_production() {
                    FALLBACK_MESSAGE.to_string()
                } else {
                    error.to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }

    fn log(&self) {
        match self {
            ApiError::Validation(error) => {
                tracing::warn!(errors = ?error.errors(), "Validation failed: {}", error)
            }
            ApiError::Duplicate(message) => tracing::warn!("Duplicate entry: {}", message),
            ApiError::NotFound(message) => tracing::warn!("Not found: {}", message),
            ApiError::Database(error) => match error.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(detail)) => {
                    tracing::warn!("Unique constraint violation: {}", detail)
                }
                _ => tracing::error!(error = ?error, "Database operation failed: {}", error),
            },
            ApiError::Unknown(error) => {
                tracing::error!(error = ?error, "Unhandled error: {:#}", error)
            }
        }
    }
}

fn classify_db_error(error: &DbErr) -> (StatusCode, String) {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = error.sql_err() {
        return (
            StatusCode::BAD_REQUEST,
            format!("Duplicate value for field: {}", offending_field(&detail)),
        );
    }
    match error {
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => {
            (StatusCode::NOT_FOUND, "Resource not found".to_string())
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database operation failed".to_string(),
        ),
    }
}

/// Finds which task column a constraint violation refers to, by matching the
/// words of the reported constraint name against the column names.
fn offending_field(detail: &str) -> String {
    let words: Vec<&str> = detail
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|word| !word.is_empty())
        .collect();

    task::Column::iter()
        .find(|column| {
            let name = column.as_str();
            let infix = format!("_{name}_");
            words
                .iter()
                .any(|word| *word == name || word.contains(&infix))
        })
        .map(|column| column.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Carries a rendered error to [`translate_errors`], which re-renders it for
/// the configured environment.
#[derive(Clone)]
struct PendingError(Arc<ApiError>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let (status_code, message) = self.classify(AppEnv::Production);
        let mut response = send_error(message, status_code);
        response.extensions_mut().insert(PendingError(Arc::new(self)));
        response
    }
}

/// Terminal error handler: every [`ApiError`] returned below this middleware
/// is rendered once more with the messages allowed for `env`.
pub async fn translate_errors(
    State(env): State<AppEnv>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<PendingError>() {
        Some(PendingError(error)) => {
            let (status_code, message) = error.classify(env);
            send_error(message, status_code)
        }
        None => response,
    }
}

/// Builds the 500 response for a panicking handler.
///
/// Panics are the unclassified failures of this service, so they are
/// rendered through [`ApiError::Unknown`].
pub fn panic_response(
    env: AppEnv,
) -> impl Fn(Box<dyn std::any::Any + Send + 'static>) -> Response + Clone {
    move |panic| {
        let detail = panic
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| panic.downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic")
            .to_string();
        let error = ApiError::Unknown(anyhow::anyhow!("Handler panicked: {detail}"));
        error.log();
        let (status_code, message) = error.classify(env);
        send_error(message, status_code)
    }
}
