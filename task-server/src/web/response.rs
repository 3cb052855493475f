//! Uniform JSON envelope shared by every endpoint.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Body of every successful response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEnvelope<T> {
    status: &'static str,
    status_code: u16,
    message: String,
    data: T,
}

impl<T: Serialize> SuccessEnvelope<T> {
    pub fn new(data: T, message: impl Into<String>, status_code: StatusCode) -> Self {
        Self {
            status: "success",
            status_code: status_code.as_u16(),
            message: message.into(),
            data,
        }
    }
}

/// Body of every failed response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// HTTP status code, repeated from the response line
    status_code: u16,
    /// Always `error`
    status: String,
    /// Human-readable description of what went wrong
    message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, status_code: StatusCode) -> Self {
        Self {
            status_code: status_code.as_u16(),
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Wraps `data` in a success envelope and sets the same status on the response.
pub fn send_success<T: Serialize>(
    data: T,
    message: impl Into<String>,
    status_code: StatusCode,
) -> Response {
    (
        status_code,
        Json(SuccessEnvelope::new(data, message, status_code)),
    )
        .into_response()
}

/// Shorthand for [`send_success`] with `200 OK`.
pub fn send_ok<T: Serialize>(data: T, message: impl Into<String>) -> Response {
    send_success(data, message, StatusCode::OK)
}

pub fn send_error(message: impl Into<String>, status_code: StatusCode) -> Response {
    (status_code, Json(ErrorEnvelope::new(message, status_code))).into_response()
}
