//! The `{status, message, data}` response envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// JSON body of every API response.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// HTTP status code, repeated in the body
    pub status: u16,
    /// Human-readable outcome
    pub message: String,
    /// Payload, `null` when absent
    pub data: Option<T>,
}

/// Successful handler response.
///
/// # Examples
///
/// ```
/// use axum::http::StatusCode;
/// use bookstore_web::ApiResponse;
///
/// let response = ApiResponse::created("Review added successfully", 4.5);
/// assert_eq!(response.status(), StatusCode::CREATED);
///
/// let empty = ApiResponse::message(StatusCode::OK, "Logged out successfully");
/// assert_eq!(empty.status(), StatusCode::OK);
/// ```
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: String,
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a response with a payload.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status,
            message: message.into(),
            data: Some(data),
        }
    }

    /// 200 with a payload.
    #[must_use]
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, message, data)
    }

    /// 201 with a payload.
    #[must_use]
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::CREATED, message, data)
    }

    /// 202 with a payload.
    #[must_use]
    pub fn accepted(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::ACCEPTED, message, data)
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Payload, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }
}

impl ApiResponse<()> {
    /// Response with `data: null`.
    #[must_use]
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            status: self.status.as_u16(),
            message: self.message,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}
