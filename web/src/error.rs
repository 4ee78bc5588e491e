//! Error type for web handlers.
//!
//! [`AppError`] bridges domain errors and HTTP responses. Every error is
//! rendered in the same envelope as a successful response:
//!
//! ```json
//! { "status": 422, "message": "Unprocessable entity", "data": { "email": "Invalid email address" } }
//! ```

use crate::response::Envelope;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bookstore_auth::AuthError;
use bookstore_core::StoreError;
use bookstore_core::checkout::CheckoutRejection;
use bookstore_core::validation::ValidationErrors;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Message of every 500 response.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Message of every field-validation 422 response.
pub const VALIDATION_MESSAGE: &str = "Unprocessable entity";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<ApiResponse<Book>, AppError> {
///     let book = store.find_book(id).await?
///         .ok_or_else(|| AppError::not_found("No book found"))?;
///     Ok(ApiResponse::ok("Successfully got the book", book))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Optional payload, e.g. a field → message map
    data: Option<Value>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    /// Attach a payload to the envelope's `data` field.
    #[must_use]
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Envelope payload, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create a 422 Unprocessable Entity error with a business message.
    #[must_use]
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// Create a 422 error carrying a field → message map.
    #[must_use]
    pub fn validation(errors: ValidationErrors) -> Self {
        Self::unprocessable(VALIDATION_MESSAGE).with_data(errors)
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    /// Create a 502 Bad Gateway error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            metrics::counter!("bookstore.http.server_errors", "status" => self.status.as_u16().to_string())
                .increment(1);
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = Envelope {
            status: self.status.as_u16(),
            message: self.message,
            data: self.data,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal().with_source(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}

impl From<CheckoutRejection> for AppError {
    fn from(rejection: CheckoutRejection) -> Self {
        let message = rejection.to_string();
        match rejection {
            CheckoutRejection::InsufficientStock(book_ids) => {
                Self::unprocessable(message).with_data(book_ids)
            }
            _ => Self::unprocessable(message),
        }
    }
}

/// Store errors without a more specific mapping in the service.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::bad_request(message),
            StoreError::CheckoutRejected(rejection) => rejection.into(),
            other => Self::internal().with_source(anyhow::Error::new(other)),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        if err.requires_login() {
            Self::unauthorized("Please login again")
        } else {
            Self::internal().with_source(anyhow::Error::new(err))
        }
    }
}
