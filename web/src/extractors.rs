//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id
//! - [`ValidJson`], [`ValidQuery`], [`ValidPath`]: axum's extractors with
//!   rejections rendered as envelope errors instead of plain text
//!
//! # Examples
//!
//! ```ignore
//! use bookstore_web::{CorrelationId, ValidJson};
//!
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     ValidJson(request): ValidJson<AddToCartRequest>,
//! ) -> Result<ApiResponse<CartView>, AppError> {
//!     tracing::info!(%correlation_id, "Adding to cart");
//!     ...
//! }
//! ```

use crate::error::{AppError, VALIDATION_MESSAGE};
use crate::middleware::CorrelationId;
use axum::{
    async_trait,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};

/// Reads the id stored by [`request_context`](crate::middleware::request_context),
/// or derives one from the headers when the middleware is not installed.
#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CorrelationId>()
            .copied()
            .unwrap_or_else(|| CorrelationId::from_headers(&parts.headers)))
    }
}

/// JSON body; malformed bodies and unknown fields become a 422 envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

/// Query string; undecodable queries become a 422 envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);

/// Path parameters; unparsable ids become a 422 envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ValidPath<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::unprocessable(VALIDATION_MESSAGE)
            .with_data(serde_json::json!({ "body": rejection.body_text() }))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::unprocessable(VALIDATION_MESSAGE)
            .with_data(serde_json::json!({ "query": rejection.body_text() }))
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        Self::unprocessable("Invalid id provided")
    }
}
