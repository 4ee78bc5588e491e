//! Per-request context: correlation id, tracing span and completion log.
//!
//! [`request_context`] runs before every handler. It takes the caller's
//! `x-correlation-id` when it is a UUID and mints one otherwise, stores it as
//! a [`CorrelationId`] extension, wraps the rest of the stack in an
//! `http_request` span and echoes the id on the response.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn};
//! use bookstore_web::middleware::request_context;
//!
//! let app = Router::new()
//!     .route("/api/cart/cartByUser", get(get_cart))
//!     .layer(from_fn(request_context));
//! ```

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation id in both directions.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Correlation id of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// The caller's id from `headers`, or a fresh one.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let supplied = headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok());
        Self(supplied.unwrap_or_else(Uuid::new_v4))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Middleware installing the request context.
///
/// Logs one `Request completed` event per request at debug level, or at
/// warn level for 5xx responses.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let correlation_id = CorrelationId::from_headers(req.headers());
    req.extensions_mut().insert(correlation_id);

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let started = Instant::now();
        let mut response = next.run(req).await;
        let status = response.status().as_u16();
        let latency_ms = started.elapsed().as_millis();
        if response.status().is_server_error() {
            tracing::warn!(status, latency_ms, "Request completed");
        } else {
            tracing::debug!(status, latency_ms, "Request completed");
        }

        if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}
