//! Axum integration for the bookstore API.
//!
//! The imperative shell around the domain crates:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         HTTP shell (Axum)               │  ← correlation ids, cookies
//! │  - Typed extraction (ValidJson, ...)    │  ← 422 envelopes on rejection
//! │  - Envelope rendering (ApiResponse)     │  ← {status, message, data}
//! ├─────────────────────────────────────────┤
//! │         Services + stores               │
//! │  - Pure rules in bookstore-core         │
//! │  - Store traits over PostgreSQL         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** gets its correlation id and span
//! 2. **Extract** session, body, query and path
//! 3. **Call** the service
//! 4. **Render** `ApiResponse` or `AppError` into the envelope

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ValidJson, ValidPath, ValidQuery};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, request_context};
pub use response::{ApiResponse, Envelope};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
