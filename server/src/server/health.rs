//! Health check endpoints for the bookstore.
//!
//! `/health` is a liveness check. `/ready` runs every registered
//! [`ReadinessProbe`] and reports 503 if any dependency is down.

use super::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use bookstore_auth::stores::RedisSessionStore;
use bookstore_postgres::PostgresStore;
use bookstore_web::handlers::health::{ComponentHealth, HealthReport, readiness};
use futures::future::join_all;
use std::future::Future;
use std::pin::Pin;

pub use bookstore_web::handlers::health::health_check;

/// Boxed future returned by [`ReadinessProbe::check`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = ComponentHealth> + Send + 'a>>;

/// A dependency checked by `/ready`.
pub trait ReadinessProbe: Send + Sync {
    /// Check the dependency.
    fn check(&self) -> ProbeFuture<'_>;
}

/// Pings `PostgreSQL`.
#[derive(Clone, Debug)]
pub struct PostgresProbe(pub PostgresStore);

impl ReadinessProbe for PostgresProbe {
    fn check(&self) -> ProbeFuture<'_> {
        Box::pin(async move { ComponentHealth::from_result("postgres", self.0.ping().await) })
    }
}

/// Pings the Redis session store.
#[derive(Clone)]
pub struct RedisProbe(pub RedisSessionStore);

impl ReadinessProbe for RedisProbe {
    fn check(&self) -> ProbeFuture<'_> {
        Box::pin(async move { ComponentHealth::from_result("redis", self.0.ping().await) })
    }
}

/// Readiness check endpoint.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8000/ready
/// # {"status":"Healthy","components":[{"component":"postgres","status":"Healthy"}, ...]}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let components = join_all(state.probes.iter().map(|probe| probe.check())).await;
    readiness(components)
}
