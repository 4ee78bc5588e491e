//! HTTP handlers shared by every bookstore deployment.

pub mod health;

pub use health::{ComponentHealth, HealthReport, HealthStatus, health_check, readiness};
