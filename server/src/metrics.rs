//! Business metrics for the bookstore.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `bookstore.checkout.completed` - Checkouts committed
//! - `bookstore.checkout.rejected{reason}` - Checkouts refused before or during commit
//! - `bookstore.cart.mutations{operation}` - Cart adds and decrements saved
//! - `bookstore.auth.logins{outcome}` - Login attempts
//! - `bookstore.http.server_errors{status}` - 5xx responses (recorded by `bookstore-web`)

use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Checkouts committed.
pub const CHECKOUT_COMPLETED: &str = "bookstore.checkout.completed";

/// Checkouts refused.
pub const CHECKOUT_REJECTED: &str = "bookstore.checkout.rejected";

/// Cart mutations saved.
pub const CART_MUTATIONS: &str = "bookstore.cart.mutations";

/// Login attempts.
pub const AUTH_LOGINS: &str = "bookstore.auth.logins";

/// Register descriptions for every business metric.
///
/// Call once at startup, after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(CHECKOUT_COMPLETED, "Number of checkouts committed");
    describe_counter!(
        CHECKOUT_REJECTED,
        "Number of checkouts refused, by rejection reason"
    );
    describe_counter!(
        CART_MUTATIONS,
        "Number of cart mutations saved, by operation (add, remove)"
    );
    describe_counter!(AUTH_LOGINS, "Number of login attempts, by outcome");
    describe_counter!(
        "bookstore.http.server_errors",
        "Number of responses with a 5xx status"
    );
}

/// Install the Prometheus recorder and return the handle rendering `/metrics`.
///
/// # Errors
///
/// Returns error if a global recorder is already installed.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}
