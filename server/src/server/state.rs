//! Application state for the bookstore HTTP server.
//!
//! Contains all shared resources needed by HTTP handlers:
//! - The six stores (PostgreSQL in production, in-memory in tests)
//! - Session manager, password hasher and email sender
//! - The clock every service reads "now" from
//! - Readiness probes and the Prometheus handle
//!
//! Services are not stored; each is assembled from the state through
//! [`FromRef`] so handlers can take `State<CartService>` and friends.

use super::health::ReadinessProbe;
use axum::extract::FromRef;
use bookstore_auth::SessionManager;
use bookstore_auth::providers::{EmailSender, PasswordHasher};
use bookstore_core::environment::Clock;
use bookstore_core::store::{
    BookStore, CartStore, DiscountStore, ReviewStore, TransactionStore, UserStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Every persistence collaborator, as trait objects.
#[derive(Clone)]
pub struct Stores {
    /// Users and credentials
    pub users: Arc<dyn UserStore>,
    /// Catalog
    pub books: Arc<dyn BookStore>,
    /// Reviews and ratings
    pub reviews: Arc<dyn ReviewStore>,
    /// Carts
    pub carts: Arc<dyn CartStore>,
    /// Discounts
    pub discounts: Arc<dyn DiscountStore>,
    /// Checkout commits and history
    pub transactions: Arc<dyn TransactionStore>,
}

impl Stores {
    /// Use one backend for every store trait.
    #[must_use]
    pub fn shared<S>(store: S) -> Self
    where
        S: UserStore
            + BookStore
            + ReviewStore
            + CartStore
            + DiscountStore
            + TransactionStore
            + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            books: store.clone(),
            reviews: store.clone(),
            carts: store.clone(),
            discounts: store.clone(),
            transactions: store,
        }
    }
}

/// Session, hashing and email collaborators.
#[derive(Clone)]
pub struct AuthProviders {
    /// Issues and checks session tokens
    pub sessions: SessionManager,
    /// Password hashing
    pub hasher: Arc<dyn PasswordHasher>,
    /// Verification code delivery
    pub email: Arc<dyn EmailSender>,
}

/// Cookie attributes.
#[derive(Clone, Copy, Debug, Default)]
pub struct CookieSettings {
    /// Send cookies with the `Secure` attribute
    pub secure: bool,
}

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence
    pub stores: Stores,

    /// Auth collaborators
    pub auth: AuthProviders,

    /// Time source
    pub clock: Arc<dyn Clock>,

    /// Cookie attributes
    pub cookies: CookieSettings,

    /// Dependencies checked by `/ready`
    pub probes: Vec<Arc<dyn ReadinessProbe>>,

    /// Renders `/metrics`; `None` disables the endpoint
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state without probes or metrics.
    #[must_use]
    pub fn new(
        stores: Stores,
        auth: AuthProviders,
        clock: Arc<dyn Clock>,
        cookies: CookieSettings,
    ) -> Self {
        Self {
            stores,
            auth,
            clock,
            cookies,
            probes: Vec::new(),
            metrics: None,
        }
    }

    /// Add a readiness probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Serve `/metrics` from a Prometheus handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth.sessions.clone()
    }
}
