//! Shared harness for HTTP integration tests.
//!
//! Builds the full router over the in-memory store, the in-memory session
//! store and a recording email sender, all on a fixed clock.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use axum::http::{HeaderValue, header};
use axum_test::{TestRequest, TestResponse, TestServer};
use bookstore::server::{AppState, AuthProviders, CookieSettings, Stores, build_router};
use bookstore_auth::mocks::{InMemorySessionStore, RecordingEmailSender};
use bookstore_auth::providers::{Argon2Hasher, PasswordHasher};
use bookstore_auth::{SessionConfig, SessionManager};
use bookstore_core::environment::Clock;
use bookstore_core::store::{BookStore, UserStore};
use bookstore_core::types::{Book, User};
use bookstore_testing::fixtures::{BookBuilder, UserBuilder};
use bookstore_testing::{InMemoryStore, init_tracing, test_clock};
use serde_json::Value;
use std::sync::Arc;

/// Password every seeded account logs in with.
pub const PASSWORD: &str = "Secr3t!pass";

/// A running app plus handles on its collaborators.
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryStore,
    pub sessions: InMemorySessionStore,
    pub email: RecordingEmailSender,
    hasher: Arc<Argon2Hasher>,
}

/// Tokens of a logged-in session.
pub struct Session {
    pub user: User,
    pub access: String,
    pub refresh: String,
}

impl Session {
    /// `Cookie` header carrying both tokens.
    pub fn cookies(&self) -> HeaderValue {
        HeaderValue::from_str(&format!(
            "accessToken={}; refreshToken={}",
            self.access, self.refresh
        ))
        .unwrap()
    }
}

/// Attach a session's cookies to a request.
pub trait WithSession {
    fn with_session(self, session: &Session) -> Self;
}

impl WithSession for TestRequest {
    fn with_session(self, session: &Session) -> Self {
        self.add_header(header::COOKIE, session.cookies())
    }
}

impl TestApp {
    pub fn new() -> Self {
        init_tracing();
        let store = InMemoryStore::new();
        let sessions = InMemorySessionStore::new();
        let email = RecordingEmailSender::new();
        let hasher = Arc::new(Argon2Hasher::with_params(1024, 1, 1).unwrap());

        let auth = AuthProviders {
            sessions: SessionManager::new(Arc::new(sessions.clone()), SessionConfig::default()),
            hasher: hasher.clone(),
            email: Arc::new(email.clone()),
        };
        let state = AppState::new(
            Stores::shared(store.clone()),
            auth,
            Arc::new(test_clock()),
            CookieSettings::default(),
        );

        Self {
            server: TestServer::new(build_router(state)).unwrap(),
            store,
            sessions,
            email,
            hasher,
        }
    }

    async fn seed(&self, builder: UserBuilder) -> User {
        let hash = self.hasher.hash(PASSWORD).unwrap();
        let (user, credential) = builder.password_hash(&hash).build();
        self.store.create_account(user.clone(), credential).await.unwrap();
        user
    }

    /// A verified customer in `BD` with the given balance.
    pub async fn customer(&self, email: &str, balance: i64) -> User {
        self.seed(UserBuilder::new(email, test_clock().now()).balance(balance))
            .await
    }

    /// A verified administrator.
    pub async fn admin(&self, email: &str) -> User {
        self.seed(UserBuilder::new(email, test_clock().now()).admin())
            .await
    }

    /// An account built by hand, with the shared password.
    pub async fn account(&self, builder: UserBuilder) -> User {
        self.seed(builder).await
    }

    /// A book with the given unit price and stock.
    pub async fn book(&self, title: &str, price: i64, stock: u32) -> Book {
        let book = BookBuilder::new(title).price(price).stock(stock).build();
        self.store.insert_book(book.clone()).await.unwrap();
        book
    }

    /// Log in through the API and keep the session cookies.
    pub async fn login(&self, user: User) -> Session {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&serde_json::json!({ "email": user.email, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        Session {
            access: response.cookie("accessToken").value().to_string(),
            refresh: response.cookie("refreshToken").value().to_string(),
            user,
        }
    }

    /// Seed a customer and log in.
    pub async fn logged_in_customer(&self, email: &str, balance: i64) -> Session {
        let user = self.customer(email, balance).await;
        self.login(user).await
    }

    /// Seed an administrator and log in.
    pub async fn logged_in_admin(&self, email: &str) -> Session {
        let user = self.admin(email).await;
        self.login(user).await
    }
}

/// Response body as JSON.
pub fn body(response: &TestResponse) -> Value {
    response.json::<Value>()
}
