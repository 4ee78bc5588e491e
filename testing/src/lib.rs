//! # Bookstore Testing
//!
//! Testing utilities for the bookstore backend.
//!
//! This crate provides:
//! - [`FixedClock`] and [`test_clock`] for deterministic time
//! - [`InMemoryStore`], implementing every store trait over one mutex
//! - [`fixtures`] builders for users, books and discounts
//!
//! ## Example
//!
//! ```
//! use bookstore_core::store::BookStore;
//! use bookstore_testing::{InMemoryStore, fixtures::BookBuilder};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let book = BookBuilder::new("Programming Rust").stock(20).build();
//! store.insert_book(book.clone()).await.unwrap();
//! assert_eq!(store.find_book(book.id).await.unwrap(), Some(book));
//! # });
//! ```

use chrono::{DateTime, Utc};
use bookstore_core::environment::Clock;

pub mod fixtures;
mod store;

pub use store::InMemoryStore;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use bookstore_testing::mocks::FixedClock;
    /// use bookstore_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Installs a `tracing` subscriber writing to the test harness output.
///
/// Safe to call from several tests; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("bookstore=debug")
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
