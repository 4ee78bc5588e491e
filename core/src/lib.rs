//! # Bookstore Core
//!
//! Domain types, business rules and persistence traits for the bookstore
//! backend.
//!
//! Everything in this crate is free of I/O. The rule modules take snapshots
//! of records and return either a new record or a typed rejection. Services
//! in the server crate load the snapshots through the [`store`] traits, run
//! the rules, and write the result back.
//!
//! ## Modules
//!
//! - [`types`]: identifiers, money and record types
//! - [`pricing`]: line prices and cart totals under active discounts
//! - [`cart`]: add and decrement rules bounded by stock
//! - [`checkout`]: checkout preconditions and the plan the store commits
//! - [`discount`]: discount window, percentage and overlap rules
//! - [`review`]: one review per user and rating aggregation
//! - [`catalog`]: catalog query parsing and book record validation
//! - [`validation`]: field validators and the field→message map
//! - [`store`]: dyn-compatible persistence traits
//! - [`error`]: store errors
//!
//! ## Example
//!
//! ```
//! use bookstore_core::pricing::discounted_unit_price;
//! use bookstore_core::types::Money;
//!
//! let unit = discounted_unit_price(Money::from_units(100), 20);
//! assert_eq!(unit, Money::from_units(80));
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod discount;
pub mod error;
pub mod pricing;
pub mod review;
pub mod store;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{Result, StoreError};

/// Environment module - injected dependencies.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use bookstore_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Copy, Clone, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
