//! `PostgreSQL` store for the bookstore backend.
//!
//! [`PostgresStore`] implements every trait in `bookstore_core::store` over
//! one connection pool:
//!
//! - Unique constraints back the email, book and discount-overlap rules
//! - Carts carry a version column for optimistic concurrency
//! - Checkout runs in one transaction with row locks and conditional updates
//! - Review mutations recompute the book rating in the same transaction
//!
//! # Example
//!
//! ```no_run
//! use bookstore_postgres::PostgresStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresStore::connect("postgres://localhost/bookstore", 10).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use bookstore_core::error::{Result, StoreError};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

mod books;
mod carts;
mod discounts;
mod reviews;
mod rows;
mod transactions;
mod users;

/// `PostgreSQL` implementation of the store traits.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Cheap liveness query used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the database is unreachable.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to ping database: {e}")))?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a unique violation to [`StoreError::Conflict`] and anything else to
/// [`StoreError::DatabaseError`].
fn write_error(action: &str, conflict: &str, e: &sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(conflict.to_string());
        }
    }
    StoreError::DatabaseError(format!("Failed to {action}: {e}"))
}
