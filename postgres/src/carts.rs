//! Carts with optimistic versioning.
//!
//! `save_cart` only writes when the stored version equals the version the
//! caller read; the conditional `UPDATE` takes the row lock for the rest of
//! the transaction.

use crate::PostgresStore;
use crate::rows::{CartRow, to_i32};
use bookstore_core::error::StoreError;
use bookstore_core::store::{CartStore, StoreFuture};
use bookstore_core::types::{Cart, CartId, UserId};

const CART_SELECT: &str = r"
    SELECT c.id, c.user_id, c.version,
           ARRAY(SELECT l.book_id FROM cart_lines l WHERE l.cart_id = c.id ORDER BY l.position)
               AS book_ids,
           ARRAY(SELECT l.quantity FROM cart_lines l WHERE l.cart_id = c.id ORDER BY l.position)
               AS quantities
    FROM carts c
";

impl CartStore for PostgresStore {
    fn find_cart_by_user(&self, user_id: UserId) -> StoreFuture<'_, Option<Cart>> {
        Box::pin(async move {
            let row: Option<CartRow> = sqlx::query_as(&format!("{CART_SELECT} WHERE c.user_id = $1"))
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to get cart: {e}")))?;
            row.map(Cart::try_from).transpose()
        })
    }

    fn find_cart(&self, cart_id: CartId) -> StoreFuture<'_, Option<Cart>> {
        Box::pin(async move {
            let row: Option<CartRow> = sqlx::query_as(&format!("{CART_SELECT} WHERE c.id = $1"))
                .bind(cart_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to get cart: {e}")))?;
            row.map(Cart::try_from).transpose()
        })
    }

    fn save_cart(&self, cart: Cart) -> StoreFuture<'_, i64> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to start transaction: {e}")))?;

            let result = if cart.version == 0 {
                sqlx::query(
                    r"
                    INSERT INTO carts (id, user_id, version)
                    VALUES ($1, $2, 1)
                    ON CONFLICT (user_id) DO NOTHING
                    ",
                )
                .bind(cart.id.as_uuid())
                .bind(cart.user_id.as_uuid())
                .execute(&mut *tx)
                .await
            } else {
                sqlx::query(
                    r"
                    UPDATE carts
                    SET version = version + 1
                    WHERE id = $1 AND version = $2
                    ",
                )
                .bind(cart.id.as_uuid())
                .bind(cart.version)
                .execute(&mut *tx)
                .await
            };
            let written =
                result.map_err(|e| StoreError::DatabaseError(format!("Failed to save cart: {e}")))?;

            if written.rows_affected() == 0 {
                metrics::counter!("bookstore.store.cart_conflicts").increment(1);
                return Err(StoreError::ConcurrencyConflict(format!(
                    "cart of user {} changed since version {}",
                    cart.user_id, cart.version
                )));
            }

            sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
                .bind(cart.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to clear cart lines: {e}")))?;

            for (position, line) in cart.books.iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO cart_lines (cart_id, position, book_id, quantity)
                    VALUES ($1, $2, $3, $4)
                    ",
                )
                .bind(cart.id.as_uuid())
                .bind(i32::try_from(position).unwrap_or(i32::MAX))
                .bind(line.book_id.as_uuid())
                .bind(to_i32(line.quantity, "quantity")?)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to write cart line: {e}")))?;
            }

            tx.commit()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to commit transaction: {e}")))?;

            tracing::debug!(cart_id = %cart.id, version = cart.version + 1, "Cart saved");
            Ok(cart.version + 1)
        })
    }
}
