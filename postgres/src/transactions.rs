//! Checkout commit and transaction history.
//!
//! The commit locks rows in a fixed order (user, cart, books by id) so two
//! concurrent checkouts cannot deadlock, re-checks balance and stock under
//! the locks, and uses conditional updates as a second guard.

use crate::PostgresStore;
use crate::rows::{self, TransactionRow, to_i32, to_u32};
use bookstore_core::checkout::{self, CheckoutPlan, CheckoutRejection};
use bookstore_core::error::{Result, StoreError};
use bookstore_core::store::{StoreFuture, TransactionStore};
use bookstore_core::types::{BookId, Money, Transaction, UserId};
use sqlx::PgConnection;
use std::collections::HashMap;
use uuid::Uuid;

const TRANSACTION_SELECT: &str = r"
    SELECT t.id, t.user_id, t.total_cents, t.payment_method, t.created_at,
           ARRAY(SELECT l.book_id FROM transaction_lines l
                 WHERE l.transaction_id = t.id ORDER BY l.position) AS book_ids,
           ARRAY(SELECT l.quantity FROM transaction_lines l
                 WHERE l.transaction_id = t.id ORDER BY l.position) AS quantities
    FROM transactions t
";

fn db_error(action: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::DatabaseError(format!("Failed to {action}: {e}"))
}

/// Every write of a checkout. Any error leaves the caller to roll back.
async fn apply_checkout(conn: &mut PgConnection, plan: &CheckoutPlan) -> Result<Transaction> {
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT balance_cents FROM users WHERE id = $1 FOR UPDATE")
            .bind(plan.user_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_error("lock user"))?;
    let balance = Money::from_cents(balance.ok_or(CheckoutRejection::CartNotFound)?);

    let version: Option<i64> =
        sqlx::query_scalar("SELECT version FROM carts WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(plan.cart_id.as_uuid())
            .bind(plan.user_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_error("lock cart"))?;
    if version != Some(plan.cart_version) {
        return Err(CheckoutRejection::CartChanged.into());
    }

    let ids: Vec<Uuid> = plan.lines.iter().map(|l| l.book_id.as_uuid()).collect();
    let locked: Vec<(Uuid, i32)> =
        sqlx::query_as("SELECT id, stock FROM books WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error("lock books"))?;
    let stock = locked
        .into_iter()
        .map(|(id, stock)| Ok((BookId::from_uuid(id), to_u32(stock, "stock")?)))
        .collect::<Result<HashMap<_, _>>>()?;

    checkout::check_balance(balance, plan.total)?;
    checkout::check_stock(&plan.lines, &stock)?;

    for line in &plan.lines {
        let updated = sqlx::query("UPDATE books SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
            .bind(line.book_id.as_uuid())
            .bind(to_i32(line.quantity, "quantity")?)
            .execute(&mut *conn)
            .await
            .map_err(db_error("decrement stock"))?;
        if updated.rows_affected() == 0 {
            return Err(CheckoutRejection::InsufficientStock(vec![line.book_id]).into());
        }
    }

    let debited = sqlx::query(
        r"
        UPDATE users
        SET balance_cents = balance_cents - $2,
            updated_at = $3
        WHERE id = $1 AND balance_cents >= $2
        ",
    )
    .bind(plan.user_id.as_uuid())
    .bind(plan.total.cents())
    .bind(plan.created_at)
    .execute(&mut *conn)
    .await
    .map_err(db_error("debit balance"))?;
    if debited.rows_affected() == 0 {
        return Err(CheckoutRejection::InsufficientBalance.into());
    }

    let transaction = plan.transaction();
    sqlx::query(
        r"
        INSERT INTO transactions (id, user_id, total_cents, payment_method, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(transaction.id.as_uuid())
    .bind(transaction.user_id.as_uuid())
    .bind(transaction.total_price.cents())
    .bind(transaction.payment_method.as_str())
    .bind(transaction.created_at)
    .execute(&mut *conn)
    .await
    .map_err(db_error("insert transaction"))?;

    for (position, line) in transaction.books.iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO transaction_lines (transaction_id, position, book_id, quantity)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(transaction.id.as_uuid())
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .bind(line.book_id.as_uuid())
        .bind(to_i32(line.quantity, "quantity")?)
        .execute(&mut *conn)
        .await
        .map_err(db_error("insert transaction line"))?;
    }

    sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
        .bind(plan.cart_id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(db_error("clear cart"))?;
    sqlx::query("UPDATE carts SET version = version + 1 WHERE id = $1")
        .bind(plan.cart_id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(db_error("bump cart version"))?;

    Ok(transaction)
}

impl TransactionStore for PostgresStore {
    fn commit_checkout(&self, plan: CheckoutPlan) -> StoreFuture<'_, Transaction> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error("start transaction"))?;

            match apply_checkout(&mut tx, &plan).await {
                Ok(transaction) => {
                    tx.commit().await.map_err(db_error("commit checkout"))?;
                    tracing::info!(
                        transaction_id = %transaction.id,
                        user_id = %transaction.user_id,
                        total = %transaction.total_price,
                        "Checkout committed"
                    );
                    Ok(transaction)
                }
                Err(e) => {
                    let _ = tx.rollback().await; // Ignore rollback errors
                    tracing::debug!(user_id = %plan.user_id, error = %e, "Checkout rolled back");
                    Err(e)
                }
            }
        })
    }

    fn transactions_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Transaction>> {
        Box::pin(async move {
            let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
                "{TRANSACTION_SELECT} WHERE t.user_id = $1 ORDER BY t.created_at DESC"
            ))
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("get transactions"))?;
            rows::transactions(rows)
        })
    }

    fn all_transactions(&self) -> StoreFuture<'_, Vec<Transaction>> {
        Box::pin(async move {
            let rows: Vec<TransactionRow> =
                sqlx::query_as(&format!("{TRANSACTION_SELECT} ORDER BY t.created_at DESC"))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_error("list transactions"))?;
            rows::transactions(rows)
        })
    }
}
