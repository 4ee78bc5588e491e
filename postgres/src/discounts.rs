//! Discount records. `discount_books.book_id` is unique, so two discounts
//! can never share a book even under concurrent writes.

use crate::rows::{self, DiscountRow};
use crate::{PostgresStore, write_error};
use bookstore_core::discount::DiscountRejection;
use bookstore_core::error::{Result, StoreError};
use bookstore_core::store::{DiscountStore, StoreFuture};
use bookstore_core::types::{BookId, Discount, DiscountId};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

const DISCOUNT_SELECT: &str = r"
    SELECT d.id, d.discount_percentage, d.start_date, d.end_date, d.countries,
           ARRAY(SELECT db.book_id FROM discount_books db
                 WHERE db.discount_id = d.id ORDER BY db.position) AS book_ids
    FROM discounts d
";

fn country_codes(discount: &Discount) -> Vec<String> {
    discount.countries.iter().map(|c| c.code().to_string()).collect()
}

async fn write_books(conn: &mut PgConnection, discount: &Discount) -> Result<()> {
    let overlap = DiscountRejection::BookAlreadyDiscounted.to_string();
    for (position, book_id) in discount.book_ids.iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO discount_books (discount_id, position, book_id)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(discount.id.as_uuid())
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .bind(book_id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error("write discount books", &overlap, &e))?;
    }
    Ok(())
}

impl DiscountStore for PostgresStore {
    fn list_discounts(&self) -> StoreFuture<'_, Vec<Discount>> {
        Box::pin(async move {
            let rows: Vec<DiscountRow> =
                sqlx::query_as(&format!("{DISCOUNT_SELECT} ORDER BY d.created_at"))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| {
                        StoreError::DatabaseError(format!("Failed to list discounts: {e}"))
                    })?;
            rows::discounts(rows)
        })
    }

    fn find_discount(&self, discount_id: DiscountId) -> StoreFuture<'_, Option<Discount>> {
        Box::pin(async move {
            let row: Option<DiscountRow> =
                sqlx::query_as(&format!("{DISCOUNT_SELECT} WHERE d.id = $1"))
                    .bind(discount_id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::DatabaseError(format!("Failed to get discount: {e}")))?;
            row.map(Discount::try_from).transpose()
        })
    }

    fn discounts_for_books(&self, book_ids: Vec<BookId>) -> StoreFuture<'_, Vec<Discount>> {
        Box::pin(async move {
            let ids: Vec<Uuid> = book_ids.iter().map(BookId::as_uuid).collect();
            let rows: Vec<DiscountRow> = sqlx::query_as(&format!(
                r"{DISCOUNT_SELECT}
                WHERE EXISTS (
                    SELECT 1 FROM discount_books db
                    WHERE db.discount_id = d.id AND db.book_id = ANY($1)
                )
                ORDER BY d.created_at"
            ))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to get discounts: {e}")))?;
            rows::discounts(rows)
        })
    }

    fn open_discounts(
        &self,
        now: DateTime<Utc>,
        book_ids: Vec<BookId>,
    ) -> StoreFuture<'_, Vec<Discount>> {
        Box::pin(async move {
            let ids: Vec<Uuid> = book_ids.iter().map(BookId::as_uuid).collect();
            let rows: Vec<DiscountRow> = sqlx::query_as(&format!(
                r"{DISCOUNT_SELECT}
                WHERE d.start_date <= $1 AND d.end_date >= $1
                  AND EXISTS (
                    SELECT 1 FROM discount_books db
                    WHERE db.discount_id = d.id AND db.book_id = ANY($2)
                  )
                ORDER BY d.created_at"
            ))
            .bind(now)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to get open discounts: {e}")))?;
            rows::discounts(rows)
        })
    }

    fn insert_discount(&self, discount: Discount) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to start transaction: {e}")))?;

            sqlx::query(
                r"
                INSERT INTO discounts (id, discount_percentage, start_date, end_date, countries)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(discount.id.as_uuid())
            .bind(i16::from(discount.discount_percentage))
            .bind(discount.start_date)
            .bind(discount.end_date)
            .bind(country_codes(&discount))
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to insert discount: {e}")))?;

            write_books(&mut tx, &discount).await?;

            tx.commit()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to commit transaction: {e}")))?;
            Ok(())
        })
    }

    fn update_discount(&self, discount: Discount) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to start transaction: {e}")))?;

            let result = sqlx::query(
                r"
                UPDATE discounts
                SET discount_percentage = $2,
                    start_date = $3,
                    end_date = $4,
                    countries = $5
                WHERE id = $1
                ",
            )
            .bind(discount.id.as_uuid())
            .bind(i16::from(discount.discount_percentage))
            .bind(discount.start_date)
            .bind(discount.end_date)
            .bind(country_codes(&discount))
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to update discount: {e}")))?;
            if result.rows_affected() == 0 {
                return Ok(false);
            }

            sqlx::query("DELETE FROM discount_books WHERE discount_id = $1")
                .bind(discount.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    StoreError::DatabaseError(format!("Failed to clear discount books: {e}"))
                })?;
            write_books(&mut tx, &discount).await?;

            tx.commit()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to commit transaction: {e}")))?;
            Ok(true)
        })
    }

    fn delete_discount(&self, discount_id: DiscountId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM discounts WHERE id = $1")
                .bind(discount_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to delete discount: {e}")))?;
            Ok(result.rows_affected() == 1)
        })
    }
}
