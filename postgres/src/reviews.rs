//! Review entries. Every mutation locks the book row and rewrites its
//! rating before committing.

use crate::rows::ReviewRow;
use crate::{PostgresStore, write_error};
use bookstore_core::error::{Result, StoreError};
use bookstore_core::review;
use bookstore_core::store::{ReviewStore, StoreFuture};
use bookstore_core::types::{BookId, BookReviews, ReviewEntry, UserId};
use sqlx::PgConnection;

async fn load_entries(conn: &mut PgConnection, book_id: BookId) -> Result<Vec<ReviewEntry>> {
    let rows: Vec<ReviewRow> = sqlx::query_as(
        r"
        SELECT user_id, message, rating
        FROM review_entries
        WHERE book_id = $1
        ORDER BY created_at, user_id
        ",
    )
    .bind(book_id.as_uuid())
    .fetch_all(conn)
    .await
    .map_err(|e| StoreError::DatabaseError(format!("Failed to load reviews: {e}")))?;
    Ok(rows.into_iter().map(ReviewEntry::from).collect())
}

async fn lock_book(conn: &mut PgConnection, book_id: BookId) -> Result<()> {
    sqlx::query("SELECT id FROM books WHERE id = $1 FOR UPDATE")
        .bind(book_id.as_uuid())
        .fetch_optional(conn)
        .await
        .map_err(|e| StoreError::DatabaseError(format!("Failed to lock book: {e}")))?;
    Ok(())
}

/// Recomputes and stores the rating of `book_id`, returning it.
async fn refresh_rating(conn: &mut PgConnection, book_id: BookId) -> Result<f64> {
    let entries = load_entries(&mut *conn, book_id).await?;
    let rating = review::average_rating(&entries);
    sqlx::query("UPDATE books SET rating = $2 WHERE id = $1")
        .bind(book_id.as_uuid())
        .bind(rating)
        .execute(conn)
        .await
        .map_err(|e| StoreError::DatabaseError(format!("Failed to update rating: {e}")))?;
    Ok(rating)
}

impl ReviewStore for PostgresStore {
    fn reviews_for_book(&self, book_id: BookId) -> StoreFuture<'_, Option<BookReviews>> {
        Box::pin(async move {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to acquire connection: {e}")))?;
            let reviews = load_entries(&mut conn, book_id).await?;
            Ok((!reviews.is_empty()).then_some(BookReviews { book_id, reviews }))
        })
    }

    fn add_review(&self, book_id: BookId, entry: ReviewEntry) -> StoreFuture<'_, f64> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to start transaction: {e}")))?;
            lock_book(&mut tx, book_id).await?;

            sqlx::query(
                r"
                INSERT INTO review_entries (book_id, user_id, message, rating)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(book_id.as_uuid())
            .bind(entry.user_id.as_uuid())
            .bind(&entry.message)
            .bind(entry.rating)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                write_error(
                    "add review",
                    &review::ReviewRejection::AlreadyReviewed.to_string(),
                    &e,
                )
            })?;

            let rating = refresh_rating(&mut tx, book_id).await?;
            tx.commit()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to commit transaction: {e}")))?;
            Ok(rating)
        })
    }

    fn update_review(
        &self,
        book_id: BookId,
        user_id: UserId,
        rating: f64,
        message: Option<String>,
    ) -> StoreFuture<'_, Option<f64>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to start transaction: {e}")))?;
            lock_book(&mut tx, book_id).await?;

            let result = sqlx::query(
                r"
                UPDATE review_entries
                SET rating = $3,
                    message = COALESCE($4, message)
                WHERE book_id = $1 AND user_id = $2
                ",
            )
            .bind(book_id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(rating)
            .bind(message)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to update review: {e}")))?;
            if result.rows_affected() == 0 {
                return Ok(None);
            }

            let rating = refresh_rating(&mut tx, book_id).await?;
            tx.commit()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to commit transaction: {e}")))?;
            Ok(Some(rating))
        })
    }

    fn delete_review(&self, book_id: BookId, user_id: UserId) -> StoreFuture<'_, Option<f64>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to start transaction: {e}")))?;
            lock_book(&mut tx, book_id).await?;

            let result =
                sqlx::query("DELETE FROM review_entries WHERE book_id = $1 AND user_id = $2")
                    .bind(book_id.as_uuid())
                    .bind(user_id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        StoreError::DatabaseError(format!("Failed to delete review: {e}"))
                    })?;
            if result.rows_affected() == 0 {
                return Ok(None);
            }

            let rating = refresh_rating(&mut tx, book_id).await?;
            tx.commit()
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to commit transaction: {e}")))?;
            Ok(Some(rating))
        })
    }
}
