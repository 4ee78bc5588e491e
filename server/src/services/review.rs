//! Book reviews. Each mutation returns the book's recomputed rating.

use bookstore_core::StoreError;
use bookstore_core::review::ReviewRejection;
use bookstore_core::store::{BookStore, ReviewStore};
use bookstore_core::types::{BookId, BookReviews, ReviewEntry, UserId};
use bookstore_web::{AppError, WebResult};
use std::sync::Arc;

/// Review service.
#[derive(Clone)]
pub struct ReviewService {
    books: Arc<dyn BookStore>,
    reviews: Arc<dyn ReviewStore>,
}

impl ReviewService {
    /// Create a review service.
    #[must_use]
    pub fn new(books: Arc<dyn BookStore>, reviews: Arc<dyn ReviewStore>) -> Self {
        Self { books, reviews }
    }

    /// Every review of a book.
    ///
    /// # Errors
    ///
    /// - 404 "No reviews found"
    pub async fn reviews(&self, book_id: BookId) -> WebResult<BookReviews> {
        self.reviews
            .reviews_for_book(book_id)
            .await?
            .ok_or_else(|| AppError::not_found("No reviews found"))
    }

    /// Add the user's review of a book.
    ///
    /// # Errors
    ///
    /// - 404 "No book found"
    /// - 422 "You can not add more than one review"
    pub async fn add(
        &self,
        book_id: BookId,
        user_id: UserId,
        rating: f64,
        message: Option<String>,
    ) -> WebResult<f64> {
        self.require_book(book_id).await?;

        let entry = ReviewEntry {
            user_id,
            message,
            rating,
        };
        let new_rating = self
            .reviews
            .add_review(book_id, entry)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    AppError::unprocessable(ReviewRejection::AlreadyReviewed.to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(book_id = %book_id, user_id = %user_id, rating = new_rating, "Review added");
        Ok(new_rating)
    }

    /// Replace the user's rating and, when given, message.
    ///
    /// # Errors
    ///
    /// - 404 "No book found"
    /// - 404 "No review found for this user"
    pub async fn update(
        &self,
        book_id: BookId,
        user_id: UserId,
        rating: f64,
        message: Option<String>,
    ) -> WebResult<f64> {
        self.require_book(book_id).await?;
        let new_rating = self
            .reviews
            .update_review(book_id, user_id, rating, message)
            .await?
            .ok_or_else(|| AppError::not_found(ReviewRejection::NotReviewed.to_string()))?;
        tracing::info!(book_id = %book_id, user_id = %user_id, rating = new_rating, "Review updated");
        Ok(new_rating)
    }

    /// Remove the user's review.
    ///
    /// # Errors
    ///
    /// - 404 "No book found"
    /// - 404 "No review found for this user"
    pub async fn delete(&self, book_id: BookId, user_id: UserId) -> WebResult<f64> {
        self.require_book(book_id).await?;
        let new_rating = self
            .reviews
            .delete_review(book_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(ReviewRejection::NotReviewed.to_string()))?;
        tracing::info!(book_id = %book_id, user_id = %user_id, rating = new_rating, "Review deleted");
        Ok(new_rating)
    }

    async fn require_book(&self, book_id: BookId) -> WebResult<()> {
        match self.books.find_book(book_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("No book found")),
        }
    }
}
