//! Review endpoints.
//!
//! - GET /api/review/details/:bookId - Every review of a book
//! - POST /api/review/create/:bookId - Review a book
//! - PATCH /api/review/update/:bookId - Change the caller's review
//! - DELETE /api/review/delete/:bookId - Remove the caller's review
//!
//! Mutations respond with the book's recomputed rating.

use crate::auth::middleware::RequireUser;
use crate::services::ReviewService;
use axum::extract::State;
use bookstore_core::types::{BookId, BookReviews};
use bookstore_core::validation::{ValidationErrors, has_special_characters, len_between};
use bookstore_web::{ApiResponse, ValidJson, ValidPath, WebResult};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Review body for create and update.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    /// Stars, `1..=5`
    pub rating: f64,
    /// Optional text, 5 to 200 characters
    pub message: Option<String>,
}

impl ReviewRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(
            !(1.0..=5.0).contains(&self.rating),
            "rating",
            "Rating must be between 1 and 5",
        );
        if let Some(message) = &self.message {
            if message.trim().is_empty() {
                errors.add("message", "Message  cannot be empty");
            } else if !len_between(message, 5, 200) {
                errors.add("message", "Review message must be between 5 to 200 words");
            } else if has_special_characters(message) {
                errors.add("message", "Invalid value provided");
            }
        }
        errors.into_result()
    }
}

/// The book's rating after a mutation.
#[derive(Debug, Serialize)]
pub struct RatingResponse {
    /// Mean of the remaining ratings
    pub rating: f64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Every review of a book.
pub async fn book_reviews(
    State(reviews): State<ReviewService>,
    ValidPath(book_id): ValidPath<BookId>,
) -> WebResult<ApiResponse<BookReviews>> {
    let found = reviews.reviews(book_id).await?;
    Ok(ApiResponse::ok("Successfully get all the reviews", found))
}

/// Review a book. One review per user and book.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/review/create/<bookId> \
///   --cookie "accessToken=<token>" \
///   -H "Content-Type: application/json" \
///   -d '{"rating": 4, "message": "Clear and thorough"}'
/// ```
pub async fn create_review(
    user: RequireUser,
    State(reviews): State<ReviewService>,
    ValidPath(book_id): ValidPath<BookId>,
    ValidJson(request): ValidJson<ReviewRequest>,
) -> WebResult<ApiResponse<RatingResponse>> {
    request.validate()?;
    let rating = reviews
        .add(book_id, user.user_id, request.rating, request.message)
        .await?;
    Ok(ApiResponse::created(
        "Review added successfully",
        RatingResponse { rating },
    ))
}

/// Change the caller's review of a book.
pub async fn update_review(
    user: RequireUser,
    State(reviews): State<ReviewService>,
    ValidPath(book_id): ValidPath<BookId>,
    ValidJson(request): ValidJson<ReviewRequest>,
) -> WebResult<ApiResponse<RatingResponse>> {
    request.validate()?;
    let rating = reviews
        .update(book_id, user.user_id, request.rating, request.message)
        .await?;
    Ok(ApiResponse::accepted(
        "Successfully updated the review",
        RatingResponse { rating },
    ))
}

/// Remove the caller's review of a book.
pub async fn delete_review(
    user: RequireUser,
    State(reviews): State<ReviewService>,
    ValidPath(book_id): ValidPath<BookId>,
) -> WebResult<ApiResponse<RatingResponse>> {
    let rating = reviews.delete(book_id, user.user_id).await?;
    Ok(ApiResponse::ok(
        "Deleted review successfully",
        RatingResponse { rating },
    ))
}
