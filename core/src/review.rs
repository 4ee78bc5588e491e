//! Review rules: one entry per user per book, and the book rating is the
//! mean of all entries.

use crate::types::{BookId, BookReviews, ReviewEntry, UserId};
use std::fmt;

/// Rating a book falls back to once its last review is deleted.
pub const DEFAULT_RATING: f64 = 1.0;

/// Why a review mutation was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReviewRejection {
    /// The user already reviewed this book
    AlreadyReviewed,
    /// The user has no review on this book
    NotReviewed,
}

impl fmt::Display for ReviewRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyReviewed => "You can not add more than one review",
            Self::NotReviewed => "No review found for this user",
        })
    }
}

impl std::error::Error for ReviewRejection {}

/// Arithmetic mean of the entries' ratings, or [`DEFAULT_RATING`] when
/// there are none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_rating(entries: &[ReviewEntry]) -> f64 {
    if entries.is_empty() {
        return DEFAULT_RATING;
    }
    entries.iter().map(|e| e.rating).sum::<f64>() / entries.len() as f64
}

/// Adds the user's review, creating the bundle if the book had none.
///
/// # Errors
///
/// Returns [`ReviewRejection::AlreadyReviewed`] if the user already has an entry.
pub fn add_review(
    bundle: Option<BookReviews>,
    book_id: BookId,
    entry: ReviewEntry,
) -> Result<BookReviews, ReviewRejection> {
    let mut bundle = bundle.unwrap_or_else(|| BookReviews {
        book_id,
        reviews: Vec::new(),
    });
    if bundle.reviews.iter().any(|r| r.user_id == entry.user_id) {
        return Err(ReviewRejection::AlreadyReviewed);
    }
    bundle.reviews.push(entry);
    Ok(bundle)
}

/// Replaces the rating and message of the user's existing review.
///
/// # Errors
///
/// Returns [`ReviewRejection::NotReviewed`] if the user has no entry.
pub fn update_review(
    bundle: &mut BookReviews,
    user_id: UserId,
    rating: f64,
    message: Option<String>,
) -> Result<(), ReviewRejection> {
    let entry = bundle
        .reviews
        .iter_mut()
        .find(|r| r.user_id == user_id)
        .ok_or(ReviewRejection::NotReviewed)?;
    entry.rating = rating;
    if message.is_some() {
        entry.message = message;
    }
    Ok(())
}

/// Removes the user's review. Returns `true` if the bundle is now empty and
/// should be deleted.
///
/// # Errors
///
/// Returns [`ReviewRejection::NotReviewed`] if the user has no entry.
pub fn remove_review(bundle: &mut BookReviews, user_id: UserId) -> Result<bool, ReviewRejection> {
    let index = bundle
        .reviews
        .iter()
        .position(|r| r.user_id == user_id)
        .ok_or(ReviewRejection::NotReviewed)?;
    bundle.reviews.remove(index);
    Ok(bundle.reviews.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn entry(user_id: UserId, rating: f64) -> ReviewEntry {
        ReviewEntry {
            user_id,
            message: Some("Great read".to_string()),
            rating,
        }
    }

    #[test]
    fn one_review_per_user() {
        let book = BookId::new();
        let user = UserId::new();
        let bundle = add_review(None, book, entry(user, 4.0)).unwrap();
        assert_eq!(bundle.book_id, book);
        assert_eq!(
            add_review(Some(bundle), book, entry(user, 2.0)).unwrap_err(),
            ReviewRejection::AlreadyReviewed
        );
    }

    #[test]
    fn rating_is_mean_of_entries() {
        let book = BookId::new();
        let a = UserId::new();
        let b = UserId::new();
        let bundle = add_review(None, book, entry(a, 5.0)).unwrap();
        let mut bundle = add_review(Some(bundle), book, entry(b, 2.0)).unwrap();
        assert_eq!(average_rating(&bundle.reviews), 3.5);

        update_review(&mut bundle, b, 4.0, None).unwrap();
        assert_eq!(average_rating(&bundle.reviews), 4.5);
        assert_eq!(bundle.reviews[1].message.as_deref(), Some("Great read"));
    }

    #[test]
    fn deleting_last_review_empties_bundle_and_resets_rating() {
        let book = BookId::new();
        let a = UserId::new();
        let b = UserId::new();
        let bundle = add_review(None, book, entry(a, 5.0)).unwrap();
        let mut bundle = add_review(Some(bundle), book, entry(b, 3.0)).unwrap();

        assert!(!remove_review(&mut bundle, a).unwrap());
        assert_eq!(average_rating(&bundle.reviews), 3.0);

        assert!(remove_review(&mut bundle, b).unwrap());
        assert_eq!(average_rating(&bundle.reviews), DEFAULT_RATING);
        assert_eq!(
            remove_review(&mut bundle, b).unwrap_err(),
            ReviewRejection::NotReviewed
        );
    }

    #[test]
    fn mean_keeps_full_precision() {
        let entries = vec![
            entry(UserId::new(), 4.0),
            entry(UserId::new(), 5.0),
            entry(UserId::new(), 5.0),
        ];
        assert_eq!(average_rating(&entries), 14.0 / 3.0);
    }
}
