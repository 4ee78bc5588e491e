//! Discount administration.
//!
//! Create and update run the rules from [`bookstore_core::discount`] before
//! the store is touched: books, countries, overlap, then the date window.
//! An update only revisits the window when it changes a date. The store
//! repeats the overlap check under its own lock.

use bookstore_core::StoreError;
use bookstore_core::discount::{self, DiscountPatch, DiscountRejection};
use bookstore_core::environment::Clock;
use bookstore_core::store::{BookStore, DiscountStore};
use bookstore_core::types::{BookId, Discount, DiscountId};
use bookstore_core::validation::ValidationErrors;
use bookstore_core::{DateTime, Utc};
use bookstore_web::{AppError, WebResult};
use std::sync::Arc;

/// A discount to create. Countries are raw codes, matched case-insensitively.
#[derive(Debug, Clone)]
pub struct DiscountDraft {
    /// Whole percentage off
    pub discount_percentage: u8,
    /// Books covered
    pub book_ids: Vec<BookId>,
    /// Window start
    pub start_date: DateTime<Utc>,
    /// Window end
    pub end_date: DateTime<Utc>,
    /// Country codes
    pub countries: Vec<String>,
}

/// Changes to an existing discount. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DiscountChanges {
    /// New percentage
    pub discount_percentage: Option<u8>,
    /// Replacement book list
    pub book_ids: Option<Vec<BookId>>,
    /// New window start
    pub start_date: Option<DateTime<Utc>>,
    /// New window end
    pub end_date: Option<DateTime<Utc>>,
    /// Country codes to add
    pub countries: Option<Vec<String>>,
}

impl DiscountChanges {
    /// Returns `true` when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.discount_percentage.is_none()
            && self.book_ids.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.countries.is_none()
    }
}

fn rejected(rejection: DiscountRejection) -> AppError {
    match rejection {
        DiscountRejection::PercentageOutOfRange => {
            let mut errors = ValidationErrors::new();
            errors.add("discountPercentage", rejection.to_string());
            AppError::validation(errors)
        }
        other => AppError::unprocessable(other.to_string()),
    }
}

fn store_rejected(err: StoreError) -> AppError {
    match err {
        StoreError::Conflict(_) => rejected(DiscountRejection::BookAlreadyDiscounted),
        other => other.into(),
    }
}

/// Discount administration service.
#[derive(Clone)]
pub struct DiscountService {
    books: Arc<dyn BookStore>,
    discounts: Arc<dyn DiscountStore>,
    clock: Arc<dyn Clock>,
}

impl DiscountService {
    /// Create a discount service.
    #[must_use]
    pub fn new(
        books: Arc<dyn BookStore>,
        discounts: Arc<dyn DiscountStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            books,
            discounts,
            clock,
        }
    }

    async fn check_books(&self, book_ids: &[BookId]) -> WebResult<()> {
        discount::check_unique_books(book_ids).map_err(rejected)?;
        let found = self.books.find_books(book_ids.to_vec()).await?;
        if found.len() != book_ids.len() {
            return Err(rejected(DiscountRejection::UnknownBooks));
        }
        Ok(())
    }

    async fn check_no_overlap(
        &self,
        book_ids: &[BookId],
        exempt: Option<DiscountId>,
    ) -> WebResult<()> {
        let existing = self.discounts.discounts_for_books(book_ids.to_vec()).await?;
        discount::check_no_overlap(book_ids, &existing, exempt).map_err(rejected)
    }

    fn check_window(&self, record: &Discount) -> WebResult<()> {
        discount::check_window(record.start_date, record.end_date, self.clock.now())
            .map_err(rejected)
    }

    /// Every discount record.
    ///
    /// # Errors
    ///
    /// Returns 500 if the store fails.
    pub async fn list(&self) -> WebResult<Vec<Discount>> {
        Ok(self.discounts.list_discounts().await?)
    }

    /// Create a discount.
    ///
    /// # Errors
    ///
    /// 422 with the first failed rule's message; a percentage out of range
    /// is reported as a field map.
    pub async fn create(&self, draft: DiscountDraft) -> WebResult<Discount> {
        discount::check_percentage(draft.discount_percentage).map_err(rejected)?;
        self.check_books(&draft.book_ids).await?;
        let countries = discount::parse_countries(&draft.countries).map_err(rejected)?;

        let record = Discount {
            id: DiscountId::new(),
            discount_percentage: draft.discount_percentage,
            book_ids: draft.book_ids,
            start_date: draft.start_date,
            end_date: draft.end_date,
            countries,
        };
        self.check_no_overlap(&record.book_ids, None).await?;
        self.check_window(&record)?;

        self.discounts
            .insert_discount(record.clone())
            .await
            .map_err(store_rejected)?;

        tracing::info!(
            discount_id = %record.id,
            percentage = record.discount_percentage,
            books = record.book_ids.len(),
            "Discount created"
        );
        Ok(record)
    }

    /// Merge changes into a discount and validate the result.
    ///
    /// The date window is checked only when the changes carry a date, so a
    /// running discount can still be edited.
    ///
    /// # Errors
    ///
    /// - 422 "Can not accept empty data"
    /// - 404 "No discount associated by this id"
    /// - 422 with the first failed rule's message
    pub async fn update(&self, discount_id: DiscountId, changes: DiscountChanges) -> WebResult<Discount> {
        if changes.is_empty() {
            return Err(rejected(DiscountRejection::EmptyUpdate));
        }

        let mut record = self
            .discounts
            .find_discount(discount_id)
            .await?
            .ok_or_else(|| AppError::not_found("No discount associated by this id"))?;

        if let Some(book_ids) = &changes.book_ids {
            self.check_books(book_ids).await?;
        }
        let countries = changes
            .countries
            .as_deref()
            .map(|raw| discount::parse_countries(raw))
            .transpose()
            .map_err(rejected)?;

        let dates_changed = changes.start_date.is_some() || changes.end_date.is_some();
        discount::apply_patch(
            &mut record,
            DiscountPatch {
                discount_percentage: changes.discount_percentage,
                book_ids: changes.book_ids,
                start_date: changes.start_date,
                end_date: changes.end_date,
                countries,
            },
        );
        discount::check_percentage(record.discount_percentage).map_err(rejected)?;
        self.check_no_overlap(&record.book_ids, Some(record.id)).await?;
        if dates_changed {
            self.check_window(&record)?;
        }

        let updated = self
            .discounts
            .update_discount(record.clone())
            .await
            .map_err(store_rejected)?;
        if !updated {
            return Err(AppError::not_found("No discount associated by this id"));
        }

        tracing::info!(discount_id = %record.id, "Discount updated");
        Ok(record)
    }

    /// Delete a discount.
    ///
    /// # Errors
    ///
    /// - 400 "Something went wrong" if it does not exist
    pub async fn delete(&self, discount_id: DiscountId) -> WebResult<()> {
        if !self.discounts.delete_discount(discount_id).await? {
            return Err(AppError::bad_request("Something went wrong"));
        }
        tracing::info!(discount_id = %discount_id, "Discount deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use bookstore_core::types::{Book, Country};
    use bookstore_testing::fixtures::BookBuilder;
    use bookstore_testing::{InMemoryStore, test_clock};
    use chrono::Duration;

    async fn setup() -> (DiscountService, Vec<Book>) {
        let store = InMemoryStore::new();
        let mut books = Vec::new();
        for title in ["Rust for Rustaceans", "Hands-on Rust", "Rust in Action"] {
            let book = BookBuilder::new(title).build();
            store.insert_book(book.clone()).await.unwrap();
            books.push(book);
        }
        let service = DiscountService::new(
            Arc::new(store.clone()),
            Arc::new(store),
            Arc::new(test_clock()),
        );
        (service, books)
    }

    fn draft(book_ids: Vec<BookId>) -> DiscountDraft {
        let now = test_clock().now();
        DiscountDraft {
            discount_percentage: 20,
            book_ids,
            start_date: now,
            end_date: now + Duration::days(3),
            countries: vec!["bd".to_string()],
        }
    }

    #[tokio::test]
    async fn create_uppercases_countries() {
        let (service, books) = setup().await;
        let created = service.create(draft(vec![books[0].id])).await.unwrap();
        assert_eq!(created.countries, vec![Country::Bd]);
        assert_eq!(service.list().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn a_book_carries_one_discount() {
        let (service, books) = setup().await;
        service.create(draft(vec![books[0].id])).await.unwrap();

        let err = service
            .create(draft(vec![books[1].id, books[0].id]))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message(), "Can not add multiple discount for a book");
    }

    #[tokio::test]
    async fn percentage_is_a_field_error() {
        let (service, books) = setup().await;
        let mut bad = draft(vec![books[0].id]);
        bad.discount_percentage = 41;

        let err = service.create(bad).await.unwrap_err();
        assert_eq!(
            err.data().unwrap()["discountPercentage"],
            "Discount Percentage must be between 5 and 40"
        );
    }

    #[tokio::test]
    async fn unknown_books_and_countries_are_rejected() {
        let (service, books) = setup().await;
        let err = service.create(draft(vec![BookId::new()])).await.unwrap_err();
        assert_eq!(err.message(), "Some of the book maybe not available");

        let mut bad = draft(vec![books[0].id]);
        bad.countries = vec!["FR".to_string()];
        let err = service.create(bad).await.unwrap_err();
        assert_eq!(err.message(), "Some country maybe not available");
    }

    #[tokio::test]
    async fn update_merges_and_keeps_own_books() {
        let (service, books) = setup().await;
        let created = service.create(draft(vec![books[0].id])).await.unwrap();

        let updated = service
            .update(
                created.id,
                DiscountChanges {
                    discount_percentage: Some(30),
                    book_ids: Some(vec![books[0].id, books[2].id]),
                    countries: Some(vec!["US".to_string()]),
                    ..DiscountChanges::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.discount_percentage, 30);
        assert_eq!(updated.book_ids, vec![books[0].id, books[2].id]);
        assert_eq!(updated.countries, vec![Country::Bd, Country::Us]);
        assert_eq!(updated.start_date, created.start_date);
    }

    #[tokio::test]
    async fn overlap_is_reported_before_the_window() {
        let (service, books) = setup().await;
        service.create(draft(vec![books[0].id])).await.unwrap();

        let mut late = draft(vec![books[0].id]);
        late.end_date = late.start_date + Duration::days(9);
        let err = service.create(late).await.unwrap_err();
        assert_eq!(err.message(), "Can not add multiple discount for a book");
    }

    #[tokio::test]
    async fn running_discount_accepts_edits_without_dates() {
        let store = InMemoryStore::new();
        let book = BookBuilder::new("Zero To Production").build();
        store.insert_book(book.clone()).await.unwrap();
        let now = test_clock().now();
        let running = Discount {
            id: DiscountId::new(),
            discount_percentage: 10,
            book_ids: vec![book.id],
            start_date: now - Duration::days(3),
            end_date: now + Duration::days(1),
            countries: vec![Country::Bd],
        };
        store.insert_discount(running.clone()).await.unwrap();
        let service = DiscountService::new(
            Arc::new(store.clone()),
            Arc::new(store),
            Arc::new(test_clock()),
        );

        let updated = service
            .update(
                running.id,
                DiscountChanges {
                    countries: Some(vec!["US".to_string()]),
                    ..DiscountChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.countries, vec![Country::Bd, Country::Us]);
        assert_eq!(updated.start_date, running.start_date);

        let updated = service
            .update(
                running.id,
                DiscountChanges {
                    discount_percentage: Some(25),
                    ..DiscountChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.discount_percentage, 25);

        let err = service
            .update(
                running.id,
                DiscountChanges {
                    end_date: Some(now + Duration::days(2)),
                    ..DiscountChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Start date cannot be less than today.");
    }

    #[tokio::test]
    async fn empty_update_and_missing_record() {
        let (service, _) = setup().await;
        let err = service
            .update(DiscountId::new(), DiscountChanges::default())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Can not accept empty data");

        let err = service
            .update(
                DiscountId::new(),
                DiscountChanges {
                    discount_percentage: Some(10),
                    ..DiscountChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = service.delete(DiscountId::new()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Something went wrong");
    }
}
