//! Catalog queries and book administration.

use bookstore_core::StoreError;
use bookstore_core::catalog::{BookPage, BookPatch, BookQuery, NewBook, QueryRejection};
use bookstore_core::environment::Clock;
use bookstore_core::pricing;
use bookstore_core::store::{BookStore, DiscountStore};
use bookstore_core::types::{Book, BookId};
use bookstore_web::{AppError, WebResult};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const UPDATE_CONFLICT: &str = "Another book already has the same title, description, or isbn";

/// A book with its current discounted unit price, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    /// The book
    pub result: Book,
    /// Unit price after the open discount, e.g. `"80.00"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<String>,
}

/// Catalog service.
#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BookStore>,
    discounts: Arc<dyn DiscountStore>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    /// Create a catalog service.
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

    /// Run a catalog query from raw query-string pairs.
    ///
    /// # Errors
    ///
    /// - 422 "Invalid property provided book filtering" for an unknown key
    /// - 422 field map for invalid values
    pub async fn query(&self, params: &HashMap<String, String>) -> WebResult<BookPage> {
        let query = BookQuery::from_params(params).map_err(|rejection| match rejection {
            QueryRejection::UnknownProperty => {
                AppError::unprocessable("Invalid property provided book filtering")
            }
            QueryRejection::Invalid(errors) => AppError::validation(errors),
        })?;
        Ok(self.books.query_books(query, self.clock.now()).await?)
    }

    /// A book and its unit price under the discount open now, in any country.
    ///
    /// # Errors
    ///
    /// - 404 "No book found"
    pub async fn details(&self, book_id: BookId) -> WebResult<BookDetails> {
        let book = self
            .books
            .find_book(book_id)
            .await?
            .ok_or_else(|| AppError::not_found("No book found"))?;

        let open = self
            .discounts
            .open_discounts(self.clock.now(), vec![book_id])
            .await?;
        let discount_price = pricing::discount_for(book_id, &open)
            .map(|d| pricing::discounted_unit_price(book.price, d.discount_percentage).to_string());

        Ok(BookDetails {
            result: book,
            discount_price,
        })
    }

    /// Add a book to the catalog.
    ///
    /// # Errors
    ///
    /// - 422 field map for invalid fields
    /// - 422 "Book with the same {title|description|ISBN} already exists"
    pub async fn create(&self, new_book: NewBook) -> WebResult<Book> {
        new_book.validate()?;

        if let Some(existing) = self
            .books
            .find_conflict(
                Some(new_book.title.clone()),
                Some(new_book.description.clone()),
                Some(new_book.isbn.clone()),
                None,
            )
            .await?
        {
            let field = if existing.title == new_book.title {
                "title"
            } else if existing.description == new_book.description {
                "description"
            } else {
                "ISBN"
            };
            return Err(AppError::unprocessable(format!(
                "Book with the same {field} already exists"
            )));
        }

        let book = new_book.into_book();
        self.books
            .insert_book(book.clone())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(message) => AppError::unprocessable(message),
                other => other.into(),
            })?;

        tracing::info!(book_id = %book.id, title = %book.title, "Book created");
        Ok(book)
    }

    /// Apply a partial update to a book.
    ///
    /// # Errors
    ///
    /// - 422 "Can not update the book with an empty data"
    /// - 422 field map for invalid fields
    /// - 422 "No book found associated with this id"
    /// - 422 "Another book already has the same title, description, or isbn"
    pub async fn update(&self, book_id: BookId, patch: BookPatch) -> WebResult<Book> {
        if patch.is_empty() {
            return Err(AppError::unprocessable(
                "Can not update the book with an empty data",
            ));
        }
        patch.validate()?;

        let mut book = self
            .books
            .find_book(book_id)
            .await?
            .ok_or_else(|| AppError::unprocessable("No book found associated with this id"))?;

        if self
            .books
            .find_conflict(
                patch.title.clone(),
                patch.description.clone(),
                patch.isbn.clone(),
                Some(book_id),
            )
            .await?
            .is_some()
        {
            return Err(AppError::unprocessable(UPDATE_CONFLICT));
        }

        patch.apply(&mut book);
        let updated = self
            .books
            .update_book(book.clone())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AppError::unprocessable(UPDATE_CONFLICT),
                other => other.into(),
            })?;
        if !updated {
            return Err(AppError::unprocessable(
                "No book found associated with this id",
            ));
        }

        tracing::info!(book_id = %book_id, "Book updated");
        Ok(book)
    }

    /// Remove a book from the catalog.
    ///
    /// # Errors
    ///
    /// - 422 "No book associated with this id"
    pub async fn delete(&self, book_id: BookId) -> WebResult<()> {
        if !self.books.delete_book(book_id).await? {
            return Err(AppError::unprocessable("No book associated with this id"));
        }
        tracing::info!(book_id = %book_id, "Book deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bookstore_core::types::Country;
    use bookstore_testing::fixtures::{BookBuilder, open_discount, unique_isbn};
    use bookstore_testing::{InMemoryStore, test_clock};

    fn service(store: &InMemoryStore) -> CatalogService {
        CatalogService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(test_clock()),
        )
    }

    fn new_book(title: &str, isbn: String) -> NewBook {
        serde_json::from_value(serde_json::json!({
            "title": title,
            "description": "An introduction to ownership and borrowing",
            "author": "Steve Klabnik",
            "price": 45.5,
            "rating": 4,
            "stock": 25,
            "category": "Programming",
            "publishedAt": "2019-08-12",
            "isbn": isbn,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn details_include_open_discount_price() {
        let store = InMemoryStore::new();
        let book = BookBuilder::new("The Rust Book").price(100).build();
        store.insert_book(book.clone()).await.unwrap();
        store
            .insert_discount(open_discount(20, vec![book.id], vec![Country::Us], test_clock().now()))
            .await
            .unwrap();

        let details = service(&store).details(book.id).await.unwrap();
        assert_eq!(details.discount_price.as_deref(), Some("80.00"));
    }

    #[tokio::test]
    async fn details_without_discount_omit_price() {
        let store = InMemoryStore::new();
        let book = BookBuilder::new("Zero To Production").build();
        store.insert_book(book.clone()).await.unwrap();

        let details = service(&store).details(book.id).await.unwrap();
        let json = serde_json::to_value(&details).unwrap();
        assert!(json.get("discountPrice").is_none());
        assert_eq!(json["result"]["title"], "Zero To Production");
    }

    #[tokio::test]
    async fn duplicate_title_names_the_field() {
        let store = InMemoryStore::new();
        let service = service(&store);
        service.create(new_book("The Rust Book", unique_isbn())).await.unwrap();

        let mut again = new_book("The Rust Book", unique_isbn());
        again.description = "A different description entirely".to_string();
        let err = service.create(again).await.unwrap_err();
        assert_eq!(err.message(), "Book with the same title already exists");
    }

    #[tokio::test]
    async fn empty_update_is_rejected_before_lookup() {
        let store = InMemoryStore::new();
        let err = service(&store)
            .update(BookId::new(), BookPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Can not update the book with an empty data");
    }

    #[tokio::test]
    async fn unknown_query_key_is_rejected() {
        let store = InMemoryStore::new();
        let params = HashMap::from([("color".to_string(), "red".to_string())]);
        let err = service(&store).query(&params).await.unwrap_err();
        assert_eq!(err.message(), "Invalid property provided book filtering");
    }
}
