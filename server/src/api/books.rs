//! Catalog endpoints.
//!
//! - GET /api/books/all - Search, filter, sort and page the catalog
//! - GET /api/books/details/:bookId - One book with its discounted price
//! - POST /api/books/create - Add a book (admin)
//! - PATCH /api/books/update/:bookId - Change a book (admin)
//! - DELETE /api/books/delete/:bookId - Remove a book (admin)

use crate::auth::middleware::RequireAdmin;
use crate::services::CatalogService;
use crate::services::catalog::BookDetails;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookstore_core::catalog::{BookPatch, NewBook};
use bookstore_core::types::{Book, BookId};
use bookstore_web::{ApiResponse, ValidJson, ValidPath, ValidQuery, WebResult};
use std::collections::HashMap;

// ============================================================================
// Handlers
// ============================================================================

/// Query the catalog.
///
/// Accepts `offset`, `limit`, `search`, `sortBy`, `sortOrder`, `filter`,
/// `filterOrder`, `filterValue` and `category`; any other key is rejected.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8000/api/books/all?search=rust&sortBy=price&sortOrder=asc&limit=10"
/// ```
pub async fn all_books(
    State(catalog): State<CatalogService>,
    ValidQuery(params): ValidQuery<HashMap<String, String>>,
) -> WebResult<Response> {
    let page = catalog.query(&params).await?;
    if page.products.is_empty() {
        return Ok(ApiResponse::ok("No data found", Vec::<Book>::new()).into_response());
    }
    Ok(ApiResponse::ok("Successfully get the books", page).into_response())
}

/// One book and, when a discount is open, its discounted unit price.
pub async fn book_details(
    State(catalog): State<CatalogService>,
    ValidPath(book_id): ValidPath<BookId>,
) -> WebResult<ApiResponse<BookDetails>> {
    let details = catalog.details(book_id).await?;
    Ok(ApiResponse::ok("Successfully get the data", details))
}

/// Add a book.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/books/create \
///   --cookie "accessToken=<admin token>" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "title": "Rust in Action",
///     "description": "Systems programming concepts and techniques",
///     "author": "Tim McNamara",
///     "price": 45.5,
///     "rating": 4,
///     "stock": 120,
///     "category": "Programming",
///     "publishedAt": "2021-08-10",
///     "isbn": "9781617294556"
///   }'
/// ```
pub async fn create_book(
    _admin: RequireAdmin,
    State(catalog): State<CatalogService>,
    ValidJson(new_book): ValidJson<NewBook>,
) -> WebResult<ApiResponse<Book>> {
    let book = catalog.create(new_book).await?;
    Ok(ApiResponse::created("Successfully added a new book", book))
}

/// Apply a partial update to a book.
pub async fn update_book(
    _admin: RequireAdmin,
    State(catalog): State<CatalogService>,
    ValidPath(book_id): ValidPath<BookId>,
    ValidJson(patch): ValidJson<BookPatch>,
) -> WebResult<ApiResponse<Book>> {
    let book = catalog.update(book_id, patch).await?;
    Ok(ApiResponse::ok("Book updated successfully", book))
}

/// Remove a book.
pub async fn delete_book(
    _admin: RequireAdmin,
    State(catalog): State<CatalogService>,
    ValidPath(book_id): ValidPath<BookId>,
) -> WebResult<ApiResponse<()>> {
    catalog.delete(book_id).await?;
    Ok(ApiResponse::message(StatusCode::OK, "Deleted book successfully"))
}
