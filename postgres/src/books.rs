//! Catalog storage and the catalog query.

use crate::rows::{self, BookRow, to_i32};
use crate::{PostgresStore, write_error};
use bookstore_core::catalog::{BookPage, BookQuery, FilterField, FilterOrder, SortField, SortOrder};
use bookstore_core::error::StoreError;
use bookstore_core::store::{BookStore, StoreFuture};
use bookstore_core::types::{Book, BookId};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

const BOOK_COLUMNS: &str =
    "b.id, b.title, b.description, b.author, b.price_cents, b.rating, b.stock, b.category, \
     b.published_at, b.isbn";

const DUPLICATE_BOOK: &str = "Book with the same title, description or ISBN already exists";

/// Appends the `FROM` and `WHERE` clauses shared by the page and count
/// queries. `od.discount_percentage` is the percentage of the discount open
/// at `now` covering the book, or NULL.
fn push_matching(qb: &mut QueryBuilder<'_, Postgres>, query: &BookQuery, now: DateTime<Utc>) {
    qb.push(
        r"
        FROM books b
        LEFT JOIN LATERAL (
            SELECT d.discount_percentage
            FROM discounts d
            JOIN discount_books db ON db.discount_id = d.id
            WHERE db.book_id = b.id AND d.start_date <= ",
    );
    qb.push_bind(now);
    qb.push(" AND d.end_date >= ");
    qb.push_bind(now);
    qb.push(" LIMIT 1) od ON TRUE WHERE TRUE");

    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        qb.push(" AND (strpos(lower(b.title), ");
        qb.push_bind(needle.clone());
        qb.push(") > 0 OR strpos(lower(b.description), ");
        qb.push_bind(needle);
        qb.push(") > 0)");
    }

    if !query.categories.is_empty() {
        qb.push(" AND b.category = ANY(");
        qb.push_bind(query.categories.clone());
        qb.push(")");
    }

    if let Some((field, order, bound)) = query.filter {
        let column = match field {
            FilterField::Stock => "b.stock::float8",
            FilterField::Price => "b.price_cents::float8 / 100",
            FilterField::Rating => "b.rating",
            FilterField::DiscountPercentage => "od.discount_percentage::float8",
        };
        let op = match order {
            FilterOrder::High => " >= ",
            FilterOrder::Low => " <= ",
        };
        qb.push(" AND ").push(column).push(op);
        qb.push_bind(bound);
    }
}

fn order_by(query: &BookQuery) -> String {
    let Some((field, order)) = query.sort else {
        return " ORDER BY b.created_at, b.id".to_string();
    };
    let column = match field {
        SortField::Price => "b.price_cents",
        SortField::Stock => "b.stock",
        SortField::Rating => "b.rating",
    };
    let direction = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!(" ORDER BY {column} {direction}, b.created_at, b.id")
}

impl BookStore for PostgresStore {
    fn insert_book(&self, book: Book) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO books
                    (id, title, description, author, price_cents, rating, stock, category,
                     published_at, isbn)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(book.id.as_uuid())
            .bind(&book.title)
            .bind(&book.description)
            .bind(&book.author)
            .bind(book.price.cents())
            .bind(book.rating)
            .bind(to_i32(book.stock, "stock")?)
            .bind(&book.category)
            .bind(book.published_at)
            .bind(&book.isbn)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("insert book", DUPLICATE_BOOK, &e))?;
            Ok(())
        })
    }

    fn find_book(&self, book_id: BookId) -> StoreFuture<'_, Option<Book>> {
        Box::pin(async move {
            let row: Option<BookRow> =
                sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = $1"))
                    .bind(book_id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::DatabaseError(format!("Failed to get book: {e}")))?;
            row.map(Book::try_from).transpose()
        })
    }

    fn find_books(&self, book_ids: Vec<BookId>) -> StoreFuture<'_, Vec<Book>> {
        Box::pin(async move {
            let ids: Vec<Uuid> = book_ids.iter().map(BookId::as_uuid).collect();
            let rows: Vec<BookRow> = sqlx::query_as(&format!(
                "SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = ANY($1)"
            ))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to get books: {e}")))?;
            rows::books(rows)
        })
    }

    fn find_conflict(
        &self,
        title: Option<String>,
        description: Option<String>,
        isbn: Option<String>,
        exclude: Option<BookId>,
    ) -> StoreFuture<'_, Option<Book>> {
        Box::pin(async move {
            let row: Option<BookRow> = sqlx::query_as(&format!(
                r"
                SELECT {BOOK_COLUMNS}
                FROM books b
                WHERE ($4::uuid IS NULL OR b.id <> $4)
                  AND (b.title = $1 OR b.description = $2 OR b.isbn = $3)
                LIMIT 1
                "
            ))
            .bind(title)
            .bind(description)
            .bind(isbn)
            .bind(exclude.map(|id| id.as_uuid()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to check book conflicts: {e}")))?;
            row.map(Book::try_from).transpose()
        })
    }

    fn update_book(&self, book: Book) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE books
                SET title = $2,
                    description = $3,
                    author = $4,
                    price_cents = $5,
                    rating = $6,
                    stock = $7,
                    category = $8,
                    published_at = $9,
                    isbn = $10
                WHERE id = $1
                ",
            )
            .bind(book.id.as_uuid())
            .bind(&book.title)
            .bind(&book.description)
            .bind(&book.author)
            .bind(book.price.cents())
            .bind(book.rating)
            .bind(to_i32(book.stock, "stock")?)
            .bind(&book.category)
            .bind(book.published_at)
            .bind(&book.isbn)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("update book", DUPLICATE_BOOK, &e))?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn delete_book(&self, book_id: BookId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM books WHERE id = $1")
                .bind(book_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to delete book: {e}")))?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn query_books(&self, query: BookQuery, now: DateTime<Utc>) -> StoreFuture<'_, BookPage> {
        Box::pin(async move {
            let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
            push_matching(&mut count, &query, now);
            let total: i64 = count
                .build_query_scalar()
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to count books: {e}")))?;

            let mut page = QueryBuilder::<Postgres>::new(format!("SELECT {BOOK_COLUMNS}"));
            push_matching(&mut page, &query, now);
            page.push(order_by(&query));
            page.push(" LIMIT ");
            page.push_bind(i64::from(query.limit));
            page.push(" OFFSET ");
            page.push_bind(i64::try_from(query.skip()).unwrap_or(i64::MAX));
            let rows: Vec<BookRow> = page
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::DatabaseError(format!("Failed to query books: {e}")))?;

            Ok(BookPage::new(
                &query,
                u64::try_from(total).unwrap_or_default(),
                rows::books(rows)?,
            ))
        })
    }
}
