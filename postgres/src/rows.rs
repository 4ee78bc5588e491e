//! Row types and their conversion into domain records.

use bookstore_core::error::{Result, StoreError};
use bookstore_core::types::{
    Address, Book, BookId, Cart, CartId, CartLine, Country, Credential, Discount, DiscountId, Money,
    PaymentMethod, Rank, ReviewEntry, Transaction, TransactionId, User, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub(crate) fn to_i32(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::SerializationError(format!("{field} {value} exceeds i32::MAX")))
}

pub(crate) fn to_u32(value: i32, field: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::SerializationError(format!("{field} {value} is negative")))
}

fn lines(book_ids: Vec<Uuid>, quantities: Vec<i32>) -> Result<Vec<CartLine>> {
    book_ids
        .into_iter()
        .zip(quantities)
        .map(|(book_id, quantity)| {
            Ok(CartLine {
                book_id: BookId::from_uuid(book_id),
                quantity: to_u32(quantity, "quantity")?,
            })
        })
        .collect()
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone_number: String,
    country: String,
    city: String,
    area: String,
    street: String,
    balance_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            phone_number: row.phone_number,
            address: Address {
                country: row.country,
                city: row.city,
                area: row.area,
                street: row.street,
            },
            balance: Money::from_cents(row.balance_cents),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CredentialRow {
    user_id: Uuid,
    email: String,
    password_hash: String,
    is_verified: bool,
    verification_code: Option<String>,
    rank: i16,
    is_restricted: bool,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = StoreError;

    fn try_from(row: CredentialRow) -> Result<Self> {
        Ok(Self {
            user_id: UserId::from_uuid(row.user_id),
            email: row.email,
            password_hash: row.password_hash,
            is_verified: row.is_verified,
            verification_code: row.verification_code,
            rank: Rank::try_from(row.rank).map_err(StoreError::SerializationError)?,
            is_restricted: row.is_restricted,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookRow {
    id: Uuid,
    title: String,
    description: String,
    author: String,
    price_cents: i64,
    rating: f64,
    stock: i32,
    category: String,
    published_at: NaiveDate,
    isbn: String,
}

impl TryFrom<BookRow> for Book {
    type Error = StoreError;

    fn try_from(row: BookRow) -> Result<Self> {
        Ok(Self {
            id: BookId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            author: row.author,
            price: Money::from_cents(row.price_cents),
            rating: row.rating,
            stock: to_u32(row.stock, "stock")?,
            category: row.category,
            published_at: row.published_at,
            isbn: row.isbn,
        })
    }
}

pub(crate) fn books(rows: Vec<BookRow>) -> Result<Vec<Book>> {
    rows.into_iter().map(Book::try_from).collect()
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReviewRow {
    user_id: Uuid,
    message: Option<String>,
    rating: f64,
}

impl From<ReviewRow> for ReviewEntry {
    fn from(row: ReviewRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            message: row.message,
            rating: row.rating,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CartRow {
    id: Uuid,
    user_id: Uuid,
    version: i64,
    book_ids: Vec<Uuid>,
    quantities: Vec<i32>,
}

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self> {
        Ok(Self {
            id: CartId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            books: lines(row.book_ids, row.quantities)?,
            version: row.version,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct DiscountRow {
    id: Uuid,
    discount_percentage: i16,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    countries: Vec<String>,
    book_ids: Vec<Uuid>,
}

impl TryFrom<DiscountRow> for Discount {
    type Error = StoreError;

    fn try_from(row: DiscountRow) -> Result<Self> {
        Ok(Self {
            id: DiscountId::from_uuid(row.id),
            discount_percentage: u8::try_from(row.discount_percentage).map_err(|_| {
                StoreError::SerializationError(format!(
                    "Invalid discount percentage: {}",
                    row.discount_percentage
                ))
            })?,
            book_ids: row.book_ids.into_iter().map(BookId::from_uuid).collect(),
            start_date: row.start_date,
            end_date: row.end_date,
            countries: row
                .countries
                .iter()
                .map(|c| c.parse::<Country>().map_err(StoreError::SerializationError))
                .collect::<Result<_>>()?,
        })
    }
}

pub(crate) fn discounts(rows: Vec<DiscountRow>) -> Result<Vec<Discount>> {
    rows.into_iter().map(Discount::try_from).collect()
}

#[derive(sqlx::FromRow)]
pub(crate) struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    total_cents: i64,
    payment_method: String,
    created_at: DateTime<Utc>,
    book_ids: Vec<Uuid>,
    quantities: Vec<i32>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(Self {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            books: lines(row.book_ids, row.quantities)?,
            total_price: Money::from_cents(row.total_cents),
            payment_method: row
                .payment_method
                .parse::<PaymentMethod>()
                .map_err(StoreError::SerializationError)?,
            created_at: row.created_at,
        })
    }
}

pub(crate) fn transactions(rows: Vec<TransactionRow>) -> Result<Vec<Transaction>> {
    rows.into_iter().map(Transaction::try_from).collect()
}
