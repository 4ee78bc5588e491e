//! Persistence traits.
//!
//! Each record group has its own trait so services depend only on what they
//! touch. `bookstore-postgres` implements all of them over one pool and
//! `bookstore-testing` over one in-memory map.
//!
//! # Dyn Compatibility
//!
//! Methods return [`StoreFuture`] instead of using `async fn` so the traits
//! can be held as `Arc<dyn UserStore>` and friends in the application state.
//! Arguments are taken by value so the returned future borrows only `self`.

use crate::catalog::{BookPage, BookQuery};
use crate::checkout::CheckoutPlan;
use crate::error::Result;
use crate::types::{
    Address, Book, BookId, BookReviews, Cart, CartId, Credential, Discount, DiscountId, Money,
    ReviewEntry, Transaction, User, UserId,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Users and their credentials.
pub trait UserStore: Send + Sync {
    /// Inserts a user together with its credential.
    ///
    /// # Errors
    ///
    /// - `Conflict`: the email is already registered
    /// - `DatabaseError`: query failed
    fn create_account(&self, user: User, credential: Credential) -> StoreFuture<'_, ()>;

    /// Loads a user by id.
    fn find_user(&self, user_id: UserId) -> StoreFuture<'_, Option<User>>;

    /// Loads the credential registered for an email (lowercased by callers).
    fn find_credential_by_email(&self, email: String) -> StoreFuture<'_, Option<Credential>>;

    /// Loads the credential of a user.
    fn find_credential(&self, user_id: UserId) -> StoreFuture<'_, Option<Credential>>;

    /// Marks the credential verified and clears its verification code.
    fn mark_verified(&self, user_id: UserId) -> StoreFuture<'_, ()>;

    /// Sets the restriction flag. Returns `false` if the user does not exist.
    fn set_restricted(&self, user_id: UserId, restricted: bool) -> StoreFuture<'_, bool>;

    /// Users whose credential is not restricted, oldest first.
    fn list_active_users(&self) -> StoreFuture<'_, Vec<User>>;

    /// Replaces the present profile fields. Returns the updated user, or
    /// `None` if it does not exist.
    fn update_profile(
        &self,
        user_id: UserId,
        name: Option<String>,
        address: Option<Address>,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<User>>;

    /// Adds `amount` to the balance. Returns the new balance, or `None` if
    /// the user does not exist.
    fn add_balance(
        &self,
        user_id: UserId,
        amount: Money,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<Money>>;
}

/// The book catalog.
pub trait BookStore: Send + Sync {
    /// Inserts a book.
    ///
    /// # Errors
    ///
    /// - `Conflict`: title, description or isbn already taken
    fn insert_book(&self, book: Book) -> StoreFuture<'_, ()>;

    /// Loads a book by id.
    fn find_book(&self, book_id: BookId) -> StoreFuture<'_, Option<Book>>;

    /// Loads every existing book among `book_ids`. Missing ids are skipped.
    fn find_books(&self, book_ids: Vec<BookId>) -> StoreFuture<'_, Vec<Book>>;

    /// First book, other than `exclude`, sharing the title, description or
    /// isbn given.
    fn find_conflict(
        &self,
        title: Option<String>,
        description: Option<String>,
        isbn: Option<String>,
        exclude: Option<BookId>,
    ) -> StoreFuture<'_, Option<Book>>;

    /// Overwrites a book. Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// - `Conflict`: a unique field collides with another book
    fn update_book(&self, book: Book) -> StoreFuture<'_, bool>;

    /// Deletes a book. Returns `false` if it does not exist.
    fn delete_book(&self, book_id: BookId) -> StoreFuture<'_, bool>;

    /// Runs a catalog query. `now` selects the discounts used by the
    /// discount percentage filter.
    fn query_books(&self, query: BookQuery, now: DateTime<Utc>) -> StoreFuture<'_, BookPage>;
}

/// Review entries and the book rating they aggregate into.
///
/// Every mutation recomputes `book.rating` in the same unit of work.
pub trait ReviewStore: Send + Sync {
    /// All entries for a book, or `None` if it has none.
    fn reviews_for_book(&self, book_id: BookId) -> StoreFuture<'_, Option<BookReviews>>;

    /// Adds an entry and returns the new book rating.
    ///
    /// # Errors
    ///
    /// - `Conflict`: the user already reviewed the book
    fn add_review(&self, book_id: BookId, entry: ReviewEntry) -> StoreFuture<'_, f64>;

    /// Replaces the user's rating and, when given, message. Returns the new
    /// book rating, or `None` if the user has no entry.
    fn update_review(
        &self,
        book_id: BookId,
        user_id: UserId,
        rating: f64,
        message: Option<String>,
    ) -> StoreFuture<'_, Option<f64>>;

    /// Removes the user's entry. Returns the new book rating, or `None` if
    /// the user has no entry.
    fn delete_review(&self, book_id: BookId, user_id: UserId) -> StoreFuture<'_, Option<f64>>;
}

/// Shopping carts.
pub trait CartStore: Send + Sync {
    /// The user's cart, if one was ever saved.
    fn find_cart_by_user(&self, user_id: UserId) -> StoreFuture<'_, Option<Cart>>;

    /// A cart by id.
    fn find_cart(&self, cart_id: CartId) -> StoreFuture<'_, Option<Cart>>;

    /// Writes the cart if its stored version still equals `cart.version`
    /// (0 inserts). Returns the new version.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the cart changed since it was read
    fn save_cart(&self, cart: Cart) -> StoreFuture<'_, i64>;
}

/// Discount records.
pub trait DiscountStore: Send + Sync {
    /// Every discount, in creation order.
    fn list_discounts(&self) -> StoreFuture<'_, Vec<Discount>>;

    /// A discount by id.
    fn find_discount(&self, discount_id: DiscountId) -> StoreFuture<'_, Option<Discount>>;

    /// Discounts covering any of `book_ids`, regardless of window.
    fn discounts_for_books(&self, book_ids: Vec<BookId>) -> StoreFuture<'_, Vec<Discount>>;

    /// Discounts open at `now` covering any of `book_ids`, for any country.
    fn open_discounts(
        &self,
        now: DateTime<Utc>,
        book_ids: Vec<BookId>,
    ) -> StoreFuture<'_, Vec<Discount>>;

    /// Inserts a discount.
    ///
    /// # Errors
    ///
    /// - `Conflict`: one of its books already has a discount
    fn insert_discount(&self, discount: Discount) -> StoreFuture<'_, ()>;

    /// Overwrites a discount. Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// - `Conflict`: one of its books belongs to another discount
    fn update_discount(&self, discount: Discount) -> StoreFuture<'_, bool>;

    /// Deletes a discount. Returns `false` if it does not exist.
    fn delete_discount(&self, discount_id: DiscountId) -> StoreFuture<'_, bool>;
}

/// Checkout commits and the transaction history.
pub trait TransactionStore: Send + Sync {
    /// Applies a checkout plan as one unit: stock decrements, balance debit,
    /// transaction insert and cart clearing. Balance and stock are checked
    /// again while the rows are locked, and the cart must still be at
    /// `plan.cart_version`.
    ///
    /// # Errors
    ///
    /// - `CheckoutRejected`: a precondition no longer holds; nothing changed
    /// - `DatabaseError`: query failed; nothing changed
    fn commit_checkout(&self, plan: CheckoutPlan) -> StoreFuture<'_, Transaction>;

    /// The user's transactions, newest first.
    fn transactions_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Transaction>>;

    /// Every transaction, newest first.
    fn all_transactions(&self) -> StoreFuture<'_, Vec<Transaction>>;
}
