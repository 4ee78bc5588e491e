//! API endpoints for the bookstore.
//!
//! Handlers are organized by area:
//! - Auth: sign-up, verification and sessions
//! - Users: balances and account administration
//! - Books: catalog queries and administration
//! - Reviews: per-book ratings
//! - Discounts: time-boxed, country-scoped discounts
//! - Cart: per-user carts with totals
//! - Transactions: checkout and history

pub mod auth;
pub mod books;
pub mod cart;
pub mod discounts;
pub mod reviews;
pub mod transactions;
pub mod users;

pub use auth::{login, logout, refresh_token, sign_up, verify_account};
pub use books::{all_books, book_details, create_book, delete_book, update_book};
pub use cart::{add_to_cart, get_cart, update_cart};
pub use discounts::{all_discounts, create_discount, delete_discount, update_discount};
pub use reviews::{book_reviews, create_review, delete_review, update_review};
pub use transactions::{all_transactions, checkout, my_transactions};
pub use users::{add_balance, all_users, balance, delete_user, update_user};
