//! Application services.
//!
//! Each service owns the collaborators one API area needs, runs the pure
//! rules from `bookstore-core` against store snapshots, and returns
//! [`AppError`](bookstore_web::AppError) on failure. Handlers obtain them
//! from [`AppState`] through [`FromRef`]:
//!
//! ```rust,ignore
//! async fn get_cart(user: RequireUser, State(carts): State<CartService>) -> ... {
//!     carts.view(user.user_id).await
//! }
//! ```

use crate::server::state::AppState;
use axum::extract::FromRef;
use bookstore_core::store::{BookStore, DiscountStore};
use bookstore_core::types::{Book, BookId, Discount};
use bookstore_core::{DateTime, Utc, pricing};
use std::collections::HashMap;

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod discount;
pub mod review;
pub mod user;

pub use auth::AuthService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use discount::DiscountService;
pub use review::ReviewService;
pub use user::UserService;

/// Books by id plus the discounts active for a buyer, for pricing a set of
/// lines.
pub(crate) struct PriceSnapshot {
    pub books: HashMap<BookId, Book>,
    pub discounts: Vec<Discount>,
}

/// Load every book in `book_ids` and the discounts active at `now` for a
/// buyer in `country`.
pub(crate) async fn price_snapshot(
    books: &dyn BookStore,
    discounts: &dyn DiscountStore,
    now: DateTime<Utc>,
    country: &str,
    book_ids: Vec<BookId>,
) -> bookstore_core::Result<PriceSnapshot> {
    let found = books.find_books(book_ids.clone()).await?;
    let open = discounts.open_discounts(now, book_ids.clone()).await?;
    Ok(PriceSnapshot {
        books: found.into_iter().map(|b| (b.id, b)).collect(),
        discounts: pricing::active_discounts(&open, now, country, &book_ids),
    })
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.stores.users.clone(),
            state.auth.clone(),
            state.clock.clone(),
        )
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.stores.users.clone(),
            state.auth.sessions.clone(),
            state.clock.clone(),
        )
    }
}

impl FromRef<AppState> for CatalogService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.stores.books.clone(),
            state.stores.discounts.clone(),
            state.clock.clone(),
        )
    }
}

impl FromRef<AppState> for ReviewService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.stores.books.clone(), state.stores.reviews.clone())
    }
}

impl FromRef<AppState> for DiscountService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.stores.books.clone(),
            state.stores.discounts.clone(),
            state.clock.clone(),
        )
    }
}

impl FromRef<AppState> for CartService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.stores.clone(), state.clock.clone())
    }
}

impl FromRef<AppState> for CheckoutService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.stores.clone(), state.clock.clone())
    }
}
