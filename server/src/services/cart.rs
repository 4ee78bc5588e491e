//! Cart mutations and the priced cart view.
//!
//! Every mutation is a read-modify-write guarded by the cart version: a save
//! that loses a race is retried against a fresh snapshot. Totals are
//! recomputed from scratch after each mutation.

use super::{PriceSnapshot, price_snapshot};
use crate::metrics::CART_MUTATIONS;
use crate::server::state::Stores;
use bookstore_core::StoreError;
use bookstore_core::cart::{self, AddOutcome, RemoveOutcome};
use bookstore_core::environment::Clock;
use bookstore_core::pricing::{self, FormattedTotals};
use bookstore_core::types::{Book, BookId, Cart, User, UserId};
use bookstore_web::{AppError, WebResult};
use serde::Serialize;
use std::sync::Arc;

/// Attempts at saving a cart before giving up on a version race.
const MAX_SAVE_ATTEMPTS: usize = 3;

/// A cart with its totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// The cart
    pub cart: Cart,
    /// `beforeDiscount` and `afterDiscount`
    #[serde(flatten)]
    pub totals: FormattedTotals,
}

/// What `GET /cart` found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartView {
    /// The cart exists but has no lines
    Empty,
    /// The cart and its totals
    Filled(CartSummary),
}

/// Cart service.
#[derive(Clone)]
pub struct CartService {
    stores: Stores,
    clock: Arc<dyn Clock>,
}

impl CartService {
    /// Create a cart service.
    #[must_use]
    pub fn new(stores: Stores, clock: Arc<dyn Clock>) -> Self {
        Self { stores, clock }
    }

    async fn buyer(&self, user_id: UserId) -> WebResult<User> {
        self.stores
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn summarize(&self, user: &User, cart: Cart) -> WebResult<CartSummary> {
        let PriceSnapshot { books, discounts } = price_snapshot(
            self.stores.books.as_ref(),
            self.stores.discounts.as_ref(),
            self.clock.now(),
            &user.address.country,
            cart.book_ids(),
        )
        .await?;
        let totals = pricing::cart_totals(&cart.books, &books, &discounts);
        Ok(CartSummary {
            cart,
            totals: totals.into(),
        })
    }

    /// Load the user's cart, apply `mutate`, and save it, retrying on a
    /// version race.
    async fn mutate<T, F>(
        &self,
        user_id: UserId,
        operation: &'static str,
        mutate: F,
    ) -> WebResult<(Cart, T)>
    where
        F: Fn(Option<Cart>) -> WebResult<(Cart, T)>,
    {
        let mut attempt = 1;
        loop {
            let current = self.stores.carts.find_cart_by_user(user_id).await?;
            let (mut cart, outcome) = mutate(current)?;
            match self.stores.carts.save_cart(cart.clone()).await {
                Ok(version) => {
                    cart.version = version;
                    metrics::counter!(CART_MUTATIONS, "operation" => operation).increment(1);
                    return Ok((cart, outcome));
                }
                Err(StoreError::ConcurrencyConflict(reason)) if attempt < MAX_SAVE_ATTEMPTS => {
                    tracing::debug!(user_id = %user_id, attempt, %reason, "Cart save lost a race, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Add units of a book to the user's cart, creating the cart if needed.
    ///
    /// # Errors
    ///
    /// - 404 "No book Found"
    /// - 422 with the cart rule's message when stock cannot cover the line
    pub async fn add(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> WebResult<(CartSummary, AddOutcome)> {
        let user = self.buyer(user_id).await?;
        let book = self.book(book_id).await?;

        let (cart, outcome) = self
            .mutate(user_id, "add", |current| {
                cart::add_to_cart(current, user_id, &book, quantity)
                    .map_err(|r| AppError::unprocessable(r.to_string()))
            })
            .await?;

        tracing::info!(user_id = %user_id, book_id = %book_id, quantity, ?outcome, "Added to cart");
        Ok((self.summarize(&user, cart).await?, outcome))
    }

    /// Remove units of a book from the user's cart.
    ///
    /// # Errors
    ///
    /// - 404 "No book Found"
    /// - 404 "No cart exist for this user"
    /// - 422 with the cart rule's message
    pub async fn remove(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> WebResult<(CartSummary, RemoveOutcome)> {
        let user = self.buyer(user_id).await?;
        self.book(book_id).await?;

        let (cart, outcome) = self
            .mutate(user_id, "remove", |current| {
                let mut cart =
                    current.ok_or_else(|| AppError::not_found("No cart exist for this user"))?;
                let outcome = cart::remove_from_cart(&mut cart, book_id, quantity)
                    .map_err(|r| AppError::unprocessable(r.to_string()))?;
                Ok((cart, outcome))
            })
            .await?;

        tracing::info!(user_id = %user_id, book_id = %book_id, quantity, ?outcome, "Removed from cart");
        Ok((self.summarize(&user, cart).await?, outcome))
    }

    /// The user's cart with totals.
    ///
    /// # Errors
    ///
    /// - 404 "No cart exists for this user"
    pub async fn view(&self, user_id: UserId) -> WebResult<CartView> {
        let user = self.buyer(user_id).await?;
        let cart = self
            .stores
            .carts
            .find_cart_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("No cart exists for this user"))?;
        if cart.is_empty() {
            return Ok(CartView::Empty);
        }
        Ok(CartView::Filled(self.summarize(&user, cart).await?))
    }

    async fn book(&self, book_id: BookId) -> WebResult<Book> {
        self.stores
            .books
            .find_book(book_id)
            .await?
            .ok_or_else(|| AppError::not_found("No book Found"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use bookstore_core::store::{BookStore, CartStore, DiscountStore, UserStore};
    use bookstore_core::types::{Book, Country};
    use bookstore_testing::fixtures::{BookBuilder, UserBuilder, open_discount};
    use bookstore_testing::{InMemoryStore, test_clock};
    use proptest::prelude::*;

    struct Fixture {
        service: CartService,
        store: InMemoryStore,
        user: User,
    }

    async fn fixture(country: &str) -> Fixture {
        let store = InMemoryStore::new();
        let (user, credential) = UserBuilder::new("cart@example.com", test_clock().now())
            .country(country)
            .build();
        store.create_account(user.clone(), credential).await.unwrap();
        let service = CartService::new(Stores::shared(store.clone()), Arc::new(test_clock()));
        Fixture {
            service,
            store,
            user,
        }
    }

    async fn stocked(store: &InMemoryStore, title: &str, price: i64, stock: u32) -> Book {
        let book = BookBuilder::new(title).price(price).stock(stock).build();
        store.insert_book(book.clone()).await.unwrap();
        book
    }

    #[tokio::test]
    async fn totals_apply_discount_for_buyer_country() {
        let f = fixture("BD").await;
        let book = stocked(&f.store, "Programming Rust", 100, 20).await;
        f.store
            .insert_discount(open_discount(20, vec![book.id], vec![Country::Bd], test_clock().now()))
            .await
            .unwrap();

        let (summary, outcome) = f.service.add(f.user.id, book.id, 3).await.unwrap();

        assert_eq!(outcome, AddOutcome::CreatedCart);
        assert_eq!(summary.totals.before_discount, "300.00");
        assert_eq!(summary.totals.after_discount, "240.00");
    }

    #[tokio::test]
    async fn other_countries_pay_full_price() {
        let f = fixture("US").await;
        let book = stocked(&f.store, "Programming Rust", 100, 20).await;
        f.store
            .insert_discount(open_discount(20, vec![book.id], vec![Country::Bd], test_clock().now()))
            .await
            .unwrap();

        let (summary, _) = f.service.add(f.user.id, book.id, 3).await.unwrap();
        assert_eq!(summary.totals.after_discount, "300.00");
    }

    #[tokio::test]
    async fn add_outcomes_follow_cart_state() {
        let f = fixture("BD").await;
        let first = stocked(&f.store, "Rust Atomics", 40, 10).await;
        let second = stocked(&f.store, "Rust in Action", 55, 10).await;

        let (_, outcome) = f.service.add(f.user.id, first.id, 2).await.unwrap();
        assert_eq!(outcome, AddOutcome::CreatedCart);
        let (_, outcome) = f.service.add(f.user.id, first.id, 2).await.unwrap();
        assert_eq!(outcome, AddOutcome::IncrementedLine);
        let (summary, outcome) = f.service.add(f.user.id, second.id, 1).await.unwrap();
        assert_eq!(outcome, AddOutcome::AddedLine);
        assert_eq!(summary.cart.books.len(), 2);
        assert_eq!(summary.cart.line(first.id).unwrap().quantity, 4);
    }

    #[tokio::test]
    async fn removing_everything_empties_the_cart() {
        let f = fixture("BD").await;
        let book = stocked(&f.store, "Rust Atomics", 40, 10).await;
        f.service.add(f.user.id, book.id, 3).await.unwrap();

        let (_, outcome) = f.service.remove(f.user.id, book.id, 1).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Reduced);
        let err = f.service.remove(f.user.id, book.id, 5).await.unwrap_err();
        assert_eq!(
            err.message(),
            "The provided quantity exceed the quantity available in the cart"
        );
        let (summary, outcome) = f.service.remove(f.user.id, book.id, 2).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::CartEmptied);
        assert!(summary.cart.is_empty());

        assert_eq!(f.service.view(f.user.id).await.unwrap(), CartView::Empty);
    }

    #[tokio::test]
    async fn missing_cart_and_book() {
        let f = fixture("BD").await;
        let err = f.service.view(f.user.id).await.unwrap_err();
        assert_eq!(err.message(), "No cart exists for this user");

        let book = stocked(&f.store, "Programming Rust", 100, 20).await;
        let err = f.service.remove(f.user.id, book.id, 1).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "No cart exist for this user");

        let err = f.service.remove(f.user.id, BookId::new(), 1).await.unwrap_err();
        assert_eq!(err.message(), "No book Found");

        let err = f.service.add(f.user.id, BookId::new(), 1).await.unwrap_err();
        assert_eq!(err.message(), "No book Found");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn stored_quantity_never_exceeds_stock(
            stock in 1_u32..40,
            requests in prop::collection::vec(1_u32..15, 1..8),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let f = fixture("BD").await;
                let book = stocked(&f.store, "Rust Atomics", 40, stock).await;
                for quantity in requests {
                    let _ = f.service.add(f.user.id, book.id, quantity).await;
                    if let Some(cart) = f.store.find_cart_by_user(f.user.id).await.unwrap() {
                        let held = cart.line(book.id).map_or(0, |l| l.quantity);
                        assert!(held <= stock, "{held} > {stock}");
                    }
                }
            });
        }
    }
}
