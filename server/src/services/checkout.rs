//! Checkout orchestration and transaction history.
//!
//! The plan is computed from a snapshot; the store commits it atomically and
//! re-checks balance and stock under its locks.

use super::{PriceSnapshot, price_snapshot};
use crate::metrics::{CHECKOUT_COMPLETED, CHECKOUT_REJECTED};
use crate::server::state::Stores;
use bookstore_core::StoreError;
use bookstore_core::checkout::{self, CheckoutRejection};
use bookstore_core::environment::Clock;
use bookstore_core::types::{CartId, PaymentMethod, Transaction, UserId};
use bookstore_web::{AppError, WebResult};
use std::sync::Arc;

const fn reason(rejection: &CheckoutRejection) -> &'static str {
    match rejection {
        CheckoutRejection::CartNotFound => "cart_not_found",
        CheckoutRejection::EmptyCart => "empty_cart",
        CheckoutRejection::InsufficientBalance => "insufficient_balance",
        CheckoutRejection::MissingBooks => "missing_books",
        CheckoutRejection::InsufficientStock(_) => "insufficient_stock",
        CheckoutRejection::CartChanged => "cart_changed",
    }
}

fn rejected(user_id: UserId, rejection: CheckoutRejection) -> AppError {
    metrics::counter!(CHECKOUT_REJECTED, "reason" => reason(&rejection)).increment(1);
    tracing::info!(user_id = %user_id, %rejection, "Checkout rejected");
    rejection.into()
}

/// Checkout service.
#[derive(Clone)]
pub struct CheckoutService {
    stores: Stores,
    clock: Arc<dyn Clock>,
}

impl CheckoutService {
    /// Create a checkout service.
    #[must_use]
    pub fn new(stores: Stores, clock: Arc<dyn Clock>) -> Self {
        Self { stores, clock }
    }

    /// Buy everything in the user's cart.
    ///
    /// # Errors
    ///
    /// 422 with the first failed precondition's message; nothing is modified.
    pub async fn checkout(
        &self,
        user_id: UserId,
        cart_id: CartId,
        payment_method: PaymentMethod,
    ) -> WebResult<Transaction> {
        let user = self
            .stores
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let cart = self.stores.carts.find_cart(cart_id).await?;
        let now = self.clock.now();

        let book_ids = cart.as_ref().map(|c| c.book_ids()).unwrap_or_default();
        let PriceSnapshot { books, discounts } = price_snapshot(
            self.stores.books.as_ref(),
            self.stores.discounts.as_ref(),
            now,
            &user.address.country,
            book_ids,
        )
        .await?;

        let plan = checkout::plan_checkout(
            &user,
            cart.as_ref(),
            &books,
            &discounts,
            payment_method,
            now,
        )
        .map_err(|r| rejected(user_id, r))?;

        let transaction = self
            .stores
            .transactions
            .commit_checkout(plan)
            .await
            .map_err(|e| match e {
                StoreError::CheckoutRejected(r) => rejected(user_id, r),
                other => other.into(),
            })?;

        metrics::counter!(CHECKOUT_COMPLETED, "payment_method" => payment_method.as_str())
            .increment(1);
        tracing::info!(
            user_id = %user_id,
            transaction_id = %transaction.id,
            total = %transaction.total_price,
            lines = transaction.books.len(),
            "Order placed"
        );
        Ok(transaction)
    }

    /// The user's transactions, newest first.
    ///
    /// # Errors
    ///
    /// - 404 "No transaction found"
    pub async fn history(&self, user_id: UserId) -> WebResult<Vec<Transaction>> {
        let transactions = self.stores.transactions.transactions_for_user(user_id).await?;
        if transactions.is_empty() {
            return Err(AppError::not_found("No transaction found"));
        }
        Ok(transactions)
    }

    /// Every transaction.
    ///
    /// # Errors
    ///
    /// Returns 500 if the store fails.
    pub async fn all(&self) -> WebResult<Vec<Transaction>> {
        Ok(self.stores.transactions.all_transactions().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::CartService;
    use axum::http::StatusCode;
    use bookstore_core::store::{BookStore, DiscountStore, UserStore};
    use bookstore_core::types::{Book, Country, Money, User};
    use bookstore_testing::fixtures::{BookBuilder, UserBuilder, open_discount};
    use bookstore_testing::{InMemoryStore, test_clock};

    struct Fixture {
        checkout: CheckoutService,
        carts: CartService,
        store: InMemoryStore,
        user: User,
        book: Book,
    }

    async fn fixture(balance: i64, stock: u32) -> Fixture {
        let store = InMemoryStore::new();
        let (user, credential) = UserBuilder::new("buyer@example.com", test_clock().now())
            .balance(balance)
            .build();
        store.create_account(user.clone(), credential).await.unwrap();
        let book = BookBuilder::new("Programming Rust").price(100).stock(stock).build();
        store.insert_book(book.clone()).await.unwrap();

        let stores = Stores::shared(store.clone());
        let clock: Arc<dyn Clock> = Arc::new(test_clock());
        Fixture {
            checkout: CheckoutService::new(stores.clone(), clock.clone()),
            carts: CartService::new(stores, clock),
            store,
            user,
            book,
        }
    }

    #[tokio::test]
    async fn successful_checkout_moves_stock_and_balance() {
        let f = fixture(500, 20).await;
        f.store
            .insert_discount(open_discount(
                20,
                vec![f.book.id],
                vec![Country::Bd],
                test_clock().now(),
            ))
            .await
            .unwrap();
        let (summary, _) = f.carts.add(f.user.id, f.book.id, 3).await.unwrap();

        let transaction = f
            .checkout
            .checkout(f.user.id, summary.cart.id, PaymentMethod::Card)
            .await
            .unwrap();

        assert_eq!(transaction.total_price, Money::from_units(240));
        assert_eq!(
            f.store.find_book(f.book.id).await.unwrap().unwrap().stock,
            17
        );
        assert_eq!(
            f.store.find_user(f.user.id).await.unwrap().unwrap().balance,
            Money::from_units(260)
        );
        assert_eq!(f.checkout.history(f.user.id).await.unwrap(), vec![transaction]);
    }

    #[tokio::test]
    async fn insufficient_balance_changes_nothing() {
        let f = fixture(100, 20).await;
        let (summary, _) = f.carts.add(f.user.id, f.book.id, 3).await.unwrap();

        let err = f
            .checkout
            .checkout(f.user.id, summary.cart.id, PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.message(),
            "Not enough balance.Please recharge and then place your order"
        );
        assert_eq!(
            f.store.find_book(f.book.id).await.unwrap().unwrap().stock,
            20
        );
        assert!(f.checkout.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cart_of_another_user_is_not_found() {
        let f = fixture(500, 20).await;
        let (summary, _) = f.carts.add(f.user.id, f.book.id, 1).await.unwrap();

        let (other, credential) =
            UserBuilder::new("other@example.com", test_clock().now()).balance(500).build();
        f.store.create_account(other.clone(), credential).await.unwrap();

        let err = f
            .checkout
            .checkout(other.id, summary.cart.id, PaymentMethod::Online)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "No cart exists for the user");
    }

    #[tokio::test]
    async fn emptied_cart_cannot_be_checked_out_twice() {
        let f = fixture(1_000, 20).await;
        let (summary, _) = f.carts.add(f.user.id, f.book.id, 2).await.unwrap();
        f.checkout
            .checkout(f.user.id, summary.cart.id, PaymentMethod::Online)
            .await
            .unwrap();

        let err = f
            .checkout
            .checkout(f.user.id, summary.cart.id, PaymentMethod::Online)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Please add books to cart first");
    }

    #[tokio::test]
    async fn history_without_transactions_is_not_found() {
        let f = fixture(0, 20).await;
        let err = f.checkout.history(f.user.id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "No transaction found");
    }
}
