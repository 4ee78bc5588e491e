//! Checkout planning.
//!
//! [`plan_checkout`] runs every precondition against a snapshot of the cart,
//! user, books and discounts, and produces a [`CheckoutPlan`]. The store
//! commits the plan atomically and re-runs [`check_balance`] and
//! [`check_stock`] under its locks, so a plan computed from a stale snapshot
//! can never overdraw a balance or drive stock negative.

use crate::pricing;
use crate::types::{
    Book, BookId, Cart, CartId, CartLine, Discount, Money, PaymentMethod, Transaction,
    TransactionId, User, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

/// Why a checkout attempt was refused. Nothing is modified in any case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutRejection {
    /// No cart with the given id belongs to the user
    CartNotFound,
    /// The cart has no lines
    EmptyCart,
    /// Balance is zero or below the total
    InsufficientBalance,
    /// At least one book in the cart no longer exists
    MissingBooks,
    /// These books have less stock than the cart asks for
    InsufficientStock(Vec<BookId>),
    /// The cart changed between planning and commit
    CartChanged,
}

impl fmt::Display for CheckoutRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CartNotFound => "No cart exists for the user",
            Self::EmptyCart => "Please add books to cart first",
            Self::InsufficientBalance => {
                "Not enough balance.Please recharge and then place your order"
            }
            Self::MissingBooks => "All products in cart do not exist",
            Self::InsufficientStock(_) => "Not enough stock",
            Self::CartChanged => "The cart changed during checkout, please try again",
        })
    }
}

impl std::error::Error for CheckoutRejection {}

/// Everything the store needs to commit a checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutPlan {
    /// Id of the transaction to create
    pub transaction_id: TransactionId,
    /// Buyer
    pub user_id: UserId,
    /// Cart being checked out
    pub cart_id: CartId,
    /// Cart version the plan was computed from
    pub cart_version: i64,
    /// Purchased lines (also the stock decrements)
    pub lines: Vec<CartLine>,
    /// Amount to debit
    pub total: Money,
    /// Payment method
    pub payment_method: PaymentMethod,
    /// Checkout time
    pub created_at: DateTime<Utc>,
}

impl CheckoutPlan {
    /// The transaction snapshot this plan records
    #[must_use]
    pub fn transaction(&self) -> Transaction {
        Transaction {
            id: self.transaction_id,
            user_id: self.user_id,
            books: self.lines.clone(),
            total_price: self.total,
            payment_method: self.payment_method,
            created_at: self.created_at,
        }
    }
}

/// Balance must be positive and cover the total.
///
/// # Errors
///
/// Returns [`CheckoutRejection::InsufficientBalance`] otherwise.
pub const fn check_balance(balance: Money, total: Money) -> Result<(), CheckoutRejection> {
    if balance.is_empty() || balance.cents() < total.cents() {
        return Err(CheckoutRejection::InsufficientBalance);
    }
    Ok(())
}

/// Every line's book must exist and hold at least the line quantity.
///
/// `stock` maps book ids to their current stock.
///
/// # Errors
///
/// - [`CheckoutRejection::MissingBooks`] if any book is absent
/// - [`CheckoutRejection::InsufficientStock`] listing the short books
pub fn check_stock(
    lines: &[CartLine],
    stock: &HashMap<BookId, u32>,
) -> Result<(), CheckoutRejection> {
    if lines.iter().any(|l| !stock.contains_key(&l.book_id)) {
        return Err(CheckoutRejection::MissingBooks);
    }
    let short: Vec<BookId> = lines
        .iter()
        .filter(|l| stock.get(&l.book_id).is_some_and(|s| *s < l.quantity))
        .map(|l| l.book_id)
        .collect();
    if short.is_empty() {
        Ok(())
    } else {
        Err(CheckoutRejection::InsufficientStock(short))
    }
}

/// Validates a checkout attempt and computes its total.
///
/// Steps, in order: cart exists, belongs to the user and is non-empty; total
/// via the pricing calculator; balance covers it; every book exists with
/// enough stock.
///
/// `candidates` must be the discounts active at `now` for the user's country.
///
/// # Errors
///
/// Returns the first failed precondition as a [`CheckoutRejection`].
pub fn plan_checkout(
    user: &User,
    cart: Option<&Cart>,
    books: &HashMap<BookId, Book>,
    candidates: &[Discount],
    payment_method: PaymentMethod,
    now: DateTime<Utc>,
) -> Result<CheckoutPlan, CheckoutRejection> {
    let cart = cart
        .filter(|c| c.user_id == user.id)
        .ok_or(CheckoutRejection::CartNotFound)?;
    if cart.is_empty() {
        return Err(CheckoutRejection::EmptyCart);
    }

    let total = pricing::cart_totals(&cart.books, books, candidates).after_discount;
    check_balance(user.balance, total)?;

    let stock: HashMap<BookId, u32> = books.values().map(|b| (b.id, b.stock)).collect();
    check_stock(&cart.books, &stock)?;

    Ok(CheckoutPlan {
        transaction_id: TransactionId::new(),
        user_id: user.id,
        cart_id: cart.id,
        cart_version: cart.version,
        lines: cart.books.clone(),
        total,
        payment_method,
        created_at: now,
    })
}
