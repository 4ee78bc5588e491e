//! Cart mutation rules.
//!
//! Each (user, book) line is either absent or present with a positive
//! quantity. Adding creates or increments a line without ever exceeding the
//! book's stock; decrementing reduces a line and removes it at zero.

use crate::types::{Book, BookId, Cart, CartLine, UserId};
use std::fmt;

/// Largest quantity accepted in a single add or update request.
pub const MAX_REQUEST_QUANTITY: u32 = 10_000_000;

/// What an accepted add did to the cart.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The user had no cart; one was created with the line
    CreatedCart,
    /// The book was already in the cart; its quantity grew
    IncrementedLine,
    /// The cart existed; a new line was appended
    AddedLine,
}

/// What an accepted decrement did to the cart.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The line still has units left
    Reduced,
    /// The line was removed; other lines remain
    LineRemoved,
    /// The line was removed and the cart is now empty
    CartEmptied,
}

/// Why a cart mutation was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartRejection {
    /// Quantity outside `1..=MAX_REQUEST_QUANTITY`
    InvalidQuantity,
    /// First add for a user asked for more than the stock
    ExceedsStockForNewCart,
    /// Adding to an existing cart would exceed the stock
    NotEnoughStock,
    /// Decrement targeted a book that is not in the cart
    NotInCart,
    /// Decrement asked for more units than the line holds
    ExceedsLineQuantity,
}

impl fmt::Display for CartRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidQuantity => "Quantity must be between 1 and 10000000",
            Self::ExceedsStockForNewCart => "The given quantity exceed the book stock",
            Self::NotEnoughStock => "Not enough stock",
            Self::NotInCart => "This book do not exist in the cart",
            Self::ExceedsLineQuantity => {
                "The provided quantity exceed the quantity available in the cart"
            }
        })
    }
}

impl std::error::Error for CartRejection {}

fn check_quantity(quantity: u32) -> Result<(), CartRejection> {
    if quantity == 0 || quantity > MAX_REQUEST_QUANTITY {
        return Err(CartRejection::InvalidQuantity);
    }
    Ok(())
}

/// Adds `quantity` units of `book` to the user's cart.
///
/// With no existing cart a fresh one is created. The resulting line quantity
/// never exceeds `book.stock`.
///
/// # Errors
///
/// Returns a [`CartRejection`] if the quantity is out of range or the stock
/// cannot cover the resulting line.
pub fn add_to_cart(
    cart: Option<Cart>,
    user_id: UserId,
    book: &Book,
    quantity: u32,
) -> Result<(Cart, AddOutcome), CartRejection> {
    check_quantity(quantity)?;

    let Some(mut cart) = cart else {
        if quantity > book.stock {
            return Err(CartRejection::ExceedsStockForNewCart);
        }
        let mut cart = Cart::new(user_id);
        cart.books.push(CartLine {
            book_id: book.id,
            quantity,
        });
        return Ok((cart, AddOutcome::CreatedCart));
    };

    if let Some(line) = cart.books.iter_mut().find(|l| l.book_id == book.id) {
        let total = line
            .quantity
            .checked_add(quantity)
            .ok_or(CartRejection::NotEnoughStock)?;
        if total > book.stock {
            return Err(CartRejection::NotEnoughStock);
        }
        line.quantity = total;
        return Ok((cart, AddOutcome::IncrementedLine));
    }

    if quantity > book.stock {
        return Err(CartRejection::NotEnoughStock);
    }
    cart.books.push(CartLine {
        book_id: book.id,
        quantity,
    });
    Ok((cart, AddOutcome::AddedLine))
}

/// Removes `quantity` units of a book from the cart.
///
/// # Errors
///
/// Returns a [`CartRejection`] if the book is not in the cart or the line
/// holds fewer units than requested.
pub fn remove_from_cart(
    cart: &mut Cart,
    book_id: BookId,
    quantity: u32,
) -> Result<RemoveOutcome, CartRejection> {
    check_quantity(quantity)?;

    let index = cart
        .books
        .iter()
        .position(|l| l.book_id == book_id)
        .ok_or(CartRejection::NotInCart)?;

    let line = &mut cart.books[index];
    if quantity > line.quantity {
        return Err(CartRejection::ExceedsLineQuantity);
    }
    if quantity < line.quantity {
        line.quantity -= quantity;
        return Ok(RemoveOutcome::Reduced);
    }

    cart.books.remove(index);
    if cart.books.is_empty() {
        Ok(RemoveOutcome::CartEmptied)
    } else {
        Ok(RemoveOutcome::LineRemoved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Money;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn book(stock: u32) -> Book {
        Book {
            id: BookId::new(),
            title: "The Rust Programming Language".to_string(),
            description: "The official book on the Rust language".to_string(),
            author: "Steve Klabnik".to_string(),
            price: Money::from_units(40),
            rating: 5.0,
            stock,
            category: "Programming".to_string(),
            published_at: NaiveDate::from_ymd_opt(2019, 8, 12).unwrap(),
            isbn: "9781718500440".to_string(),
        }
    }

    #[test]
    fn first_add_creates_cart() {
        let b = book(10);
        let user = UserId::new();
        let (cart, outcome) = add_to_cart(None, user, &b, 4).unwrap();

        assert_eq!(outcome, AddOutcome::CreatedCart);
        assert_eq!(cart.user_id, user);
        assert_eq!(cart.line(b.id).unwrap().quantity, 4);
    }

    #[test]
    fn first_add_over_stock_is_rejected() {
        let b = book(3);
        let err = add_to_cart(None, UserId::new(), &b, 4).unwrap_err();
        assert_eq!(err, CartRejection::ExceedsStockForNewCart);
        assert_eq!(err.to_string(), "The given quantity exceed the book stock");
    }

    #[test]
    fn add_increments_existing_line_up_to_stock() {
        let b = book(10);
        let user = UserId::new();
        let (cart, _) = add_to_cart(None, user, &b, 6).unwrap();
        let (cart, outcome) = add_to_cart(Some(cart), user, &b, 4).unwrap();
        assert_eq!(outcome, AddOutcome::IncrementedLine);
        assert_eq!(cart.line(b.id).unwrap().quantity, 10);

        let err = add_to_cart(Some(cart), user, &b, 1).unwrap_err();
        assert_eq!(err, CartRejection::NotEnoughStock);
    }

    #[test]
    fn add_new_line_to_existing_cart() {
        let a = book(10);
        let b = book(2);
        let user = UserId::new();
        let (cart, _) = add_to_cart(None, user, &a, 1).unwrap();

        assert_eq!(
            add_to_cart(Some(cart.clone()), user, &b, 3).unwrap_err(),
            CartRejection::NotEnoughStock
        );
        let (cart, outcome) = add_to_cart(Some(cart), user, &b, 2).unwrap();
        assert_eq!(outcome, AddOutcome::AddedLine);
        assert_eq!(cart.books.len(), 2);
    }

    #[test]
    fn zero_and_huge_quantities_are_rejected() {
        let b = book(10);
        assert_eq!(
            add_to_cart(None, UserId::new(), &b, 0).unwrap_err(),
            CartRejection::InvalidQuantity
        );
        assert_eq!(
            add_to_cart(None, UserId::new(), &b, MAX_REQUEST_QUANTITY + 1).unwrap_err(),
            CartRejection::InvalidQuantity
        );
    }

    #[test]
    fn remove_reduces_then_removes_line() {
        let a = book(10);
        let b = book(10);
        let user = UserId::new();
        let (cart, _) = add_to_cart(None, user, &a, 5).unwrap();
        let (mut cart, _) = add_to_cart(Some(cart), user, &b, 1).unwrap();

        assert_eq!(remove_from_cart(&mut cart, a.id, 2).unwrap(), RemoveOutcome::Reduced);
        assert_eq!(cart.line(a.id).unwrap().quantity, 3);
        assert_eq!(
            remove_from_cart(&mut cart, a.id, 4).unwrap_err(),
            CartRejection::ExceedsLineQuantity
        );
        assert_eq!(remove_from_cart(&mut cart, a.id, 3).unwrap(), RemoveOutcome::LineRemoved);
        assert_eq!(remove_from_cart(&mut cart, b.id, 1).unwrap(), RemoveOutcome::CartEmptied);
        assert!(cart.is_empty());
        assert_eq!(
            remove_from_cart(&mut cart, b.id, 1).unwrap_err(),
            CartRejection::NotInCart
        );
    }

    proptest! {
        #[test]
        fn line_never_exceeds_stock(stock in 0_u32..200, adds in proptest::collection::vec(1_u32..100, 1..20)) {
            let b = book(stock);
            let user = UserId::new();
            let mut cart: Option<Cart> = None;
            for qty in adds {
                if let Ok((next, _)) = add_to_cart(cart.clone(), user, &b, qty) {
                    cart = Some(next);
                }
                if let Some(c) = &cart {
                    prop_assert!(c.line(b.id).map_or(0, |l| l.quantity) <= stock);
                }
            }
        }
    }
}
