//! Pricing calculator.
//!
//! Pure functions: a line price is `quantity × unit price`, where the unit
//! price is reduced by the percentage of the discount covering the book, if
//! one is among the candidates. All arithmetic is in integer cents; a line is
//! rounded half-up once, after multiplying by the quantity.

use crate::types::{Book, BookId, CartLine, Discount, Money};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Cart totals with and without discounts applied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CartTotals {
    /// Sum of `quantity × price` over all lines
    pub before_discount: Money,
    /// Sum of discounted line prices
    pub after_discount: Money,
}

/// Two-decimal string rendering of [`CartTotals`] for API responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedTotals {
    /// Total before discount, e.g. `"300.00"`
    pub before_discount: String,
    /// Total after discount, e.g. `"240.00"`
    pub after_discount: String,
}

impl From<CartTotals> for FormattedTotals {
    fn from(totals: CartTotals) -> Self {
        Self {
            before_discount: totals.before_discount.to_string(),
            after_discount: totals.after_discount.to_string(),
        }
    }
}

/// `quantity × price × (100 - pct) / 100`, rounded half-up to the cent.
fn scaled_line(price: Money, quantity: u32, pct: u8) -> Money {
    let keep = i128::from(100_u8.saturating_sub(pct));
    let raw = i128::from(price.cents()) * i128::from(quantity) * keep;
    let cents = (raw + 50).div_euclid(100);
    Money::from_cents(i64::try_from(cents).unwrap_or(i64::MAX))
}

/// Unit price after taking `pct` percent off.
///
/// # Examples
///
/// ```
/// use bookstore_core::pricing::discounted_unit_price;
/// use bookstore_core::types::Money;
///
/// assert_eq!(discounted_unit_price(Money::from_units(100), 20), Money::from_units(80));
/// ```
#[must_use]
pub fn discounted_unit_price(price: Money, pct: u8) -> Money {
    scaled_line(price, 1, pct)
}

/// Finds the discount among `candidates` that covers `book_id`.
#[must_use]
pub fn discount_for(book_id: BookId, candidates: &[Discount]) -> Option<&Discount> {
    candidates.iter().find(|d| d.covers(book_id))
}

/// Price of one cart line.
///
/// `candidates` must already be restricted to discounts active for the buyer
/// (see [`active_discounts`]). If none of them covers the book, full price
/// applies.
#[must_use]
pub fn line_price(book: &Book, quantity: u32, candidates: &[Discount]) -> Money {
    let pct = discount_for(book.id, candidates).map_or(0, |d| d.discount_percentage);
    scaled_line(book.price, quantity, pct)
}

/// Discounts active at `now` for a buyer in `country` that cover at least one
/// of `book_ids`.
#[must_use]
pub fn active_discounts(
    discounts: &[Discount],
    now: DateTime<Utc>,
    country: &str,
    book_ids: &[BookId],
) -> Vec<Discount> {
    discounts
        .iter()
        .filter(|d| d.is_open_at(now) && d.applies_in(country))
        .filter(|d| book_ids.iter().any(|id| d.covers(*id)))
        .cloned()
        .collect()
}

/// Recomputes cart totals from scratch.
///
/// Lines whose book is missing from `books` contribute nothing.
#[must_use]
pub fn cart_totals(
    lines: &[CartLine],
    books: &HashMap<BookId, Book>,
    candidates: &[Discount],
) -> CartTotals {
    lines
        .iter()
        .filter_map(|line| books.get(&line.book_id).map(|book| (book, line.quantity)))
        .fold(CartTotals::default(), |mut totals, (book, quantity)| {
            totals.before_discount += scaled_line(book.price, quantity, 0);
            totals.after_discount += line_price(book, quantity, candidates);
            totals
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Country;
    use chrono::{Duration, NaiveDate, TimeZone};
    use proptest::prelude::*;

    fn book(price: Money) -> Book {
        Book {
            id: BookId::new(),
            title: "Rust in Action".to_string(),
            description: "A hands-on guide to systems programming".to_string(),
            author: "Tim McNamara".to_string(),
            price,
            rating: 4.0,
            stock: 50,
            category: "Programming".to_string(),
            published_at: NaiveDate::from_ymd_opt(2021, 8, 1).unwrap(),
            isbn: "9781617294556".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn discount(book_ids: Vec<BookId>, pct: u8, countries: Vec<Country>) -> Discount {
        Discount {
            id: crate::types::DiscountId::new(),
            discount_percentage: pct,
            book_ids,
            start_date: now() - Duration::days(1),
            end_date: now() + Duration::days(2),
            countries,
        }
    }

    #[test]
    fn twenty_percent_off_three_copies() {
        let b = book(Money::from_units(100));
        let d = discount(vec![b.id], 20, vec![Country::Bd]);
        let active = active_discounts(&[d], now(), "BD", &[b.id]);

        assert_eq!(line_price(&b, 3, &active), Money::from_units(240));
        assert_eq!(line_price(&b, 3, &[]), Money::from_units(300));
    }

    #[test]
    fn discount_for_other_country_is_ignored() {
        let b = book(Money::from_units(100));
        let d = discount(vec![b.id], 20, vec![Country::Us]);
        let active = active_discounts(&[d], now(), "BD", &[b.id]);

        assert!(active.is_empty());
        assert_eq!(line_price(&b, 1, &active), Money::from_units(100));
    }

    #[test]
    fn expired_or_future_discounts_are_ignored() {
        let b = book(Money::from_units(100));
        let mut expired = discount(vec![b.id], 10, vec![Country::Bd]);
        expired.start_date = now() - Duration::days(5);
        expired.end_date = now() - Duration::days(1);
        let mut future = discount(vec![b.id], 10, vec![Country::Bd]);
        future.start_date = now() + Duration::hours(1);
        future.end_date = now() + Duration::days(1);

        assert!(active_discounts(&[expired, future], now(), "BD", &[b.id]).is_empty());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let b = book(Money::from_units(10));
        let mut d = discount(vec![b.id], 10, vec![Country::Bd]);
        d.start_date = now();
        d.end_date = now();
        assert_eq!(active_discounts(&[d], now(), "BD", &[b.id]).len(), 1);
    }

    #[test]
    fn discount_not_covering_cart_books_is_skipped() {
        let b = book(Money::from_units(10));
        let d = discount(vec![BookId::new()], 10, vec![Country::Bd]);
        assert!(active_discounts(&[d], now(), "BD", &[b.id]).is_empty());
    }

    #[test]
    fn cart_totals_skip_missing_books() {
        let a = book(Money::from_cents(1999));
        let b = book(Money::from_units(50));
        let d = discount(vec![b.id], 40, vec![Country::Ind]);
        let books: HashMap<_, _> = [(a.id, a.clone()), (b.id, b.clone())].into_iter().collect();
        let lines = vec![
            CartLine { book_id: a.id, quantity: 2 },
            CartLine { book_id: b.id, quantity: 1 },
            CartLine { book_id: BookId::new(), quantity: 7 },
        ];

        let totals = cart_totals(&lines, &books, &[d]);
        assert_eq!(totals.before_discount, Money::from_cents(3998 + 5000));
        assert_eq!(totals.after_discount, Money::from_cents(3998 + 3000));

        let formatted = FormattedTotals::from(totals);
        assert_eq!(formatted.before_discount, "89.98");
        assert_eq!(formatted.after_discount, "69.98");
    }

    #[test]
    fn fractional_cents_round_half_up_per_line() {
        // 0.05 * 3 = 0.15, minus 5% = 0.1425 → 0.14
        let b = book(Money::from_cents(5));
        let d = discount(vec![b.id], 5, vec![Country::Bd]);
        assert_eq!(line_price(&b, 3, &[d]), Money::from_cents(14));
    }

    proptest! {
        #[test]
        fn discounted_price_matches_formula(
            price in 0_i64..1_000_000,
            qty in 1_u32..10_000,
            pct in 5_u8..=40,
        ) {
            let b = book(Money::from_cents(price));
            let d = discount(vec![b.id], pct, vec![Country::Bd]);
            let expected = (i128::from(price) * i128::from(qty) * i128::from(100 - pct) + 50) / 100;

            prop_assert_eq!(i128::from(line_price(&b, qty, &[d]).cents()), expected);
            prop_assert_eq!(line_price(&b, qty, &[]).cents(), price * i64::from(qty));
        }

        #[test]
        fn discount_never_raises_price(price in 0_i64..1_000_000, qty in 1_u32..1000, pct in 0_u8..=100) {
            let b = book(Money::from_cents(price));
            let d = discount(vec![b.id], pct, vec![Country::Us]);
            prop_assert!(line_price(&b, qty, &[d]) <= line_price(&b, qty, &[]));
        }
    }
}
