//! Builders for test records.
//!
//! Every builder starts from a valid record so tests only spell out the
//! fields they care about.

use bookstore_core::types::{
    Address, Book, BookId, Country, Credential, Discount, DiscountId, Money, Rank, User, UserId,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_sequence() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// A distinct ISBN-13 with a valid check digit for every call.
#[must_use]
pub fn unique_isbn() -> String {
    let body = format!("978{:09}", next_sequence() % 1_000_000_000);
    let sum: u32 = body
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    format!("{body}{}", (10 - sum % 10) % 10)
}

/// Builder for [`Book`].
#[derive(Clone, Debug)]
pub struct BookBuilder {
    book: Book,
}

impl BookBuilder {
    /// A book with the given title, price 100, stock 50 and a unique
    /// description and ISBN.
    #[must_use]
    pub fn new(title: &str) -> Self {
        let n = next_sequence();
        Self {
            book: Book {
                id: BookId::new(),
                title: title.to_string(),
                description: format!("A thorough guide, volume {n}"),
                author: "Jim Blandy".to_string(),
                price: Money::from_units(100),
                rating: 1.0,
                stock: 50,
                category: "Programming".to_string(),
                published_at: NaiveDate::from_ymd_opt(2021, 6, 1).unwrap_or_default(),
                isbn: unique_isbn(),
            },
        }
    }

    /// Sets the unit price in whole units
    #[must_use]
    pub const fn price(mut self, units: i64) -> Self {
        self.book.price = Money::from_units(units);
        self
    }

    /// Sets the stock
    #[must_use]
    pub const fn stock(mut self, stock: u32) -> Self {
        self.book.stock = stock;
        self
    }

    /// Sets the rating
    #[must_use]
    pub const fn rating(mut self, rating: f64) -> Self {
        self.book.rating = rating;
        self
    }

    /// Sets the category
    #[must_use]
    pub fn category(mut self, category: &str) -> Self {
        self.book.category = category.to_string();
        self
    }

    /// Sets the description
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.book.description = description.to_string();
        self
    }

    /// Finishes the book
    #[must_use]
    pub fn build(self) -> Book {
        self.book
    }
}

/// Builder for a [`User`] and its [`Credential`].
#[derive(Clone, Debug)]
pub struct UserBuilder {
    user: User,
    credential: Credential,
}

impl UserBuilder {
    /// A verified, unrestricted customer in `BD` with zero balance.
    ///
    /// The credential hash is the literal `password_hash`; swap it with
    /// [`UserBuilder::password_hash`] when the test logs in.
    #[must_use]
    pub fn new(email: &str, now: DateTime<Utc>) -> Self {
        let id = UserId::new();
        Self {
            user: User {
                id,
                name: "Rahim Uddin".to_string(),
                email: email.to_string(),
                phone_number: "01712345678".to_string(),
                address: Address {
                    country: Country::Bd.code().to_string(),
                    city: "Dhaka".to_string(),
                    area: "Gulshan".to_string(),
                    street: "Road 11".to_string(),
                },
                balance: Money::ZERO,
                created_at: now,
                updated_at: now,
            },
            credential: Credential {
                user_id: id,
                email: email.to_string(),
                password_hash: "password_hash".to_string(),
                is_verified: true,
                verification_code: None,
                rank: Rank::User,
                is_restricted: false,
            },
        }
    }

    /// Sets the balance in whole units
    #[must_use]
    pub const fn balance(mut self, units: i64) -> Self {
        self.user.balance = Money::from_units(units);
        self
    }

    /// Sets the address country code
    #[must_use]
    pub fn country(mut self, country: &str) -> Self {
        self.user.address.country = country.to_string();
        self
    }

    /// Makes the user an administrator
    #[must_use]
    pub const fn admin(mut self) -> Self {
        self.credential.rank = Rank::Admin;
        self
    }

    /// Marks the account restricted
    #[must_use]
    pub const fn restricted(mut self) -> Self {
        self.credential.is_restricted = true;
        self
    }

    /// Leaves the account unverified with the given code
    #[must_use]
    pub fn unverified(mut self, code: &str) -> Self {
        self.credential.is_verified = false;
        self.credential.verification_code = Some(code.to_string());
        self
    }

    /// Sets the stored password hash
    #[must_use]
    pub fn password_hash(mut self, hash: &str) -> Self {
        self.credential.password_hash = hash.to_string();
        self
    }

    /// Finishes the pair
    #[must_use]
    pub fn build(self) -> (User, Credential) {
        (self.user, self.credential)
    }
}

/// A discount on `book_ids` open from one hour before `now` to two days
/// after, for the given countries.
#[must_use]
pub fn open_discount(
    percentage: u8,
    book_ids: Vec<BookId>,
    countries: Vec<Country>,
    now: DateTime<Utc>,
) -> Discount {
    Discount {
        id: DiscountId::new(),
        discount_percentage: percentage,
        book_ids,
        start_date: now - Duration::hours(1),
        end_date: now + Duration::days(2),
        countries,
    }
}
