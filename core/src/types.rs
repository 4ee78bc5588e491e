//! Core domain types for the bookstore.
//!
//! Identifiers are UUID newtypes, money is integer cents, and every record
//! type mirrors one persisted table group (user, credential, book, reviews,
//! cart, discount, transaction).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a user (shared with the user's credential)
    UserId
);
uuid_id!(
    /// Unique identifier for a catalog book
    BookId
);
uuid_id!(
    /// Unique identifier for a cart
    CartId
);
uuid_id!(
    /// Unique identifier for a discount record
    DiscountId
);
uuid_id!(
    /// Unique identifier for a checkout transaction
    TransactionId
);

/// Money amount in cents (to avoid floating point issues).
///
/// Serialized over the API as a decimal number (`12.5`), stored as cents.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Zero money
    pub const ZERO: Self = Self(0);

    /// Creates a new money amount from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a new money amount from whole units (converted to cents)
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// Converts a decimal amount to cents, rounding to the nearest cent.
    ///
    /// Returns `None` for non-finite or out-of-range values.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_decimal(amount: f64) -> Option<Self> {
        let cents = (amount * 100.0).round();
        if cents.is_finite() && cents.abs() < 9.0e15 {
            Some(Self(cents as i64))
        } else {
            None
        }
    }

    /// Returns the value in cents
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal (for display and JSON)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns `true` when the amount is zero or negative
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 <= 0
    }

    /// Adds two amounts, returning `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Subtracts two amounts, returning `None` on overflow
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl std::ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Self::from_decimal(amount)
            .ok_or_else(|| serde::de::Error::custom("amount is not a valid number"))
    }
}

/// Role flag carried by every credential.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum Rank {
    /// Administrator (rank 1)
    Admin,
    /// Regular customer (rank 2)
    User,
}

impl Rank {
    /// Numeric value stored with the credential
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Admin => 1,
            Self::User => 2,
        }
    }
}

impl From<Rank> for i16 {
    fn from(rank: Rank) -> Self {
        rank.as_i16()
    }
}

impl TryFrom<i16> for Rank {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Admin),
            2 => Ok(Self::User),
            other => Err(format!("Invalid rank: {other}")),
        }
    }
}

/// Countries a discount can target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Country {
    /// Bangladesh
    Bd,
    /// United States
    Us,
    /// India
    Ind,
}

impl Country {
    /// Every supported country, in display order
    pub const ALL: [Self; 3] = [Self::Bd, Self::Us, Self::Ind];

    /// Country code as stored and compared against user addresses
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Bd => "BD",
            Self::Us => "US",
            Self::Ind => "IND",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Country {
    type Err = String;

    /// Parses a country code case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| format!("Unsupported country: {s}"))
    }
}

impl From<Country> for String {
    fn from(country: Country) -> Self {
        country.code().to_string()
    }
}

impl TryFrom<String> for Country {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How a checkout was paid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Online payment
    Online,
    /// Cash on delivery
    Cash,
    /// Card payment
    Card,
}

impl PaymentMethod {
    /// Lowercase name as stored
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Cash => "cash",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            other => Err(format!("Unknown payment method: {other}")),
        }
    }
}

/// Postal address of a user. The country is stored uppercased.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Address {
    /// Country code (uppercased)
    pub country: String,
    /// City
    pub city: String,
    /// Area or district
    pub area: String,
    /// Street
    pub street: String,
}

/// Identity and profile of a customer or administrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email (unique, lowercase)
    pub email: String,
    /// Phone number
    pub phone_number: String,
    /// Postal address
    pub address: Address,
    /// Spendable balance
    pub balance: Money,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last profile change
    pub updated_at: DateTime<Utc>,
}

/// Credential record linked 1:1 to a [`User`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    /// Owning user
    pub user_id: UserId,
    /// Login email
    pub email: String,
    /// Password hash (PHC string)
    pub password_hash: String,
    /// Whether the email has been verified
    pub is_verified: bool,
    /// Outstanding verification code, cleared on verification
    pub verification_code: Option<String>,
    /// Role
    pub rank: Rank,
    /// Restricted accounts cannot log in
    pub is_restricted: bool,
}

/// A catalog item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Book identifier
    pub id: BookId,
    /// Title (unique)
    pub title: String,
    /// Description (unique)
    pub description: String,
    /// Author name
    pub author: String,
    /// Unit price
    pub price: Money,
    /// Average review rating (0..=5)
    pub rating: f64,
    /// Units in stock
    pub stock: u32,
    /// Category
    pub category: String,
    /// Publication date
    pub published_at: NaiveDate,
    /// ISBN (unique)
    pub isbn: String,
}

/// One review entry inside a book's review bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    /// Reviewer
    pub user_id: UserId,
    /// Optional free-text message
    pub message: Option<String>,
    /// Rating given (1..=5)
    pub rating: f64,
}

/// All reviews of one book. A book with no entries has no bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookReviews {
    /// Reviewed book
    pub book_id: BookId,
    /// Entries, at most one per user
    pub reviews: Vec<ReviewEntry>,
}

/// One (book, quantity) entry within a cart or transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Book in the line
    pub book_id: BookId,
    /// Units of the book
    pub quantity: u32,
}

/// A user's shopping cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Cart identifier
    pub id: CartId,
    /// Owner (one cart per user)
    pub user_id: UserId,
    /// Lines, at most one per book
    pub books: Vec<CartLine>,
    /// Optimistic concurrency version; 0 for a cart never saved
    #[serde(skip)]
    pub version: i64,
}

impl Cart {
    /// Creates an empty, unsaved cart for a user
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            books: Vec::new(),
            version: 0,
        }
    }

    /// Returns `true` when the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Finds the line for a book
    #[must_use]
    pub fn line(&self, book_id: BookId) -> Option<&CartLine> {
        self.books.iter().find(|l| l.book_id == book_id)
    }

    /// Book ids of every line, in line order
    #[must_use]
    pub fn book_ids(&self) -> Vec<BookId> {
        self.books.iter().map(|l| l.book_id).collect()
    }
}

/// A time-windowed, per-country percentage discount on a set of books.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    /// Discount identifier
    pub id: DiscountId,
    /// Whole percentage off (5..=40)
    pub discount_percentage: u8,
    /// Books the discount applies to
    pub book_ids: Vec<BookId>,
    /// Window start (inclusive)
    pub start_date: DateTime<Utc>,
    /// Window end (inclusive)
    pub end_date: DateTime<Utc>,
    /// Countries the discount applies in
    pub countries: Vec<Country>,
}

impl Discount {
    /// Whether `now` falls inside `[start_date, end_date]`
    #[must_use]
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Whether the discount applies to buyers from `country`
    #[must_use]
    pub fn applies_in(&self, country: &str) -> bool {
        self.countries.iter().any(|c| c.code() == country)
    }

    /// Whether the discount covers `book_id`
    #[must_use]
    pub fn covers(&self, book_id: BookId) -> bool {
        self.book_ids.contains(&book_id)
    }
}

/// Immutable snapshot of a completed checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction identifier
    pub id: TransactionId,
    /// Buyer
    pub user_id: UserId,
    /// Purchased lines
    pub books: Vec<CartLine>,
    /// Total charged
    pub total_price: Money,
    /// Payment method
    pub payment_method: PaymentMethod,
    /// Checkout time
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn money_display_uses_two_decimals() {
        assert_eq!(Money::from_cents(24000).to_string(), "240.00");
        assert_eq!(Money::from_cents(1205).to_string(), "12.05");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
    }

    #[test]
    fn money_json_is_a_decimal_number() {
        let json = serde_json::to_string(&Money::from_cents(1250)).unwrap();
        assert_eq!(json, "12.5");

        let parsed: Money = serde_json::from_str("19.99").unwrap();
        assert_eq!(parsed.cents(), 1999);
    }

    #[test]
    fn rank_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Rank::Admin).unwrap(), "1");
        let rank: Rank = serde_json::from_str("2").unwrap();
        assert_eq!(rank, Rank::User);
        assert!(serde_json::from_str::<Rank>("3").is_err());
    }

    #[test]
    fn country_parsing_is_case_insensitive() {
        assert_eq!("bd".parse::<Country>().unwrap(), Country::Bd);
        assert_eq!("Ind".parse::<Country>().unwrap(), Country::Ind);
        assert!("UK".parse::<Country>().is_err());
    }

    #[test]
    fn payment_method_rejects_unknown_values() {
        assert!(serde_json::from_str::<PaymentMethod>("\"cash\"").is_ok());
        assert!(serde_json::from_str::<PaymentMethod>("\"crypto\"").is_err());
    }

    #[test]
    fn ids_round_trip_through_strings() {
        let id = BookId::new();
        let parsed: BookId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<BookId>().is_err());
    }
}
