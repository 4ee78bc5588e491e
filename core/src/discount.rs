//! Discount admin rules.
//!
//! A discount takes a whole percentage (5..=40) off a set of books, for
//! buyers in a set of countries, during a window of at most five whole days
//! starting no earlier than yesterday. A book belongs to at most one
//! discount.

use crate::types::{BookId, Country, Discount, DiscountId};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

/// Smallest accepted percentage.
pub const MIN_PERCENTAGE: u8 = 5;

/// Largest accepted percentage.
pub const MAX_PERCENTAGE: u8 = 40;

/// Window length (in whole days, floored) at which a discount is rejected.
pub const MAX_WINDOW_DAYS: i64 = 5;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Why a discount create or update was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscountRejection {
    /// The same book id appears twice in the request
    DuplicateBookIds,
    /// At least one book id does not exist
    UnknownBooks,
    /// A country outside [`Country::ALL`] was requested
    UnsupportedCountry,
    /// At least one book already belongs to another discount
    BookAlreadyDiscounted,
    /// `end_date < start_date`
    EndBeforeStart,
    /// The start lies more than a day in the past
    StartInPast,
    /// The window spans [`MAX_WINDOW_DAYS`] or more
    WindowTooLong,
    /// Percentage outside `MIN_PERCENTAGE..=MAX_PERCENTAGE`
    PercentageOutOfRange,
    /// An update carried no fields
    EmptyUpdate,
}

impl fmt::Display for DiscountRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DuplicateBookIds => "Can not accept duplicate book id",
            Self::UnknownBooks => "Some of the book maybe not available",
            Self::UnsupportedCountry => "Some country maybe not available",
            Self::BookAlreadyDiscounted => "Can not add multiple discount for a book",
            Self::EndBeforeStart => "End date cannot be less than start date.",
            Self::StartInPast => "Start date cannot be less than today.",
            Self::WindowTooLong => "EndDate can not exceed 5 days from startDate",
            Self::PercentageOutOfRange => "Discount Percentage must be between 5 and 40",
            Self::EmptyUpdate => "Can not accept empty data",
        })
    }
}

impl std::error::Error for DiscountRejection {}

/// Fields of a partial discount update. `None` leaves the field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscountPatch {
    /// New percentage
    pub discount_percentage: Option<u8>,
    /// Replacement book list
    pub book_ids: Option<Vec<BookId>>,
    /// New window start
    pub start_date: Option<DateTime<Utc>>,
    /// New window end
    pub end_date: Option<DateTime<Utc>>,
    /// Countries to add
    pub countries: Option<Vec<Country>>,
}

impl DiscountPatch {
    /// Returns `true` when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.discount_percentage.is_none()
            && self.book_ids.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.countries.is_none()
    }
}

/// Floor of `(later - earlier)` in whole days, like integer division of
/// milliseconds rounded toward negative infinity.
fn floor_days(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    (later - earlier).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Rejects book lists that name the same book twice.
///
/// # Errors
///
/// Returns [`DiscountRejection::DuplicateBookIds`] on a repeat.
pub fn check_unique_books(book_ids: &[BookId]) -> Result<(), DiscountRejection> {
    let mut seen = HashSet::with_capacity(book_ids.len());
    if book_ids.iter().all(|id| seen.insert(*id)) {
        Ok(())
    } else {
        Err(DiscountRejection::DuplicateBookIds)
    }
}

/// Parses requested country codes (case-insensitive) against the allow-list.
///
/// # Errors
///
/// Returns [`DiscountRejection::UnsupportedCountry`] for any unknown code.
pub fn parse_countries<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Country>, DiscountRejection> {
    raw.iter()
        .map(|c| {
            c.as_ref()
                .parse::<Country>()
                .map_err(|_| DiscountRejection::UnsupportedCountry)
        })
        .collect()
}

/// Checks the percentage bounds.
///
/// # Errors
///
/// Returns [`DiscountRejection::PercentageOutOfRange`] outside 5..=40.
pub const fn check_percentage(pct: u8) -> Result<(), DiscountRejection> {
    if pct < MIN_PERCENTAGE || pct > MAX_PERCENTAGE {
        return Err(DiscountRejection::PercentageOutOfRange);
    }
    Ok(())
}

/// Validates a discount window relative to `now`.
///
/// # Errors
///
/// - [`DiscountRejection::EndBeforeStart`] if `end < start`
/// - [`DiscountRejection::StartInPast`] if the start is more than one whole day before `now`
/// - [`DiscountRejection::WindowTooLong`] if the window spans five whole days or more
pub fn check_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), DiscountRejection> {
    if end < start {
        return Err(DiscountRejection::EndBeforeStart);
    }
    if floor_days(start, now) < -1 {
        return Err(DiscountRejection::StartInPast);
    }
    if floor_days(end, start) >= MAX_WINDOW_DAYS {
        return Err(DiscountRejection::WindowTooLong);
    }
    Ok(())
}

/// Rejects `book_ids` if any of them already belongs to a discount in
/// `existing`, other than `exempt` (the record being updated).
///
/// # Errors
///
/// Returns [`DiscountRejection::BookAlreadyDiscounted`] on overlap.
pub fn check_no_overlap(
    book_ids: &[BookId],
    existing: &[Discount],
    exempt: Option<DiscountId>,
) -> Result<(), DiscountRejection> {
    let overlaps = existing
        .iter()
        .filter(|d| Some(d.id) != exempt)
        .any(|d| book_ids.iter().any(|id| d.covers(*id)));
    if overlaps {
        Err(DiscountRejection::BookAlreadyDiscounted)
    } else {
        Ok(())
    }
}

/// Applies a patch: books are replaced, countries are unioned, and the
/// remaining fields are overwritten only when present.
pub fn apply_patch(discount: &mut Discount, patch: DiscountPatch) {
    if let Some(pct) = patch.discount_percentage {
        discount.discount_percentage = pct;
    }
    if let Some(book_ids) = patch.book_ids {
        discount.book_ids = book_ids;
    }
    if let Some(start) = patch.start_date {
        discount.start_date = start;
    }
    if let Some(end) = patch.end_date {
        discount.end_date = end;
    }
    if let Some(countries) = patch.countries {
        for country in countries {
            if !discount.countries.contains(&country) {
                discount.countries.push(country);
            }
        }
    }
}
