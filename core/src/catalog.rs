//! Catalog query and book record validation.
//!
//! [`BookQuery::from_params`] turns raw query-string pairs into a typed
//! query, rejecting unknown keys and incomplete sort/filter combinations.
//! [`BookQuery::matches`] and [`BookQuery::sort`] give the reference
//! semantics that stores must reproduce.

use crate::types::{Book, Money};
use crate::validation::{self, ValidationErrors};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 30;

/// Largest accepted `filterValue`.
pub const MAX_FILTER_VALUE: f64 = 1_000_000.0;

const ALLOWED_PARAMS: [&str; 9] = [
    "offset",
    "limit",
    "search",
    "sortBy",
    "sortOrder",
    "filter",
    "filterOrder",
    "filterValue",
    "category",
];

const INVALID: &str = "Invalid value provided";

/// Sortable book fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortField {
    /// Unit price
    Price,
    /// Units in stock
    Stock,
    /// Average rating
    Rating,
}

/// Sort direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

/// Filterable book fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterField {
    /// Units in stock
    Stock,
    /// Unit price
    Price,
    /// Percentage of the discount currently covering the book
    DiscountPercentage,
    /// Average rating
    Rating,
}

/// Filter comparison.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterOrder {
    /// `field >= value`
    High,
    /// `field <= value`
    Low,
}

/// Why a catalog query string was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryRejection {
    /// A key outside the allowed set was supplied
    UnknownProperty,
    /// Some values failed validation
    Invalid(ValidationErrors),
}

/// A validated catalog query.
#[derive(Clone, Debug, PartialEq)]
pub struct BookQuery {
    /// 1-based page
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    /// Sort field and direction
    pub sort: Option<(SortField, SortOrder)>,
    /// Filter field, comparison and bound
    pub filter: Option<(FilterField, FilterOrder, f64)>,
    /// Accepted categories (any of)
    pub categories: Vec<String>,
}

impl Default for BookQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            search: None,
            sort: None,
            filter: None,
            categories: Vec::new(),
        }
    }
}

fn blank(value: Option<&String>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn parse_count(errors: &mut ValidationErrors, field: &str, value: Option<&String>) -> Option<u32> {
    let value = value?;
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            errors.add(field, INVALID);
            None
        }
    }
}

impl BookQuery {
    /// Builds a query from raw query-string pairs.
    ///
    /// # Errors
    ///
    /// - [`QueryRejection::UnknownProperty`] for any key outside the allowed set
    /// - [`QueryRejection::Invalid`] with a field map for bad or incomplete values
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, QueryRejection> {
        if params.keys().any(|k| !ALLOWED_PARAMS.contains(&k.as_str())) {
            return Err(QueryRejection::UnknownProperty);
        }
        let get = |key: &str| params.get(key);
        let mut errors = ValidationErrors::new();

        let page = parse_count(&mut errors, "offset", get("offset"));
        let limit = parse_count(&mut errors, "limit", get("limit"));

        let search = get("search").cloned();
        if search.is_some() && blank(search.as_ref()) {
            errors.add("search", INVALID);
        }

        let sort_field = get("sortBy").map(|v| match v.as_str() {
            "price" => Some(SortField::Price),
            "stock" => Some(SortField::Stock),
            "rating" => Some(SortField::Rating),
            _ => None,
        });
        let sort_order = get("sortOrder").map(|v| match v.as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        });
        if sort_field == Some(None) {
            errors.add("sortBy", INVALID);
        }
        if sort_order == Some(None) {
            errors.add("sortOrder", INVALID);
        }
        if sort_field.is_some() && sort_order.is_none() {
            errors.add("sortOrder", "Sort order is required when sortBy is selected");
        }
        if sort_order.is_some() && blank(get("sortBy")) {
            errors.add("sortBy", "Sort by is required when sort order is selected");
        }

        let filter_field = get("filter").map(|v| match v.as_str() {
            "stock" => Some(FilterField::Stock),
            "price" => Some(FilterField::Price),
            "discountPercentage" => Some(FilterField::DiscountPercentage),
            "rating" => Some(FilterField::Rating),
            _ => None,
        });
        let filter_order = get("filterOrder").map(|v| match v.as_str() {
            "high" => Some(FilterOrder::High),
            "low" => Some(FilterOrder::Low),
            _ => None,
        });
        let filter_value = get("filterValue").map(|v| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite() && (0.0..=MAX_FILTER_VALUE).contains(n))
        });
        if filter_field == Some(None) {
            errors.add("filter", INVALID);
        }
        if filter_order == Some(None) {
            errors.add("filterOrder", INVALID);
        }
        if filter_value == Some(None) {
            errors.add("filterValue", INVALID);
        }
        let any_filter = filter_field.is_some() || filter_order.is_some() || filter_value.is_some();
        if any_filter {
            errors.check(filter_field.is_none(), "filter", "filter is required");
            errors.check(filter_order.is_none(), "filterOrder", "filter order is required");
            errors.check(filter_value.is_none(), "filterValue", "filter value is required");
        }

        let categories: Vec<String> = get("category")
            .map(|c| {
                c.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if get("category").is_some() && categories.is_empty() {
            errors.add("category", INVALID);
        }

        errors.into_result().map_err(QueryRejection::Invalid)?;

        Ok(Self {
            page: page.unwrap_or(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT),
            search,
            sort: sort_field.flatten().zip(sort_order.flatten()),
            filter: match (filter_field.flatten(), filter_order.flatten(), filter_value.flatten()) {
                (Some(f), Some(o), Some(v)) => Some((f, o, v)),
                _ => None,
            },
            categories,
        })
    }

    /// Number of records to skip for the requested page.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        (self.page as u64).saturating_sub(1) * self.limit as u64
    }

    /// Whether `book` passes the search, category and filter criteria.
    ///
    /// `discount_pct` is the percentage of the discount currently covering
    /// the book, used by the `discountPercentage` filter.
    #[must_use]
    pub fn matches(&self, book: &Book, discount_pct: Option<u8>) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !book.title.to_lowercase().contains(&needle)
                && !book.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if !self.categories.is_empty() && !self.categories.contains(&book.category) {
            return false;
        }
        if let Some((field, order, bound)) = self.filter {
            let value = match field {
                FilterField::Stock => f64::from(book.stock),
                FilterField::Price => book.price.as_decimal(),
                FilterField::Rating => book.rating,
                FilterField::DiscountPercentage => match discount_pct {
                    Some(pct) => f64::from(pct),
                    None => return false,
                },
            };
            let keep = match order {
                FilterOrder::High => value >= bound,
                FilterOrder::Low => value <= bound,
            };
            if !keep {
                return false;
            }
        }
        true
    }

    /// Sorts `books` by the requested field, if any.
    pub fn sort(&self, books: &mut [Book]) {
        let Some((field, order)) = self.sort else {
            return;
        };
        books.sort_by(|a, b| {
            let ordering = match field {
                SortField::Price => a.price.cmp(&b.price),
                SortField::Stock => a.stock.cmp(&b.stock),
                SortField::Rating => a.rating.partial_cmp(&b.rating).unwrap_or(Ordering::Equal),
            };
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
}

/// One page of catalog results.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    /// Page number served
    pub current_page: u32,
    /// Number of pages for the whole result
    pub total_pages: u64,
    /// Number of matching books
    pub total_data: u64,
    /// Books on this page
    pub products: Vec<Book>,
}

impl BookPage {
    /// Assembles a page from the query, the total match count and the rows.
    #[must_use]
    pub fn new(query: &BookQuery, total: u64, products: Vec<Book>) -> Self {
        Self {
            current_page: query.page,
            total_pages: total.div_ceil(u64::from(query.limit)),
            total_data: total,
            products,
        }
    }
}

/// Body of a book create request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBook {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Author
    pub author: String,
    /// Unit price
    pub price: Money,
    /// Initial rating
    pub rating: f64,
    /// Initial stock
    pub stock: u32,
    /// Category
    pub category: String,
    /// Publication date (`YYYY-MM-DD`)
    pub published_at: NaiveDate,
    /// ISBN
    pub isbn: String,
}

/// Body of a book update request. Absent fields stay unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New author
    pub author: Option<String>,
    /// New price
    pub price: Option<Money>,
    /// New rating
    pub rating: Option<f64>,
    /// New stock
    pub stock: Option<u32>,
    /// New category
    pub category: Option<String>,
    /// New publication date
    pub published_at: Option<NaiveDate>,
    /// New ISBN
    pub isbn: Option<String>,
}

fn check_price(errors: &mut ValidationErrors, price: Money, min_units: i64) {
    errors.check(
        price < Money::from_units(min_units) || price > Money::from_units(10_000),
        "price",
        &format!("Price must be a valid number between {min_units} and 10000."),
    );
}

fn check_rating(errors: &mut ValidationErrors, rating: f64) {
    errors.check(
        !(1.0..=5.0).contains(&rating),
        "rating",
        "Rating must be a valid number between 1 and 5.",
    );
}

fn check_stock(errors: &mut ValidationErrors, stock: u32) {
    errors.check(
        !(10..=500).contains(&stock),
        "stock",
        "Stock must be a valid number between 10 and 500.",
    );
}

fn check_author(errors: &mut ValidationErrors, author: &str) {
    if author.trim().is_empty() {
        errors.add("author", "Author is required.");
    } else if author.chars().count() > 40 {
        errors.add("author", "Author name is too long");
    } else if validation::has_special_characters(author) {
        errors.add("author", INVALID);
    }
}

fn check_isbn(errors: &mut ValidationErrors, isbn: &str) {
    if isbn.trim().is_empty() {
        errors.add("isbn", "ISBN number cannot be empty");
    } else if isbn.chars().count() > 40 {
        errors.add("isbn", "ISBN number is too long");
    } else if !validation::is_valid_isbn(isbn) {
        errors.add("isbn", "Invalid ISBN number");
    }
}

impl NewBook {
    /// Field-level validation.
    ///
    /// # Errors
    ///
    /// Returns the field→message map of every failed field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::check_text(&mut errors, "title", &self.title, (3, 50), "Title");
        validation::check_text(
            &mut errors,
            "description",
            &self.description,
            (15, 200),
            "Description",
        );
        check_price(&mut errors, self.price, 0);
        check_rating(&mut errors, self.rating);
        check_stock(&mut errors, self.stock);
        check_author(&mut errors, &self.author);
        validation::check_text(&mut errors, "category", &self.category, (3, 50), "Category");
        check_isbn(&mut errors, &self.isbn);
        errors.into_result()
    }

    /// Builds the catalog record.
    #[must_use]
    pub fn into_book(self) -> Book {
        Book {
            id: crate::types::BookId::new(),
            title: self.title,
            description: self.description,
            author: self.author,
            price: self.price,
            rating: self.rating,
            stock: self.stock,
            category: self.category,
            published_at: self.published_at,
            isbn: self.isbn,
        }
    }
}

impl BookPatch {
    /// Returns `true` when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.author.is_none()
            && self.price.is_none()
            && self.rating.is_none()
            && self.stock.is_none()
            && self.category.is_none()
            && self.published_at.is_none()
            && self.isbn.is_none()
    }

    /// Field-level validation of the fields present.
    ///
    /// # Errors
    ///
    /// Returns the field→message map of every failed field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            validation::check_text(&mut errors, "title", title, (3, 50), "Title");
        }
        if let Some(description) = &self.description {
            validation::check_text(&mut errors, "description", description, (15, 200), "Description");
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price, 10);
        }
        if let Some(rating) = self.rating {
            check_rating(&mut errors, rating);
        }
        if let Some(stock) = self.stock {
            check_stock(&mut errors, stock);
        }
        if let Some(author) = &self.author {
            check_author(&mut errors, author);
        }
        if let Some(category) = &self.category {
            validation::check_text(&mut errors, "category", category, (3, 50), "Category");
        }
        if let Some(isbn) = &self.isbn {
            check_isbn(&mut errors, isbn);
        }
        errors.into_result()
    }

    /// Applies the present fields to `book`.
    pub fn apply(self, book: &mut Book) {
        if let Some(v) = self.title {
            book.title = v;
        }
        if let Some(v) = self.description {
            book.description = v;
        }
        if let Some(v) = self.author {
            book.author = v;
        }
        if let Some(v) = self.price {
            book.price = v;
        }
        if let Some(v) = self.rating {
            book.rating = v;
        }
        if let Some(v) = self.stock {
            book.stock = v;
        }
        if let Some(v) = self.category {
            book.category = v;
        }
        if let Some(v) = self.published_at {
            book.published_at = v;
        }
        if let Some(v) = self.isbn {
            book.isbn = v;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::BookId;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn book(title: &str, price: i64, stock: u32, rating: f64, category: &str) -> Book {
        Book {
            id: BookId::new(),
            title: title.to_string(),
            description: format!("{title} explained in depth"),
            author: "Someone".to_string(),
            price: Money::from_units(price),
            rating,
            stock,
            category: category.to_string(),
            published_at: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            isbn: "9781617294556".to_string(),
        }
    }

    #[test]
    fn defaults_to_first_page_of_thirty() {
        let q = BookQuery::from_params(&HashMap::new()).unwrap();
        assert_eq!(q, BookQuery::default());
        assert_eq!(q.skip(), 0);
    }

    #[test]
    fn unknown_params_are_rejected() {
        assert_eq!(
            BookQuery::from_params(&params(&[("color", "red")])).unwrap_err(),
            QueryRejection::UnknownProperty
        );
    }

    #[test]
    fn sort_requires_order_and_filter_requires_all_parts() {
        let QueryRejection::Invalid(errors) =
            BookQuery::from_params(&params(&[("sortBy", "price"), ("filter", "stock")])).unwrap_err()
        else {
            unreachable!()
        };
        assert_eq!(
            errors.get("sortOrder"),
            Some("Sort order is required when sortBy is selected")
        );
        assert_eq!(errors.get("filterOrder"), Some("filter order is required"));
        assert_eq!(errors.get("filterValue"), Some("filter value is required"));
    }

    #[test]
    fn bad_values_are_reported() {
        let QueryRejection::Invalid(errors) = BookQuery::from_params(&params(&[
            ("offset", "-1"),
            ("sortBy", "title"),
            ("sortOrder", "up"),
            ("filter", "rating"),
            ("filterOrder", "high"),
            ("filterValue", "2000000"),
        ]))
        .unwrap_err() else {
            unreachable!()
        };
        assert_eq!(errors.get("offset"), Some(INVALID));
        assert_eq!(errors.get("sortBy"), Some(INVALID));
        assert_eq!(errors.get("sortOrder"), Some(INVALID));
        assert_eq!(errors.get("filterValue"), Some(INVALID));
    }

    #[test]
    fn full_query_parses() {
        let q = BookQuery::from_params(&params(&[
            ("offset", "2"),
            ("limit", "5"),
            ("search", "rust"),
            ("sortBy", "price"),
            ("sortOrder", "desc"),
            ("filter", "stock"),
            ("filterOrder", "low"),
            ("filterValue", "100"),
            ("category", "Programming, Fiction"),
        ]))
        .unwrap();
        assert_eq!(q.skip(), 5);
        assert_eq!(q.sort, Some((SortField::Price, SortOrder::Desc)));
        assert_eq!(q.filter, Some((FilterField::Stock, FilterOrder::Low, 100.0)));
        assert_eq!(q.categories, vec!["Programming".to_string(), "Fiction".to_string()]);
    }

    #[test]
    fn matching_and_sorting() {
        let q = BookQuery {
            search: Some("RUST".to_string()),
            sort: Some((SortField::Price, SortOrder::Asc)),
            filter: Some((FilterField::Rating, FilterOrder::High, 4.0)),
            ..BookQuery::default()
        };
        let mut books = vec![
            book("Rust Atomics", 50, 10, 4.5, "Programming"),
            book("Rust Basics", 20, 10, 4.0, "Programming"),
            book("Rust Legacy", 10, 10, 3.0, "Programming"),
            book("Go Basics", 5, 10, 5.0, "Programming"),
        ];
        books.retain(|b| q.matches(b, None));
        q.sort(&mut books);
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Rust Basics", "Rust Atomics"]);
    }

    #[test]
    fn discount_filter_needs_a_discount() {
        let q = BookQuery {
            filter: Some((FilterField::DiscountPercentage, FilterOrder::High, 10.0)),
            ..BookQuery::default()
        };
        let b = book("Rust", 10, 10, 4.0, "Programming");
        assert!(!q.matches(&b, None));
        assert!(!q.matches(&b, Some(5)));
        assert!(q.matches(&b, Some(15)));
    }

    #[test]
    fn page_counts_round_up() {
        let q = BookQuery {
            limit: 4,
            ..BookQuery::default()
        };
        let page = BookPage::new(&q, 9, Vec::new());
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_data, 9);
    }

    #[test]
    fn new_book_validation() {
        let mut draft = NewBook {
            title: "Rust in Action".to_string(),
            description: "Systems programming concepts and techniques".to_string(),
            author: "Tim McNamara".to_string(),
            price: Money::from_units(45),
            rating: 4.0,
            stock: 20,
            category: "Programming".to_string(),
            published_at: NaiveDate::from_ymd_opt(2021, 8, 1).unwrap(),
            isbn: "9781617294556".to_string(),
        };
        assert!(draft.validate().is_ok());

        draft.stock = 5;
        draft.isbn = "12345".to_string();
        draft.title = "Rust #1".to_string();
        let errors = draft.validate().unwrap_err();
        assert_eq!(errors.get("stock"), Some("Stock must be a valid number between 10 and 500."));
        assert_eq!(errors.get("isbn"), Some("Invalid ISBN number"));
        assert_eq!(errors.get("title"), Some(INVALID));
    }

    #[test]
    fn patch_validation_and_apply() {
        let patch = BookPatch {
            price: Some(Money::from_units(5)),
            ..BookPatch::default()
        };
        assert!(!patch.is_empty());
        assert!(patch.validate().unwrap_err().get("price").is_some());

        let mut b = book("Rust", 10, 10, 4.0, "Programming");
        BookPatch {
            stock: Some(42),
            category: Some("Systems".to_string()),
            ..BookPatch::default()
        }
        .apply(&mut b);
        assert_eq!(b.stock, 42);
        assert_eq!(b.category, "Systems");
        assert!(BookPatch::default().is_empty());
    }
}
