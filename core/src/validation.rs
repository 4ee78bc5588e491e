//! Field validation shared by request types.
//!
//! Validators collect a field→message map. The first failure per field is
//! kept, matching a "bail on first error" rule chain.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static PHONE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:\+88|88)?(01[3-9]\d{8}|(02|8[0-9])\d{7})$").ok());

static SPECIAL_CHARACTERS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[!@#$%^&*()_+{}\[\]:;<>~\\/-]").ok());

/// Field → message map returned with a 422 response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Creates an empty map
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Records `message` for `field` unless the field already failed.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Records `message` when `failed` is true.
    pub fn check(&mut self, failed: bool, field: &str, message: &str) {
        if failed {
            self.add(field, message);
        }
    }

    /// Returns `true` if no field failed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Message recorded for `field`, if any
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    ///
    /// # Errors
    ///
    /// Returns the collected errors when any field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Whether `value` contains any character from the disallowed set
/// `!@#$%^&*()_+{}[]:;<>~\/-`.
#[must_use]
pub fn has_special_characters(value: &str) -> bool {
    SPECIAL_CHARACTERS
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// Bangladeshi mobile or land-line number, optionally prefixed `+88`/`88`.
///
/// # Examples
///
/// ```
/// use bookstore_core::validation::is_valid_phone;
///
/// assert!(is_valid_phone("01712345678"));
/// assert!(is_valid_phone("+8801712345678"));
/// assert!(!is_valid_phone("01212345678"));
/// ```
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.as_ref().is_some_and(|re| re.is_match(phone))
}

/// Validate email address format.
///
/// Exactly one `@`, non-empty local part, and a dotted domain whose labels
/// are non-empty.
///
/// # Examples
///
/// ```
/// use bookstore_core::validation::is_valid_email;
///
/// assert!(is_valid_email("reader@example.com"));
/// assert!(!is_valid_email("reader@localhost"));
/// assert!(!is_valid_email("@example.com"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }
    let valid_local = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    local.chars().all(valid_local)
        && domain.chars().all(valid_domain)
        && domain.split('.').all(|part| !part.is_empty())
}

/// At least 8 characters with a lowercase letter, an uppercase letter, a
/// digit and a symbol.
#[must_use]
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(char::is_lowercase)
        && password.chars().any(char::is_uppercase)
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

/// ISBN-10 or ISBN-13 with a valid check digit. Hyphens and spaces are
/// ignored.
///
/// # Examples
///
/// ```
/// use bookstore_core::validation::is_valid_isbn;
///
/// assert!(is_valid_isbn("978-1-4920-5259-3"));
/// assert!(is_valid_isbn("0306406152"));
/// assert!(!is_valid_isbn("9781492052590"));
/// ```
#[must_use]
pub fn is_valid_isbn(isbn: &str) -> bool {
    let chars: Vec<char> = isbn.chars().filter(|c| *c != '-' && *c != ' ').collect();
    match chars.len() {
        10 => {
            let mut sum = 0_u32;
            for (i, c) in chars.iter().enumerate() {
                let value = match (i, c) {
                    (9, 'X' | 'x') => 10,
                    (_, c) => match c.to_digit(10) {
                        Some(d) => d,
                        None => return false,
                    },
                };
                #[allow(clippy::cast_possible_truncation)]
                let weight = 10 - i as u32;
                sum += value * weight;
            }
            sum % 11 == 0
        }
        13 => {
            let mut sum = 0_u32;
            for (i, c) in chars.iter().enumerate() {
                let Some(d) = c.to_digit(10) else {
                    return false;
                };
                sum += if i % 2 == 0 { d } else { d * 3 };
            }
            sum % 10 == 0
        }
        _ => false,
    }
}

/// Length in characters within `min..=max`.
#[must_use]
pub fn len_between(value: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&value.chars().count())
}

/// Checks a required free-text field: non-blank, length bounds, no special
/// characters. Records the first failure under `field`.
pub fn check_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    (min, max): (usize, usize),
    label: &str,
) {
    if value.trim().is_empty() {
        errors.add(field, format!("{label} is required."));
    } else if !len_between(value, min, max) {
        errors.add(field, format!("{label} length must be between {min} to {max}"));
    } else if has_special_characters(value) {
        errors.add(field, "Invalid value provided");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_error_per_field_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "Title is required.");
        errors.add("title", "Title length must be between 3 to 50");
        errors.check(true, "price", "Price must be a number");
        errors.check(false, "stock", "unused");

        assert_eq!(errors.get("title"), Some("Title is required."));
        assert_eq!(errors.get("price"), Some("Price must be a number"));
        assert_eq!(errors.get("stock"), None);
        assert!(errors.clone().into_result().is_err());
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Invalid email address");
        assert_eq!(
            serde_json::to_value(&errors).ok(),
            Some(serde_json::json!({ "email": "Invalid email address" }))
        );
    }

    #[test]
    fn special_characters() {
        assert!(has_special_characters("Rust/C++"));
        assert!(has_special_characters("under_score"));
        assert!(!has_special_characters("Plain title 2nd edition"));
    }

    #[test]
    fn phone_numbers() {
        assert!(is_valid_phone("8801912345678"));
        assert!(is_valid_phone("029876543"));
        assert!(!is_valid_phone("12345"));
    }

    #[test]
    fn isbn_check_digits() {
        assert!(is_valid_isbn("9781617294556"));
        assert!(is_valid_isbn("080442957X"));
        assert!(!is_valid_isbn("978161729455"));
        assert!(!is_valid_isbn("97816172945ab"));
    }

    #[test]
    fn strong_passwords() {
        assert!(is_strong_password("Secr3t!pass"));
        assert!(!is_strong_password("secr3t!pass"));
        assert!(!is_strong_password("Secret!pass"));
        assert!(!is_strong_password("Secr3tpass"));
        assert!(!is_strong_password("S3c!r"));
    }

    #[test]
    fn text_checks_record_first_failure() {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "title", "  ", (3, 50), "Title");
        check_text(&mut errors, "category", "ab", (3, 50), "Category");
        check_text(&mut errors, "author", "A<b>", (1, 40), "Author");
        check_text(&mut errors, "description", "A fine description", (15, 200), "Description");

        assert_eq!(errors.get("title"), Some("Title is required."));
        assert_eq!(errors.get("category"), Some("Category length must be between 3 to 50"));
        assert_eq!(errors.get("author"), Some("Invalid value provided"));
        assert_eq!(errors.get("description"), None);
    }
}
