//! Account verification codes.

use constant_time_eq::constant_time_eq;
use rand::Rng;

/// Number of digits in a verification code.
pub const CODE_LENGTH: usize = 6;

/// Generate a zero-padded six-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{code:0width$}", width = CODE_LENGTH)
}

/// Compare a submitted code with the stored one in constant time.
///
/// # Examples
///
/// ```
/// use bookstore_auth::verification::codes_match;
///
/// assert!(codes_match("042137", "042137"));
/// assert!(!codes_match("042137", "042138"));
/// assert!(!codes_match("042137", "42137"));
/// ```
#[must_use]
pub fn codes_match(expected: &str, provided: &str) -> bool {
    constant_time_eq(expected.as_bytes(), provided.trim().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert!(codes_match("123456", " 123456 "));
        assert!(!codes_match("123456", ""));
    }
}
