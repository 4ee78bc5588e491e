//! Password hasher trait.

use crate::error::Result;

/// Password hasher.
///
/// Hashing is CPU-bound and synchronous; callers on the async runtime should
/// run it through `tokio::task::spawn_blocking` when the cost parameters are
/// high.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing (PHC) string.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PasswordHashError`](crate::AuthError::PasswordHashError)
    /// if hashing fails.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PasswordHashError`](crate::AuthError::PasswordHashError)
    /// if the stored hash cannot be parsed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}
