//! Argon2id password hasher.

use crate::error::{AuthError, Result};
use crate::providers::PasswordHasher;
use argon2::password_hash::{
    self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

/// Argon2id hasher producing PHC strings (`$argon2id$v=19$...`).
///
/// # Examples
///
/// ```
/// use bookstore_auth::providers::{Argon2Hasher, PasswordHasher};
///
/// # fn main() -> bookstore_auth::Result<()> {
/// let hasher = Argon2Hasher::with_params(1024, 1, 1)?;
/// let hash = hasher.hash("Secr3t!pass")?;
/// assert!(hasher.verify("Secr3t!pass", &hash)?);
/// assert!(!hasher.verify("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Create a hasher with the library's recommended cost parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Create a hasher with explicit costs: memory in KiB, iterations and
    /// parallelism.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PasswordHashError`] if the parameters are out of range.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::PasswordHashError(format!("Invalid Argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AuthError::PasswordHashError(format!("Failed to encode salt: {e}")))?;

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHashError(format!("Failed to hash password: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::PasswordHashError(format!("Invalid password hash: {e}")))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswordHashError(format!(
                "Failed to verify password: {e}"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = hasher();
        let a = hasher.hash("Secr3t!pass").unwrap();
        let b = hasher.hash("Secr3t!pass").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(hasher.verify("Secr3t!pass", &b).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let err = hasher().verify("Secr3t!pass", "password_hash").unwrap_err();
        assert!(matches!(err, AuthError::PasswordHashError(_)));
    }

    #[test]
    fn out_of_range_params_are_rejected() {
        assert!(Argon2Hasher::with_params(1, 1, 1).is_err());
    }
}
