//! Error types for authentication operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure modes of password hashing, sessions and email delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Session Errors
    // ═══════════════════════════════════════════════════════════
    /// No session is stored under the presented token.
    #[error("Session not found")]
    SessionNotFound,

    /// The session exists but is past its expiry.
    #[error("Session has expired")]
    SessionExpired,

    /// An access token was presented where a refresh token is required, or
    /// the other way around.
    #[error("Wrong kind of session token")]
    WrongTokenKind,

    // ═══════════════════════════════════════════════════════════
    // Credential Errors
    // ═══════════════════════════════════════════════════════════
    /// Hashing or parsing a password hash failed.
    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════
    /// The session backend failed.
    #[error("Session store error: {0}")]
    StoreError(String),

    /// Session (de)serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    EmailError(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns `true` if the caller should log in again.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bookstore_auth::AuthError;
    /// assert!(AuthError::SessionExpired.requires_login());
    /// assert!(!AuthError::EmailError("timeout".into()).requires_login());
    /// ```
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound | Self::SessionExpired | Self::WrongTokenKind
        )
    }
}
