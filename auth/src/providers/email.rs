//! Email sender trait.

use super::AuthFuture;

/// Email sender.
///
/// Abstracts over delivery (SMTP in production, console in development,
/// a recording mock in tests).
pub trait EmailSender: Send + Sync {
    /// Send the account verification code issued at sign-up.
    ///
    /// # Arguments
    ///
    /// - `to`: Recipient email address
    /// - `name`: Recipient display name
    /// - `code`: Six-digit verification code
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailError`](crate::AuthError::EmailError) if:
    /// - The address cannot be parsed
    /// - The transport rejects the message
    fn send_verification_code(&self, to: String, name: String, code: String)
    -> AuthFuture<'_, ()>;
}
