//! Session store trait.

use super::AuthFuture;
use crate::session::Session;
use bookstore_core::types::UserId;
use chrono::Duration;

/// Session store.
///
/// Sessions are keyed by a digest of the opaque token, never by the token
/// itself. Expiry is judged by the caller against its clock; stores only use
/// the TTL to evict.
pub trait SessionStore: Send + Sync {
    /// Store a session under `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The backend is unreachable
    /// - A session already exists under `key`
    fn create_session(&self, key: String, session: Session, ttl: Duration)
    -> AuthFuture<'_, ()>;

    /// Load the session stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or the stored bytes do
    /// not decode.
    fn get_session(&self, key: String) -> AuthFuture<'_, Option<Session>>;

    /// Delete the session under `key`. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    fn delete_session(&self, key: String) -> AuthFuture<'_, bool>;

    /// Delete every session of a user. Returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    fn delete_user_sessions(&self, user_id: UserId) -> AuthFuture<'_, usize>;
}
