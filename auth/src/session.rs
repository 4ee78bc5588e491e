//! Server-side sessions behind opaque tokens.
//!
//! A token is 32 random bytes, base64url encoded, handed to the client as a
//! cookie. The store only ever sees [`token_key`], a SHA-256 digest of the
//! token, so a dump of the store cannot be replayed as cookies.

use crate::config::SessionConfig;
use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use base64::Engine;
use bookstore_core::types::{Rank, UserId};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Which cookie a session backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Short-lived token presented on every request.
    Access,
    /// Long-lived token exchanged for a new access token.
    Refresh,
}

/// A stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Authenticated user.
    pub user_id: UserId,
    /// Rank at the time of login.
    pub rank: Rank,
    /// Token kind.
    pub kind: TokenKind,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A freshly issued token and its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Opaque token for the cookie.
    pub token: String,
    /// Token kind.
    pub kind: TokenKind,
    /// Lifetime, used for the cookie max-age.
    pub ttl: Duration,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

/// Access and refresh tokens issued together at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Access token.
    pub access: IssuedToken,
    /// Refresh token.
    pub refresh: IssuedToken,
}

/// Generate a cryptographically secure opaque token.
#[must_use]
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let mut random_bytes = [0u8; 32];
    rng.fill_bytes(&mut random_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Store key for a token.
#[must_use]
pub fn token_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// Issues, checks and revokes sessions over a [`SessionStore`].
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a session manager.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Token lifetimes in use.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Issue one token of `kind` for a user.
    ///
    /// # Errors
    ///
    /// Returns error if the store rejects the session.
    pub async fn issue(
        &self,
        user_id: UserId,
        rank: Rank,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let ttl = match kind {
            TokenKind::Access => self.config.access_ttl,
            TokenKind::Refresh => self.config.refresh_ttl,
        };
        let token = generate_token();
        let session = Session {
            user_id,
            rank,
            kind,
            issued_at: now,
            expires_at: now + ttl,
        };
        let expires_at = session.expires_at;

        self.store
            .create_session(token_key(&token), session, ttl)
            .await?;

        Ok(IssuedToken {
            token,
            kind,
            ttl,
            expires_at,
        })
    }

    /// Issue the access and refresh tokens of a login.
    ///
    /// # Errors
    ///
    /// Returns error if the store rejects either session.
    pub async fn login(&self, user_id: UserId, rank: Rank, now: DateTime<Utc>) -> Result<TokenPair> {
        let access = self.issue(user_id, rank, TokenKind::Access, now).await?;
        let refresh = self.issue(user_id, rank, TokenKind::Refresh, now).await?;
        Ok(TokenPair { access, refresh })
    }

    /// Resolve a presented token to its session.
    ///
    /// An expired session is deleted on sight.
    ///
    /// # Errors
    ///
    /// - [`AuthError::SessionNotFound`] if nothing is stored under the token
    /// - [`AuthError::WrongTokenKind`] if the session backs the other cookie
    /// - [`AuthError::SessionExpired`] if the session is past its expiry
    pub async fn authenticate(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        let key = token_key(token);
        let session = self
            .store
            .get_session(key.clone())
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.kind != kind {
            return Err(AuthError::WrongTokenKind);
        }
        if session.is_expired_at(now) {
            self.store.delete_session(key).await?;
            return Err(AuthError::SessionExpired);
        }
        Ok(session)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Same as [`Self::authenticate`], plus store failures while issuing.
    pub async fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
        let session = self
            .authenticate(refresh_token, TokenKind::Refresh, now)
            .await?;
        self.issue(session.user_id, session.rank, TokenKind::Access, now)
            .await
    }

    /// Revoke a single token. Returns `true` if it was live.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        self.store.delete_session(token_key(token)).await
    }

    /// Revoke every token of a user.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    pub async fn revoke_user(&self, user_id: UserId) -> Result<usize> {
        let count = self.store.delete_user_sessions(user_id).await?;
        tracing::info!(user_id = %user_id, session_count = count, "Revoked user sessions");
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::InMemorySessionStore;
    use bookstore_testing::test_clock;
    use bookstore_core::environment::Clock;

    fn manager() -> (SessionManager, InMemorySessionStore) {
        let store = InMemorySessionStore::new();
        let manager = SessionManager::new(Arc::new(store.clone()), SessionConfig::default());
        (manager, store)
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(token_key(&a), a);
        assert_eq!(token_key(&a), token_key(&a));
    }

    #[tokio::test]
    async fn login_issues_both_tokens() {
        let (manager, store) = manager();
        let now = test_clock().now();
        let user_id = UserId::new();

        let pair = manager.login(user_id, Rank::User, now).await.unwrap();
        assert_eq!(pair.access.expires_at, now + Duration::hours(1));
        assert_eq!(pair.refresh.expires_at, now + Duration::days(365));
        assert_eq!(store.session_count().unwrap(), 2);

        let session = manager
            .authenticate(&pair.access.token, TokenKind::Access, now)
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.rank, Rank::User);
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let (manager, _) = manager();
        let now = test_clock().now();
        let pair = manager.login(UserId::new(), Rank::Admin, now).await.unwrap();

        let err = manager
            .authenticate(&pair.refresh.token, TokenKind::Access, now)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::WrongTokenKind);

        let access = manager.refresh(&pair.refresh.token, now).await.unwrap();
        let session = manager
            .authenticate(&access.token, TokenKind::Access, now)
            .await
            .unwrap();
        assert_eq!(session.rank, Rank::Admin);
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected_and_evicted() {
        let (manager, store) = manager();
        let now = test_clock().now();
        let access = manager
            .issue(UserId::new(), Rank::User, TokenKind::Access, now)
            .await
            .unwrap();

        let later = now + Duration::hours(1);
        let err = manager
            .authenticate(&access.token, TokenKind::Access, later)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::SessionExpired);
        assert_eq!(store.session_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn revoked_tokens_are_not_found() {
        let (manager, _) = manager();
        let now = test_clock().now();
        let user_id = UserId::new();
        let first = manager.login(user_id, Rank::User, now).await.unwrap();
        let second = manager.login(user_id, Rank::User, now).await.unwrap();

        assert!(manager.revoke(&first.access.token).await.unwrap());
        assert!(!manager.revoke(&first.access.token).await.unwrap());
        assert_eq!(
            manager
                .authenticate(&first.access.token, TokenKind::Access, now)
                .await
                .unwrap_err(),
            AuthError::SessionNotFound
        );

        assert_eq!(manager.revoke_user(user_id).await.unwrap(), 3);
        assert!(manager.refresh(&second.refresh.token, now).await.is_err());
    }
}
