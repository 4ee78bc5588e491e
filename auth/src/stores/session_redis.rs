//! Redis-based session store implementation.
//!
//! # Architecture
//!
//! Sessions are stored in Redis with:
//! - **Primary key**: `session:{token_key}` → bincode-serialized [`Session`]
//! - **User index**: `user:{user_id}:sessions` (Set) → token keys of the user
//! - **TTL**: the token lifetime; the index outlives its sessions by a day
//!
//! # Example
//!
//! ```no_run
//! use bookstore_auth::stores::RedisSessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSessionStore::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::providers::{AuthFuture, SessionStore};
use crate::session::Session;
use bookstore_core::types::UserId;
use chrono::Duration;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Deletes every session in a user's index and the index itself.
const DELETE_USER_SESSIONS: &str = r"
    local user_set_key = KEYS[1]
    local keys = redis.call('SMEMBERS', user_set_key)
    local deleted_count = 0

    for i, key in ipairs(keys) do
        if redis.call('DEL', 'session:' .. key) == 1 then
            deleted_count = deleted_count + 1
        end
    end

    redis.call('DEL', user_set_key)
    return deleted_count
";

/// Redis-based session store with TTL-based expiration.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::StoreError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::StoreError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    /// Round-trip a PING, used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns error if Redis does not answer.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::StoreError(format!("Redis ping failed: {e}")))?;
        Ok(())
    }

    fn session_key(key: &str) -> String {
        format!("session:{key}")
    }

    fn user_sessions_key(user_id: UserId) -> String {
        format!("user:{user_id}:sessions")
    }

    async fn load(&self, key: &str) -> Result<Option<Session>> {
        let mut conn = self.conn_manager.clone();
        let bytes: Option<Vec<u8>> = conn
            .get(Self::session_key(key))
            .await
            .map_err(|e| AuthError::StoreError(format!("Failed to get session from Redis: {e}")))?;

        bytes
            .map(|bytes| {
                bincode::deserialize(&bytes)
                    .map_err(|e| AuthError::SerializationError(e.to_string()))
            })
            .transpose()
    }
}

impl SessionStore for RedisSessionStore {
    fn create_session(&self, key: String, session: Session, ttl: Duration) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let session_key = Self::session_key(&key);
            let user_sessions_key = Self::user_sessions_key(session.user_id);

            let exists: bool = conn.exists(&session_key).await.map_err(|e| {
                AuthError::StoreError(format!("Failed to check session existence: {e}"))
            })?;
            if exists {
                return Err(AuthError::StoreError("Session key already exists".into()));
            }

            let session_bytes = bincode::serialize(&session)
                .map_err(|e| AuthError::SerializationError(e.to_string()))?;

            #[allow(clippy::cast_sign_loss)]
            let ttl_seconds = ttl.num_seconds().max(1) as u64;
            #[allow(clippy::cast_possible_wrap)]
            let set_ttl_seconds = (ttl_seconds + 86_400) as i64;

            let _: () = redis::pipe()
                .atomic()
                .set_ex(&session_key, session_bytes, ttl_seconds)
                .sadd(&user_sessions_key, &key)
                .ignore()
                .expire(&user_sessions_key, set_ttl_seconds)
                .ignore()
                .query_async(&mut conn)
                .await
                .map_err(|e| AuthError::StoreError(format!("Failed to create session: {e}")))?;

            tracing::info!(
                user_id = %session.user_id,
                kind = ?session.kind,
                ttl_seconds = ttl_seconds,
                "Created session in Redis"
            );

            Ok(())
        })
    }

    fn get_session(&self, key: String) -> AuthFuture<'_, Option<Session>> {
        Box::pin(async move { self.load(&key).await })
    }

    fn delete_session(&self, key: String) -> AuthFuture<'_, bool> {
        Box::pin(async move {
            let Some(session) = self.load(&key).await? else {
                return Ok(false);
            };
            let mut conn = self.conn_manager.clone();

            let (deleted,): (i64,) = redis::pipe()
                .atomic()
                .del(Self::session_key(&key))
                .srem(Self::user_sessions_key(session.user_id), &key)
                .ignore()
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    AuthError::StoreError(format!("Failed to delete session from Redis: {e}"))
                })?;

            tracing::debug!(user_id = %session.user_id, "Deleted session from Redis");
            Ok(deleted > 0)
        })
    }

    fn delete_user_sessions(&self, user_id: UserId) -> AuthFuture<'_, usize> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let deleted_count: usize = redis::Script::new(DELETE_USER_SESSIONS)
                .key(Self::user_sessions_key(user_id))
                .invoke_async(&mut conn)
                .await
                .map_err(|e| {
                    AuthError::StoreError(format!("Failed to delete user sessions: {e}"))
                })?;

            Ok(deleted_count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{TokenKind, generate_token, token_key};
    use bookstore_core::types::Rank;
    use chrono::Utc;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    fn session(user_id: UserId) -> Session {
        let now = Utc::now();
        Session {
            user_id,
            rank: Rank::User,
            kind: TokenKind::Access,
            issued_at: now,
            expires_at: now + Duration::hours(1),
        }
    }

    #[test]
    fn session_survives_bincode() {
        let original = session(UserId::new());
        let bytes = bincode::serialize(&original).unwrap_or_default();
        let decoded: Option<Session> = bincode::deserialize(&bytes).ok();
        assert_eq!(decoded, Some(original));
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_redis_session_lifecycle() {
        let store = RedisSessionStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();
        store.ping().await.unwrap();

        let user_id = UserId::new();
        let key = token_key(&generate_token());
        let stored = session(user_id);

        store
            .create_session(key.clone(), stored.clone(), Duration::hours(1))
            .await
            .unwrap();
        assert!(
            store
                .create_session(key.clone(), stored.clone(), Duration::hours(1))
                .await
                .is_err()
        );

        assert_eq!(store.get_session(key.clone()).await.unwrap(), Some(stored));
        assert!(store.delete_session(key.clone()).await.unwrap());
        assert_eq!(store.get_session(key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_delete_user_sessions() {
        let store = RedisSessionStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();
        let user_id = UserId::new();

        for _ in 0..3 {
            store
                .create_session(
                    token_key(&generate_token()),
                    session(user_id),
                    Duration::hours(1),
                )
                .await
                .unwrap();
        }

        assert_eq!(store.delete_user_sessions(user_id).await.unwrap(), 3);
        assert_eq!(store.delete_user_sessions(user_id).await.unwrap(), 0);
    }
}
