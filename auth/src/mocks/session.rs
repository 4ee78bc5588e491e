//! In-memory session store for testing.

use crate::error::{AuthError, Result};
use crate::providers::{AuthFuture, SessionStore};
use crate::session::Session;
use bookstore_core::types::UserId;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory session store.
///
/// Ignores TTLs; expiry is decided by
/// [`SessionManager`](crate::session::SessionManager) against its clock.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored sessions (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(&self, key: String, session: Session, _ttl: Duration) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            let mut sessions = self.lock()?;
            if sessions.contains_key(&key) {
                return Err(AuthError::StoreError("Session key already exists".into()));
            }
            sessions.insert(key, session);
            Ok(())
        })
    }

    fn get_session(&self, key: String) -> AuthFuture<'_, Option<Session>> {
        Box::pin(async move { Ok(self.lock()?.get(&key).cloned()) })
    }

    fn delete_session(&self, key: String) -> AuthFuture<'_, bool> {
        Box::pin(async move { Ok(self.lock()?.remove(&key).is_some()) })
    }

    fn delete_user_sessions(&self, user_id: UserId) -> AuthFuture<'_, usize> {
        Box::pin(async move {
            let mut sessions = self.lock()?;
            let before = sessions.len();
            sessions.retain(|_, s| s.user_id != user_id);
            Ok(before - sessions.len())
        })
    }
}
