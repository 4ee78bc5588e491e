//! Recording email sender for testing.

use crate::error::{AuthError, Result};
use crate::providers::{AuthFuture, EmailSender};
use std::sync::{Arc, Mutex};

/// One email captured by [`RecordingEmailSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Recipient
    pub to: String,
    /// Recipient display name
    pub name: String,
    /// Verification code
    pub code: String,
}

/// Email sender that records messages instead of delivering them.
#[derive(Debug, Clone)]
pub struct RecordingEmailSender {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    /// Whether to simulate success or failure.
    pub should_succeed: bool,
}

impl RecordingEmailSender {
    /// Create a sender that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            should_succeed: true,
        }
    }

    /// Create a sender whose deliveries all fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_succeed: false,
            ..Self::new()
        }
    }

    /// Every email recorded so far.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn sent(&self) -> Result<Vec<SentEmail>> {
        Ok(self
            .sent
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .clone())
    }

    /// The most recent code sent to `to`.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn last_code_for(&self, to: &str) -> Result<Option<String>> {
        Ok(self
            .sent()?
            .into_iter()
            .rev()
            .find(|e| e.to == to)
            .map(|e| e.code))
    }
}

impl Default for RecordingEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailSender for RecordingEmailSender {
    fn send_verification_code(
        &self,
        to: String,
        name: String,
        code: String,
    ) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            if !self.should_succeed {
                return Err(AuthError::EmailError("Simulated delivery failure".into()));
            }
            self.sent
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
                .push(SentEmail { to, name, code });
            Ok(())
        })
    }
}
