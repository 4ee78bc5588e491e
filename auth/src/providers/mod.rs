//! Authentication providers.
//!
//! Traits for the external collaborators of the auth flow, plus their
//! production implementations. Services hold them as `Arc<dyn Trait>`, so
//! every async method returns an [`AuthFuture`].
//!
//! ```text
//! Service ──► PasswordHasher   (Argon2Hasher)
//!         ──► SessionStore     (RedisSessionStore, mocks::InMemorySessionStore)
//!         ──► EmailSender      (SmtpEmailSender, ConsoleEmailSender,
//!                               mocks::RecordingEmailSender)
//! ```

use crate::error::Result;
use std::future::Future;
use std::pin::Pin;

pub mod argon2_hasher;
pub mod console_email;
pub mod email;
pub mod password;
pub mod session;
pub mod smtp_email;

pub use argon2_hasher::Argon2Hasher;
pub use console_email::ConsoleEmailSender;
pub use email::EmailSender;
pub use password::PasswordHasher;
pub use session::SessionStore;
pub use smtp_email::SmtpEmailSender;

/// Boxed future returned by provider methods.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;
