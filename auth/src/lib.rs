//! # Bookstore Authentication
//!
//! Credentials and sessions for the bookstore API:
//!
//! - [`providers::PasswordHasher`]: Argon2id password hashing
//! - [`session::SessionManager`]: opaque access/refresh tokens over a
//!   [`providers::SessionStore`] (Redis in production)
//! - [`verification`]: six-digit account verification codes
//! - [`providers::EmailSender`]: delivers the verification code over SMTP
//!   or to the console
//!
//! ## Example: Login
//!
//! ```rust,ignore
//! use bookstore_auth::*;
//!
//! if hasher.verify(&password, &credential.password_hash)? {
//!     let tokens = sessions.login(credential.user_id, credential.rank, clock.now()).await?;
//!     // set tokens.access / tokens.refresh as cookies
//! }
//! ```

pub mod config;
pub mod error;
pub mod providers;
pub mod session;
pub mod stores;
pub mod verification;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use config::SessionConfig;
pub use error::{AuthError, Result};
pub use session::{IssuedToken, Session, SessionManager, TokenKind, TokenPair};
