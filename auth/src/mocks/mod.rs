//! In-memory provider implementations for testing.

pub mod email;
pub mod session;

pub use email::{RecordingEmailSender, SentEmail};
pub use session::InMemorySessionStore;
