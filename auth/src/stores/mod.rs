//! Storage implementations for the auth system.
//!
//! - **Session Store** (Redis) - Ephemeral session storage with TTL

pub mod session_redis;

pub use session_redis::RedisSessionStore;
