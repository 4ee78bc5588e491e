//! Bookstore - catalog, carts, discounts and balance checkout over REST.
//!
//! # Architecture
//!
//! ```text
//!          HTTP (axum, cookies, correlation ids)
//!                        │
//!        ┌───────────────┴────────────────┐
//!        │  api::*  handlers              │  request validation, envelopes
//!        ├────────────────────────────────┤
//!        │  services::*                   │  orchestration, metrics, logs
//!        ├────────────────────────────────┤
//!        │  bookstore-core rules          │  pricing, cart, discount, checkout
//!        ├────────────────────────────────┤
//!        │  stores (PostgreSQL / memory)  │  sessions (Redis / memory)
//!        └────────────────────────────────┘
//! ```
//!
//! # Key Features
//!
//! ## 1. Atomic Checkout
//!
//! A checkout is planned from a snapshot and committed in one database
//! transaction that re-checks balance and stock under row locks:
//!
//! ```text
//! UPDATE books SET stock = stock - q WHERE id = $1 AND stock >= q
//! UPDATE users SET balance = balance - t WHERE id = $2 AND balance >= t
//! ```
//!
//! Either every write lands or none does.
//!
//! ## 2. Country-Scoped Discounts
//!
//! A discount covers a set of books for at most five days in a set of
//! countries. A book carries at most one discount at a time. Cart totals are
//! recomputed from scratch on every read and mutation.
//!
//! ## 3. Cookie Sessions
//!
//! Opaque access (1 hour) and refresh (365 days) tokens live in HttpOnly
//! cookies; the session store is the source of truth, so restricting an
//! account revokes its sessions immediately.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod server;
pub mod services;

pub use config::Config;
pub use server::{AppState, build_router};
