//! Session cookies and the role gate.
//!
//! - [`cookies`]: the `accessToken` / `refreshToken` cookie pair
//! - [`middleware`]: extractors resolving the access cookie to a session

pub mod cookies;
pub mod middleware;

pub use cookies::{ACCESS_COOKIE, REFRESH_COOKIE};
pub use middleware::{RequireAdmin, RequireUser, SessionUser};
