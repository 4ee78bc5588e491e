//! Session cookies.
//!
//! Both tokens travel in HttpOnly cookies scoped to `/`. The access cookie
//! lives as long as its session; the refresh cookie likewise.

use bookstore_auth::IssuedToken;
use tower_cookies::Cookie;
use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time::Duration;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "accessToken";

/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Cookie holding a freshly issued token.
#[must_use]
pub fn session_cookie(name: &'static str, issued: &IssuedToken, secure: bool) -> Cookie<'static> {
    Cookie::build((name, issued.token.clone()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(issued.ttl.num_seconds()))
        .build()
}

/// Cookie that matches a session cookie for removal.
#[must_use]
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}
