//! Session configuration.
//!
//! Lifetimes should be provided by the application, not hardcoded.

use chrono::Duration;

/// Lifetimes of the two session tokens issued at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Access token lifetime.
    ///
    /// Default: 1 hour
    pub access_ttl: Duration,

    /// Refresh token lifetime.
    ///
    /// Default: 365 days
    pub refresh_ttl: Duration,
}

impl SessionConfig {
    /// Create a session configuration from lifetimes in seconds.
    #[must_use]
    pub const fn from_secs(access_secs: i64, refresh_secs: i64) -> Self {
        Self {
            access_ttl: Duration::seconds(access_secs),
            refresh_ttl: Duration::seconds(refresh_secs),
        }
    }

    /// Set access token lifetime.
    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Set refresh token lifetime.
    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(365),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cookie_lifetimes() {
        let config = SessionConfig::default();
        assert_eq!(config.access_ttl.num_seconds(), 3600);
        assert_eq!(config.refresh_ttl.num_seconds(), 31_536_000);
        assert_eq!(SessionConfig::from_secs(3600, 31_536_000), config);
    }
}
