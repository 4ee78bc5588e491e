//! Authentication extractors for the bookstore.
//!
//! - [`SessionUser`]: any logged-in account
//! - [`RequireUser`]: a customer (rank 2)
//! - [`RequireAdmin`]: an administrator (rank 1)
//!
//! # Usage
//!
//! ```rust,ignore
//! use bookstore::auth::middleware::RequireUser;
//!
//! async fn get_cart(
//!     user: RequireUser,
//!     State(cart): State<CartService>,
//! ) -> Result<ApiResponse<CartView>, AppError> {
//!     cart.view(user.user_id).await
//! }
//! ```

use super::cookies::ACCESS_COOKIE;
use crate::server::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use bookstore_auth::TokenKind;
use bookstore_core::types::{Rank, UserId};
use bookstore_web::AppError;
use tower_cookies::Cookies;

/// Authenticated session user.
///
/// Resolves the `accessToken` cookie to its session. Use this as a handler
/// parameter to require authentication.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser {
    /// The authenticated user ID
    pub user_id: UserId,
    /// Rank recorded at login
    pub rank: Rank,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, reason)| {
                AppError::internal().with_source(anyhow::anyhow!("cookie layer missing: {reason}"))
            })?;

        let token = cookies
            .get(ACCESS_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Unable to access.Please login"))?;

        let session = state
            .auth
            .sessions
            .authenticate(&token, TokenKind::Access, state.clock.now())
            .await?;

        Ok(Self {
            user_id: session.user_id,
            rank: session.rank,
        })
    }
}

async fn require_rank(
    parts: &mut Parts,
    state: &AppState,
    rank: Rank,
) -> Result<SessionUser, AppError> {
    let session_user = SessionUser::from_request_parts(parts, state).await?;
    if session_user.rank != rank {
        tracing::debug!(
            user_id = %session_user.user_id,
            required = rank.as_i16(),
            "Rank check failed"
        );
        return Err(AppError::unauthorized("Unable to access."));
    }
    Ok(session_user)
}

/// Require customer rank.
#[derive(Debug, Clone, Copy)]
pub struct RequireUser {
    /// The authenticated customer ID
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_user = require_rank(parts, state, Rank::User).await?;
        Ok(Self {
            user_id: session_user.user_id,
        })
    }
}

/// Require admin rank.
///
/// Returns 401 "Unable to access." if the user is not an admin.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin {
    /// The authenticated admin ID
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_user = require_rank(parts, state, Rank::Admin).await?;
        Ok(Self {
            user_id: session_user.user_id,
        })
    }
}
