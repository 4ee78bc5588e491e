//! Balances, profiles and account restriction.

use bookstore_auth::SessionManager;
use bookstore_core::environment::Clock;
use bookstore_core::store::UserStore;
use bookstore_core::types::{Address, Money, Rank, User, UserId};
use bookstore_web::{AppError, WebResult};
use std::sync::Arc;

/// Largest single top-up, in whole units.
pub const MAX_TOP_UP_UNITS: i64 = 30_000;

/// Profile fields an admin may change. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name
    pub name: Option<String>,
    /// New address
    pub address: Option<Address>,
}

fn unknown_user() -> AppError {
    AppError::unprocessable("No user associated with this id")
}

/// User account service.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
    clock: Arc<dyn Clock>,
}

impl UserService {
    /// Create a user service.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, sessions: SessionManager, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            sessions,
            clock,
        }
    }

    /// Current balance of a user.
    ///
    /// # Errors
    ///
    /// - 404 "No user found"
    pub async fn balance(&self, user_id: UserId) -> WebResult<Money> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("No user found"))?;
        Ok(user.balance)
    }

    /// Top up a user's balance and return the new balance.
    ///
    /// `amount` must already be within `0 < amount <= 30000`.
    ///
    /// # Errors
    ///
    /// - 404 "No user found"
    pub async fn add_balance(&self, user_id: UserId, amount: Money) -> WebResult<Money> {
        let balance = self
            .users
            .add_balance(user_id, amount, self.clock.now())
            .await?
            .ok_or_else(|| AppError::not_found("No user found"))?;
        tracing::info!(user_id = %user_id, amount = %amount, balance = %balance, "Balance added");
        Ok(balance)
    }

    /// Every account that is not restricted.
    ///
    /// # Errors
    ///
    /// Returns 500 if the store fails.
    pub async fn list_active(&self) -> WebResult<Vec<User>> {
        Ok(self.users.list_active_users().await?)
    }

    /// Replace a user's name and/or address. An empty update returns the
    /// profile unchanged.
    ///
    /// # Errors
    ///
    /// - 422 "No user associated with this id"
    pub async fn update_profile(&self, user_id: UserId, update: ProfileUpdate) -> WebResult<User> {
        let address = update.address.map(|address| Address {
            country: address.country.trim().to_uppercase(),
            ..address
        });
        self.users
            .update_profile(
                user_id,
                update.name.map(|n| n.trim().to_string()),
                address,
                self.clock.now(),
            )
            .await?
            .ok_or_else(unknown_user)
    }

    /// Restrict an account and end all its sessions.
    ///
    /// # Errors
    ///
    /// - 422 "No user associated with this id"
    /// - 401 "You can not perform this action" for an administrator
    pub async fn restrict(&self, user_id: UserId) -> WebResult<()> {
        let credential = self
            .users
            .find_credential(user_id)
            .await?
            .ok_or_else(unknown_user)?;
        if credential.rank == Rank::Admin {
            return Err(AppError::unauthorized("You can not perform this action"));
        }

        if !self.users.set_restricted(user_id, true).await? {
            return Err(unknown_user());
        }
        let revoked = self.sessions.revoke_user(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "User restricted");
        Ok(())
    }
}
