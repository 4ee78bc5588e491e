//! Balance and account administration endpoints.
//!
//! - GET /api/user/balance - Caller's balance
//! - POST /api/user/add-balance - Top up the caller's balance
//! - GET /api/user/all - Non-restricted users (admin)
//! - PATCH /api/user/update/:userId - Change name or address (admin)
//! - DELETE /api/user/delete/:userId - Restrict an account (admin)

use super::auth::{check_address, check_name};
use crate::auth::middleware::{RequireAdmin, RequireUser};
use crate::services::UserService;
use crate::services::user::{MAX_TOP_UP_UNITS, ProfileUpdate};
use axum::extract::State;
use axum::http::StatusCode;
use bookstore_core::types::{Address, Money, User, UserId};
use bookstore_core::validation::ValidationErrors;
use bookstore_web::{ApiResponse, AppError, ValidJson, ValidPath, WebResult};
use serde::Deserialize;

const AMOUNT_RULE: &str = "Amount must be a positive number less than 30000";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Top-up body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddBalanceRequest {
    /// Amount to add, `0 < amount <= 30000`
    pub amount: f64,
}

impl AddBalanceRequest {
    fn money(&self) -> Result<Money, ValidationErrors> {
        #[allow(clippy::cast_precision_loss)]
        let ceiling = MAX_TOP_UP_UNITS as f64;
        let in_range = self.amount > 0.0 && self.amount <= ceiling;
        let money = Money::from_decimal(self.amount).filter(|m| in_range && !m.is_empty());
        money.ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.add("amount", AMOUNT_RULE);
            errors
        })
    }
}

/// Profile update body. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    /// New display name
    pub name: Option<String>,
    /// New address
    pub address: Option<Address>,
}

impl UpdateUserRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        if let Some(address) = &self.address {
            check_address(&mut errors, address);
        }
        errors.into_result()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// The caller's balance.
pub async fn balance(
    user: RequireUser,
    State(users): State<UserService>,
) -> WebResult<ApiResponse<Money>> {
    let balance = users.balance(user.user_id).await?;
    Ok(ApiResponse::ok("Successfully get the data", balance))
}

/// Top up the caller's balance; responds with the new balance.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/user/add-balance \
///   --cookie "accessToken=<token>" \
///   -H "Content-Type: application/json" \
///   -d '{"amount": 500}'
/// ```
pub async fn add_balance(
    user: RequireUser,
    State(users): State<UserService>,
    ValidJson(request): ValidJson<AddBalanceRequest>,
) -> WebResult<ApiResponse<Money>> {
    let amount = request.money()?;
    let balance = users.add_balance(user.user_id, amount).await?;
    Ok(ApiResponse::accepted("Balance added successfully", balance))
}

/// Every user whose account is not restricted.
pub async fn all_users(
    _admin: RequireAdmin,
    State(users): State<UserService>,
) -> WebResult<ApiResponse<Vec<User>>> {
    let active = users.list_active().await?;
    if active.is_empty() {
        return Err(AppError::not_found("No data found"));
    }
    Ok(ApiResponse::ok("Successfully get all the data", active))
}

/// Replace a user's name and/or address.
pub async fn update_user(
    _admin: RequireAdmin,
    State(users): State<UserService>,
    ValidPath(user_id): ValidPath<UserId>,
    ValidJson(request): ValidJson<UpdateUserRequest>,
) -> WebResult<ApiResponse<User>> {
    request.validate()?;
    let updated = users
        .update_profile(
            user_id,
            ProfileUpdate {
                name: request.name,
                address: request.address,
            },
        )
        .await?;
    Ok(ApiResponse::ok("Updated user successfully", updated))
}

/// Restrict an account. Administrators cannot be restricted.
pub async fn delete_user(
    admin: RequireAdmin,
    State(users): State<UserService>,
    ValidPath(user_id): ValidPath<UserId>,
) -> WebResult<ApiResponse<()>> {
    users.restrict(user_id).await?;
    tracing::info!(admin_id = %admin.user_id, user_id = %user_id, "Account restricted by admin");
    Ok(ApiResponse::message(
        StatusCode::OK,
        "User restricted successfully",
    ))
}
