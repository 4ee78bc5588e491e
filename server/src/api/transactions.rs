//! Checkout and transaction history endpoints.
//!
//! - POST /api/transaction/create - Buy the caller's cart
//! - GET /api/transaction/details - The caller's transactions
//! - GET /api/transaction/all - Every transaction (admin)

use crate::auth::middleware::{RequireAdmin, RequireUser};
use crate::services::CheckoutService;
use axum::extract::State;
use bookstore_core::types::{CartId, PaymentMethod, Transaction};
use bookstore_web::{ApiResponse, CorrelationId, ValidJson, WebResult};
use serde::Deserialize;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Checkout body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Cart to buy; must belong to the caller
    pub cart: CartId,
    /// `online`, `cash` or `card`
    pub payment_method: PaymentMethod,
}

// ============================================================================
// Handlers
// ============================================================================

/// Buy everything in the caller's cart.
///
/// Stock, balance, the transaction record and the emptied cart are written
/// together or not at all.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/transaction/create \
///   --cookie "accessToken=<token>" \
///   -H "Content-Type: application/json" \
///   -d '{"cart": "<cartId>", "paymentMethod": "card"}'
/// ```
pub async fn checkout(
    user: RequireUser,
    correlation_id: CorrelationId,
    State(checkout): State<CheckoutService>,
    ValidJson(request): ValidJson<CheckoutRequest>,
) -> WebResult<ApiResponse<Transaction>> {
    let transaction = checkout
        .checkout(user.user_id, request.cart, request.payment_method)
        .await?;
    tracing::info!(
        %correlation_id,
        transaction_id = %transaction.id,
        user_id = %user.user_id,
        "Order placed"
    );
    Ok(ApiResponse::created("Order placed successfully", transaction))
}

/// The caller's transactions, newest first.
pub async fn my_transactions(
    user: RequireUser,
    State(checkout): State<CheckoutService>,
) -> WebResult<ApiResponse<Vec<Transaction>>> {
    let history = checkout.history(user.user_id).await?;
    Ok(ApiResponse::ok("Successfully get the data", history))
}

/// Every transaction.
pub async fn all_transactions(
    _admin: RequireAdmin,
    State(checkout): State<CheckoutService>,
) -> WebResult<ApiResponse<Vec<Transaction>>> {
    let all = checkout.all().await?;
    if all.is_empty() {
        return Ok(ApiResponse::ok("No transactions were found", all));
    }
    Ok(ApiResponse::ok("Successfully received all transactions", all))
}
