//! Cart endpoints. All require a customer session.
//!
//! - GET /api/cart/cartByUser - The caller's cart with totals
//! - POST /api/cart/create - Add units of a book
//! - PATCH /api/cart/update - Remove units of a book

use crate::auth::middleware::RequireUser;
use crate::services::CartService;
use crate::services::cart::CartView;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookstore_core::cart::{AddOutcome, RemoveOutcome};
use bookstore_core::types::{BookId, CartLine};
use bookstore_core::validation::ValidationErrors;
use bookstore_web::{ApiResponse, ValidJson, WebResult};
use serde::Deserialize;

/// Largest quantity a single request may carry.
const MAX_QUANTITY: i64 = 10_000_000;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of add and update requests.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartLineRequest {
    /// Book to add or remove
    pub book: BookId,
    /// Units, `1..=10000000`
    pub quantity: i64,
}

impl CartLineRequest {
    fn quantity(&self) -> Result<u32, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(
            self.quantity < 1,
            "quantity",
            "Quantity can not be less than 1",
        );
        errors.check(
            self.quantity > MAX_QUANTITY,
            "quantity",
            "Quantity can not be greater than 10000000",
        );
        errors.into_result()?;
        u32::try_from(self.quantity).map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.add("quantity", "Quantity can not be greater than 10000000");
            errors
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// The caller's cart with `beforeDiscount` and `afterDiscount` totals.
pub async fn get_cart(
    user: RequireUser,
    State(carts): State<CartService>,
) -> WebResult<Response> {
    Ok(match carts.view(user.user_id).await? {
        CartView::Empty => {
            ApiResponse::ok("No items available in the cart", Vec::<CartLine>::new())
                .into_response()
        }
        CartView::Filled(summary) => {
            ApiResponse::ok("Successfully get the data", summary).into_response()
        }
    })
}

/// Add units of a book, creating the cart on first use.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/cart/create \
///   --cookie "accessToken=<token>" \
///   -H "Content-Type: application/json" \
///   -d '{"book": "<bookId>", "quantity": 3}'
/// ```
pub async fn add_to_cart(
    user: RequireUser,
    State(carts): State<CartService>,
    ValidJson(request): ValidJson<CartLineRequest>,
) -> WebResult<Response> {
    let quantity = request.quantity()?;
    let (summary, outcome) = carts.add(user.user_id, request.book, quantity).await?;
    let response = match outcome {
        AddOutcome::CreatedCart => ApiResponse::created("Added to new cart", summary),
        AddOutcome::IncrementedLine => {
            ApiResponse::accepted("Quantity updated in the existing cart", summary)
        }
        AddOutcome::AddedLine => ApiResponse::accepted("Added to existing cart", summary),
    };
    Ok(response.into_response())
}

/// Remove units of a book. Removing the last unit drops the line.
pub async fn update_cart(
    user: RequireUser,
    State(carts): State<CartService>,
    ValidJson(request): ValidJson<CartLineRequest>,
) -> WebResult<Response> {
    let quantity = request.quantity()?;
    let (summary, outcome) = carts.remove(user.user_id, request.book, quantity).await?;
    Ok(match outcome {
        RemoveOutcome::Reduced => {
            ApiResponse::accepted("Book quantity reduced from the cart", summary).into_response()
        }
        RemoveOutcome::LineRemoved => {
            ApiResponse::accepted("Book successfully removed from the cart", summary)
                .into_response()
        }
        RemoveOutcome::CartEmptied => {
            ApiResponse::message(StatusCode::OK, "All items removed from the cart").into_response()
        }
    })
}
