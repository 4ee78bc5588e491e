//! Router configuration for the bookstore.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use bookstore_web::{ApiResponse, request_context};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

/// Render the Prometheus exposition, or 404 when metrics are disabled.
async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn unknown_route() -> ApiResponse<()> {
    ApiResponse::message(StatusCode::BAD_GATEWAY, "Can't find the route")
}

/// Build the complete Axum router.
///
/// Configures:
/// - Health, readiness and metrics at the root
/// - Every API area under `/api`
/// - A 502 envelope for unknown routes
/// - Cookie, trace and request context layers
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/sign-up", post(api::sign_up))
        .route("/verify-account", post(api::verify_account))
        .route("/login", post(api::login))
        .route("/refreshToken", post(api::refresh_token))
        .route("/logout", delete(api::logout));

    let book_routes = Router::new()
        .route("/all", get(api::all_books))
        .route("/details/:book_id", get(api::book_details))
        .route("/create", post(api::create_book))
        .route("/update/:book_id", patch(api::update_book))
        .route("/delete/:book_id", delete(api::delete_book));

    let review_routes = Router::new()
        .route("/details/:book_id", get(api::book_reviews))
        .route("/create/:book_id", post(api::create_review))
        .route("/update/:book_id", patch(api::update_review))
        .route("/delete/:book_id", delete(api::delete_review));

    let discount_routes = Router::new()
        .route("/all", get(api::all_discounts))
        .route("/create", post(api::create_discount))
        .route("/update/:discount_id", patch(api::update_discount))
        .route("/delete/:discount_id", delete(api::delete_discount));

    let cart_routes = Router::new()
        .route("/cartByUser", get(api::get_cart))
        .route("/create", post(api::add_to_cart))
        .route("/update", patch(api::update_cart));

    let transaction_routes = Router::new()
        .route("/create", post(api::checkout))
        .route("/details", get(api::my_transactions))
        .route("/all", get(api::all_transactions));

    let user_routes = Router::new()
        .route("/balance", get(api::balance))
        .route("/add-balance", post(api::add_balance))
        .route("/all", get(api::all_users))
        .route("/update/:user_id", patch(api::update_user))
        .route("/delete/:user_id", delete(api::delete_user));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/books", book_routes)
        .nest("/review", review_routes)
        .nest("/discount-price", discount_routes)
        .nest("/cart", cart_routes)
        .nest("/transaction", transaction_routes)
        .nest("/user", user_routes);

    Router::new()
        // Health checks and metrics (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api", api_routes)
        .fallback(unknown_route)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_context))
        .with_state(state)
}
