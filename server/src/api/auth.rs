//! Account and session endpoints.
//!
//! - POST /api/auth/sign-up - Register a customer and email a verification code
//! - POST /api/auth/verify-account - Confirm the code
//! - POST /api/auth/login - Open a session (sets both cookies)
//! - POST /api/auth/refreshToken - Issue a new access token
//! - DELETE /api/auth/logout - Revoke the session and clear both cookies

use crate::auth::cookies::{ACCESS_COOKIE, REFRESH_COOKIE, removal_cookie, session_cookie};
use crate::server::state::AppState;
use crate::services::AuthService;
use crate::services::auth::{NewAccount, VerifyOutcome};
use axum::extract::State;
use axum::http::StatusCode;
use bookstore_core::types::{Address, Rank, User};
use bookstore_core::validation::{
    ValidationErrors, has_special_characters, is_strong_password, is_valid_email, is_valid_phone,
};
use bookstore_web::{ApiResponse, AppError, ValidJson, WebResult};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

const PASSWORD_RULE: &str = "Password must be at least 8 characters with a lowercase ,a uppercase,a number and a special character";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Sign-up body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SignUpRequest {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
    /// Password again
    pub confirm_password: String,
    /// Display name
    pub name: String,
    /// Phone number
    pub phone_number: String,
    /// Postal address
    pub address: Address,
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.add("email", "Invalid email address");
    } else if email.chars().count() > 40 {
        errors.add("email", "Email is too long");
    }
}

fn check_address_part(errors: &mut ValidationErrors, field: &str, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if value.chars().count() > 20 {
        errors.add(field, format!("{label} cannot be greater than 20"));
    } else if has_special_characters(value) {
        errors.add(field, "Invalid value provided");
    }
}

/// Field rules shared by sign-up and profile updates.
pub(crate) fn check_name(errors: &mut ValidationErrors, name: &str) {
    if name.trim().is_empty() {
        errors.add("name", "Name is required");
    } else if name.chars().count() > 50 {
        errors.add("name", "Name cannot be greater than 50");
    } else if has_special_characters(name) {
        errors.add("name", "Invalid value provided");
    }
}

pub(crate) fn check_address(errors: &mut ValidationErrors, address: &Address) {
    check_address_part(errors, "address.country", "Country", &address.country);
    check_address_part(errors, "address.city", "City", &address.city);
    check_address_part(errors, "address.area", "Area", &address.area);
    check_address_part(errors, "address.street", "Street", &address.street);
}

impl SignUpRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, &self.name);
        check_email(&mut errors, &self.email);
        errors.check(!is_strong_password(&self.password), "password", PASSWORD_RULE);
        errors.check(
            !is_strong_password(&self.confirm_password),
            "confirmPassword",
            PASSWORD_RULE,
        );
        errors.check(
            !is_valid_phone(&self.phone_number),
            "phoneNumber",
            "This is not a valid phone number",
        );
        check_address(&mut errors, &self.address);
        errors.into_result()
    }
}

/// Verify-account body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct VerifyAccountRequest {
    /// Email address
    pub email: String,
    /// Six-digit code from the email
    pub verification_code: String,
}

impl VerifyAccountRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, &self.email);
        if self.verification_code.is_empty() {
            errors.add("verificationCode", "Verification code is required");
        } else if !self.verification_code.chars().all(|c| c.is_ascii_digit()) {
            errors.add(
                "verificationCode",
                "Verification code must contain only number",
            );
        } else if self.verification_code.len() > 6 {
            errors.add("verificationCode", "Verification code is too long");
        }
        errors.into_result()
    }
}

/// Login body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

impl LoginRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, &self.email);
        errors.check(self.password.is_empty(), "password", "Password is required");
        errors.into_result()
    }
}

/// Login response data.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// The account
    pub user: User,
    /// 1 for administrators, 2 for customers
    pub rank: Rank,
}

fn cookie_value(cookies: &Cookies, name: &str) -> Option<String> {
    cookies.get(name).map(|c| c.value().to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a customer.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/auth/sign-up \
///   -H "Content-Type: application/json" \
///   -d '{
///     "email": "karim@example.com",
///     "password": "Secr3t!pass",
///     "confirmPassword": "Secr3t!pass",
///     "name": "Karim Ahmed",
///     "phoneNumber": "01712345678",
///     "address": {"country": "bd", "city": "Dhaka", "area": "Gulshan", "street": "Road 11"}
///   }'
/// ```
pub async fn sign_up(
    State(auth): State<AuthService>,
    ValidJson(request): ValidJson<SignUpRequest>,
) -> WebResult<ApiResponse<User>> {
    request.validate()?;
    if request.password != request.confirm_password {
        return Err(AppError::bad_request(
            "Password and confirm password should be same",
        ));
    }

    let user = auth
        .sign_up(NewAccount {
            email: request.email,
            password: request.password,
            name: request.name,
            phone_number: request.phone_number,
            address: request.address,
        })
        .await?;
    Ok(ApiResponse::created("Successfully signed up", user))
}

/// Confirm an account with its emailed code.
///
/// A wrong code is answered with 200 and a message, not an error.
pub async fn verify_account(
    State(auth): State<AuthService>,
    ValidJson(request): ValidJson<VerifyAccountRequest>,
) -> WebResult<ApiResponse<()>> {
    request.validate()?;
    let message = match auth
        .verify_account(&request.email, &request.verification_code)
        .await?
    {
        VerifyOutcome::Verified => "Account verified successfully",
        VerifyOutcome::WrongCode => "Wrong verification code provided",
    };
    Ok(ApiResponse::message(StatusCode::OK, message))
}

/// Open a session.
///
/// Sets the `accessToken` (1 hour) and `refreshToken` (365 days) cookies.
pub async fn login(
    State(auth): State<AuthService>,
    State(state): State<AppState>,
    cookies: Cookies,
    ValidJson(request): ValidJson<LoginRequest>,
) -> WebResult<ApiResponse<LoginResponse>> {
    request.validate()?;
    let outcome = auth.login(&request.email, request.password).await?;

    let secure = state.cookies.secure;
    cookies.add(session_cookie(ACCESS_COOKIE, &outcome.tokens.access, secure));
    cookies.add(session_cookie(REFRESH_COOKIE, &outcome.tokens.refresh, secure));

    Ok(ApiResponse::ok(
        "Successfully logged in",
        LoginResponse {
            user: outcome.user,
            rank: outcome.rank,
        },
    ))
}

/// Exchange the refresh cookie for a new access cookie.
pub async fn refresh_token(
    State(auth): State<AuthService>,
    State(state): State<AppState>,
    cookies: Cookies,
) -> WebResult<ApiResponse<()>> {
    let issued = auth.refresh(cookie_value(&cookies, REFRESH_COOKIE)).await?;
    cookies.add(session_cookie(ACCESS_COOKIE, &issued, state.cookies.secure));
    Ok(ApiResponse::message(StatusCode::OK, "Access token generated"))
}

/// Revoke whichever session cookies are present and clear both.
pub async fn logout(
    State(auth): State<AuthService>,
    cookies: Cookies,
) -> WebResult<ApiResponse<()>> {
    auth.logout(
        cookie_value(&cookies, ACCESS_COOKIE),
        cookie_value(&cookies, REFRESH_COOKIE),
    )
    .await?;
    cookies.remove(removal_cookie(ACCESS_COOKIE));
    cookies.remove(removal_cookie(REFRESH_COOKIE));
    Ok(ApiResponse::message(StatusCode::OK, "Logged out successfully"))
}
