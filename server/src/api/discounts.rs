//! Discount administration endpoints. All require an administrator.
//!
//! - GET /api/discount-price/all - Every discount record
//! - POST /api/discount-price/create - Create a discount
//! - PATCH /api/discount-price/update/:discountId - Merge changes into a discount
//! - DELETE /api/discount-price/delete/:discountId - Delete a discount

use crate::auth::middleware::RequireAdmin;
use crate::services::DiscountService;
use crate::services::discount::{DiscountChanges, DiscountDraft};
use axum::extract::State;
use axum::http::StatusCode;
use bookstore_core::types::{BookId, Discount, DiscountId};
use bookstore_core::{DateTime, Utc};
use bookstore_web::{ApiResponse, ValidJson, ValidPath, WebResult};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

// ============================================================================
// Request/Response Types
// ============================================================================

/// RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
}

fn optional_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
        })
        .transpose()
}

/// Percentages outside `u8` land on 0 so the range rule reports them.
fn percentage(raw: i64) -> u8 {
    u8::try_from(raw).unwrap_or(0)
}

/// Create body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateDiscountRequest {
    /// Whole percentage off, `5..=40`
    pub discount_percentage: i64,
    /// Books covered
    #[serde(rename = "bookId")]
    pub book_ids: Vec<BookId>,
    /// Window start
    #[serde(deserialize_with = "date")]
    pub start_date: DateTime<Utc>,
    /// Window end
    #[serde(deserialize_with = "date")]
    pub end_date: DateTime<Utc>,
    /// Country codes (`BD`, `US`, `IND`, any case)
    #[serde(rename = "country")]
    pub countries: Vec<String>,
}

/// Update body. Every field is optional; countries are added, never removed.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateDiscountRequest {
    /// New percentage
    pub discount_percentage: Option<i64>,
    /// Replacement book list
    #[serde(rename = "bookId")]
    pub book_ids: Option<Vec<BookId>>,
    /// New window start
    #[serde(default, deserialize_with = "optional_date")]
    pub start_date: Option<DateTime<Utc>>,
    /// New window end
    #[serde(default, deserialize_with = "optional_date")]
    pub end_date: Option<DateTime<Utc>>,
    /// Country codes to add
    #[serde(rename = "country")]
    pub countries: Option<Vec<String>>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Every discount record.
pub async fn all_discounts(
    _admin: RequireAdmin,
    State(discounts): State<DiscountService>,
) -> WebResult<ApiResponse<Vec<Discount>>> {
    let all = discounts.list().await?;
    if all.is_empty() {
        return Ok(ApiResponse::ok("No data found", all));
    }
    Ok(ApiResponse::ok("Successfully get all the data", all))
}

/// Create a discount.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/discount-price/create \
///   --cookie "accessToken=<admin token>" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "discountPercentage": 20,
///     "bookId": ["<bookId>"],
///     "startDate": "2025-03-01",
///     "endDate": "2025-03-04",
///     "country": ["bd", "us"]
///   }'
/// ```
pub async fn create_discount(
    _admin: RequireAdmin,
    State(discounts): State<DiscountService>,
    ValidJson(request): ValidJson<CreateDiscountRequest>,
) -> WebResult<ApiResponse<Discount>> {
    let created = discounts
        .create(DiscountDraft {
            discount_percentage: percentage(request.discount_percentage),
            book_ids: request.book_ids,
            start_date: request.start_date,
            end_date: request.end_date,
            countries: request.countries,
        })
        .await?;
    Ok(ApiResponse::created("Discount added successfully", created))
}

/// Merge changes into a discount.
pub async fn update_discount(
    _admin: RequireAdmin,
    State(discounts): State<DiscountService>,
    ValidPath(discount_id): ValidPath<DiscountId>,
    ValidJson(request): ValidJson<UpdateDiscountRequest>,
) -> WebResult<ApiResponse<Discount>> {
    let updated = discounts
        .update(
            discount_id,
            DiscountChanges {
                discount_percentage: request.discount_percentage.map(percentage),
                book_ids: request.book_ids,
                start_date: request.start_date,
                end_date: request.end_date,
                countries: request.countries,
            },
        )
        .await?;
    Ok(ApiResponse::accepted("Discount updated successfully", updated))
}

/// Delete a discount.
pub async fn delete_discount(
    _admin: RequireAdmin,
    State(discounts): State<DiscountService>,
    ValidPath(discount_id): ValidPath<DiscountId>,
) -> WebResult<ApiResponse<()>> {
    discounts.delete(discount_id).await?;
    Ok(ApiResponse::message(StatusCode::OK, "Deleted Successfully"))
}
