//! Coupon management (admin) and public code lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::auth::Identity;
use crate::api::response::ApiResponse;
use crate::api::AppState;
use crate::domain::{Coupon, CouponCode, DiscountType};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    /// Generated randomly when absent.
    pub code: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub expiration_date: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn parse_code(code: Option<String>) -> Result<CouponCode> {
    match code {
        Some(code) => CouponCode::new(code).map_err(|e| Error::Validation(e.to_string())),
        None => Ok(CouponCode::random()),
    }
}

fn check_value(discount_type: DiscountType, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(Error::Validation("Discount value must not be negative".into()));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::from(100) {
        return Err(Error::Validation("Percentage discount cannot exceed 100".into()));
    }
    Ok(())
}

/// POST /coupons (admin)
pub async fn create_coupon(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Coupon>>)> {
    identity.require_admin()?;
    body.validate().map_err(|e| Error::Validation(e.to_string()))?;
    check_value(body.discount_type, body.discount_value)?;

    let coupon = Coupon::new(
        body.name,
        parse_code(body.code)?,
        body.discount_type,
        body.discount_value,
        body.expiration_date,
        body.is_active,
    );
    state.store.insert_coupon(&coupon).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Coupon created successfully", coupon)),
    ))
}

/// GET /coupons (admin)
pub async fn list_coupons(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ApiResponse<Vec<Coupon>>>> {
    identity.require_admin()?;
    let coupons = state.store.coupons().await?;
    Ok(Json(ApiResponse::ok("Coupons retrieved successfully", coupons)))
}

/// GET /coupons/code/:code (public)
pub async fn coupon_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Coupon>>> {
    let coupon = state.coupons.lookup(&code).await?.ok_or(Error::CouponNotFound)?;
    Ok(Json(ApiResponse::ok("Coupon retrieved successfully", coupon)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    pub code: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// PUT /coupons/:id (admin) — partial update.
pub async fn update_coupon(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCouponRequest>,
) -> Result<Json<ApiResponse<Coupon>>> {
    identity.require_admin()?;
    body.validate().map_err(|e| Error::Validation(e.to_string()))?;

    let mut coupon = state.store.coupon(id).await?.ok_or(Error::CouponNotFound)?;
    if let Some(name) = body.name {
        coupon.name = Some(name);
    }
    if let Some(code) = body.code {
        coupon.code = CouponCode::new(code).map_err(|e| Error::Validation(e.to_string()))?;
    }
    if let Some(discount_type) = body.discount_type {
        coupon.discount_type = discount_type;
    }
    if let Some(discount_value) = body.discount_value {
        coupon.discount_value = discount_value;
    }
    if let Some(expiration_date) = body.expiration_date {
        coupon.expiration_date = expiration_date;
    }
    if let Some(is_active) = body.is_active {
        coupon.is_active = is_active;
    }
    check_value(coupon.discount_type, coupon.discount_value)?;
    coupon.updated_at = Utc::now();

    state.store.update_coupon(&coupon).await?;
    Ok(Json(ApiResponse::ok("Coupon updated successfully", coupon)))
}

/// DELETE /coupons/:id (admin). Historical bills keep their recorded
/// discount and denormalized code; nothing cascades.
pub async fn delete_coupon(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    identity.require_admin()?;
    state.store.delete_coupon(id).await?;
    Ok(Json(ApiResponse::ok_message("Coupon deleted successfully")))
}
