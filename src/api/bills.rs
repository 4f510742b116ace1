//! Bill projections: read-side views over completed purchases, plus the
//! admin status progression.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::auth::Identity;
use crate::api::response::{ApiResponse, Paginated};
use crate::api::AppState;
use crate::domain::{Bill, BillStatus};
use crate::error::{Error, Result};
use crate::store::BillFilter;

#[derive(Debug, Deserialize)]
pub struct BillListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

fn build_filter(
    params: &BillListParams,
    user_id: Option<Uuid>,
    default_limit: u32,
) -> Result<BillFilter> {
    let status = params
        .status
        .as_deref()
        .map(|s| s.parse::<BillStatus>())
        .transpose()
        .map_err(|_| Error::Validation("Invalid status".into()))?;
    Ok(BillFilter {
        user_id,
        status,
        page: params.page.unwrap_or(1).max(1),
        limit: params.limit.unwrap_or(default_limit).clamp(1, 100),
    })
}

/// GET /bills/my
pub async fn my_bills(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<BillListParams>,
) -> Result<Json<ApiResponse<Paginated<Bill>>>> {
    let filter = build_filter(&params, Some(identity.user_id), 10)?;
    let (bills, total) = state.store.bills(&filter).await?;
    Ok(Json(ApiResponse::ok(
        "My bills retrieved successfully",
        Paginated::new(bills, filter.page, filter.limit, total),
    )))
}

/// GET /bills/my/:id — scoped to the owner unless the caller is admin.
pub async fn my_bill(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Bill>>> {
    let bill = state.store.bill(id).await?.ok_or(Error::BillNotFound)?;
    if bill.user_id != identity.user_id && !identity.is_admin() {
        return Err(Error::BillNotFound);
    }
    Ok(Json(ApiResponse::ok("Bill retrieved successfully", bill)))
}

/// GET /bills/all (admin)
pub async fn all_bills(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<BillListParams>,
) -> Result<Json<ApiResponse<Paginated<Bill>>>> {
    identity.require_admin()?;
    let filter = build_filter(&params, None, 20)?;
    let (bills, total) = state.store.bills(&filter).await?;
    Ok(Json(ApiResponse::ok(
        "Bills retrieved successfully",
        Paginated::new(bills, filter.page, filter.limit, total),
    )))
}

/// GET /bills/:id (admin)
pub async fn bill_by_id(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Bill>>> {
    identity.require_admin()?;
    let bill = state.store.bill(id).await?.ok_or(Error::BillNotFound)?;
    Ok(Json(ApiResponse::ok("Bill retrieved successfully", bill)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBillStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

/// PUT /bills/:id/status (admin) — advances the bill lifecycle:
/// paid -> processing -> shipped -> delivered, cancellable until
/// delivered. Line contents never change.
pub async fn update_bill_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBillStatusRequest>,
) -> Result<Json<ApiResponse<Bill>>> {
    identity.require_admin()?;
    let next = body
        .status
        .parse::<BillStatus>()
        .map_err(|_| Error::Validation("Invalid status".into()))?;

    let bill = state.store.bill(id).await?.ok_or(Error::BillNotFound)?;
    if !bill.status.can_transition_to(next) {
        return Err(Error::InvalidStatusTransition { from: bill.status, to: next });
    }

    let updated = state.store.set_bill_status(id, next, body.notes).await?;
    Ok(Json(ApiResponse::ok("Bill status updated successfully", updated)))
}
