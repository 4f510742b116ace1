//! Order/cart endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::auth::Identity;
use crate::api::response::ApiResponse;
use crate::api::AppState;
use crate::domain::{Bill, Order, OrderLine};
use crate::error::{Error, Result};
use crate::service::SelectedLine;

// Serialize: the length validator embeds the offending value in its
// error params.
#[derive(Debug, Serialize, Deserialize)]
pub struct LineRequest {
    pub product: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<LineRequest> for OrderLine {
    fn from(r: LineRequest) -> Self {
        OrderLine::new(r.product, r.quantity, r.price)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CartItemsRequest {
    #[validate(length(min = 1, message = "Items array is required"))]
    pub items: Vec<LineRequest>,
}

/// GET /orders — the caller's pending cart, as a 0-or-1 element list.
pub async fn list_cart(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let cart = state.carts.cart(identity.user_id).await?;
    Ok(Json(ApiResponse::ok(
        "Orders retrieved successfully",
        cart.into_iter().collect(),
    )))
}

/// GET /orders/completed
pub async fn completed_orders(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let orders = state.store.completed_orders(identity.user_id).await?;
    Ok(Json(ApiResponse::ok("Completed orders retrieved successfully", orders)))
}

/// GET /orders/:id — scoped to the owner unless the caller is admin.
pub async fn get_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = state.store.order(id).await?.ok_or(Error::OrderNotFound)?;
    if order.user_id != identity.user_id && !identity.is_admin() {
        // A non-owner learns nothing, not even that the id exists.
        return Err(Error::OrderNotFound);
    }
    Ok(Json(ApiResponse::ok("Order retrieved successfully", order)))
}

/// POST /orders — add/merge lines into the cart, reserving stock.
pub async fn add_to_cart(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CartItemsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>)> {
    body.validate().map_err(|e| Error::Validation(e.to_string()))?;
    let lines = body.items.into_iter().map(OrderLine::from).collect();
    let order = state.carts.add_or_update(identity.user_id, lines).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Order updated successfully", order)),
    ))
}

/// PUT /orders — replace the cart wholesale (non-reserving).
pub async fn replace_cart(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CartItemsRequest>,
) -> Result<Json<ApiResponse<Order>>> {
    let lines = body.items.into_iter().map(OrderLine::from).collect();
    let order = state.carts.replace(identity.user_id, lines).await?;
    Ok(Json(ApiResponse::ok("Cart updated successfully", order)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub product: Uuid,
    pub quantity: i32,
}

/// PUT /orders/:id — set one line's quantity within the pending order.
pub async fn update_line(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLineRequest>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = state
        .carts
        .update_line_quantity(identity.user_id, id, body.product, body.quantity)
        .await?;
    Ok(Json(ApiResponse::ok("Order item updated successfully", order)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestoreItem {
    pub product: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RestoreRequest {
    #[validate(length(min = 1, message = "Items array is required"))]
    pub items: Vec<RestoreItem>,
}

/// POST /orders/restore — release stock for removed cart items.
pub async fn restore_stock(
    State(state): State<AppState>,
    _identity: Identity,
    Json(body): Json<RestoreRequest>,
) -> Result<Json<ApiResponse<()>>> {
    body.validate().map_err(|e| Error::Validation(e.to_string()))?;
    let items = body.items.into_iter().map(|i| (i.product, i.quantity)).collect();
    state.carts.restore(items).await?;
    Ok(Json(ApiResponse::ok_message("Stock restored")))
}

#[derive(Debug, Deserialize)]
pub struct SelectedItemRequest {
    pub product: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub selected_items: Vec<SelectedItemRequest>,
    pub coupon_code: Option<String>,
}

/// POST /orders/checkout — finalize selected lines into a bill.
pub async fn checkout(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<ApiResponse<Bill>>> {
    let selected = body
        .selected_items
        .into_iter()
        .map(|s| SelectedLine { product_id: s.product, quantity: s.quantity })
        .collect();
    let bill = state
        .checkout
        .checkout(identity.user_id, selected, body.coupon_code)
        .await?;
    Ok(Json(ApiResponse::ok("Order placed successfully", bill)))
}
