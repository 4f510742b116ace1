//! HTTP surface: router, shared state, response envelope, identity.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::{CartService, CheckoutService, CouponEvaluator};
use crate::store::Store;

pub mod auth;
pub mod bills;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod response;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub coupons: CouponEvaluator,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            checkout: CheckoutService::new(store.clone()),
            coupons: CouponEvaluator::new(store.clone()),
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "shophouse"})) }),
        )
        .route(
            "/orders",
            get(orders::list_cart).post(orders::add_to_cart).put(orders::replace_cart),
        )
        .route("/orders/completed", get(orders::completed_orders))
        .route("/orders/restore", post(orders::restore_stock))
        .route("/orders/checkout", post(orders::checkout))
        .route("/orders/:id", get(orders::get_order).put(orders::update_line))
        .route("/coupons", get(coupons::list_coupons).post(coupons::create_coupon))
        .route("/coupons/code/:code", get(coupons::coupon_by_code))
        .route(
            "/coupons/:id",
            put(coupons::update_coupon).delete(coupons::delete_coupon),
        )
        .route("/bills/my", get(bills::my_bills))
        .route("/bills/my/:id", get(bills::my_bill))
        .route("/bills/all", get(bills::all_bills))
        .route("/bills/:id", get(bills::bill_by_id))
        .route("/bills/:id/status", put(bills::update_bill_status))
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/:id", get(products::get_product))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
