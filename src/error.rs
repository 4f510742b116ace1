//! Error taxonomy and HTTP mapping.
//!
//! Every failure surfaces through [`Error`]; handlers return
//! `Result<_, Error>` and the `IntoResponse` impl renders the standard
//! `{ success, message, errors? }` envelope. Checkout validation failures
//! are batched into `CheckoutRejected` so the client can fix every
//! problem in one round trip; everything else fails fast.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

use crate::api::response::ApiResponse;
use crate::domain::BillStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Coupon not found")]
    CouponNotFound,

    #[error("Bill not found")]
    BillNotFound,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Insufficient stock for product {product}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("No pending order for this user")]
    NoPendingOrder,

    #[error("Invalid or expired coupon code: {0}")]
    InvalidOrExpiredCoupon(String),

    #[error("Some items could not be checked out")]
    CheckoutRejected(Vec<String>),

    #[error("Cannot change bill status from {from} to {to}")]
    InvalidStatusTransition { from: BillStatus, to: BillStatus },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin privilege required")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidQuantity(_)
            | Self::InsufficientStock { .. }
            | Self::InvalidOrExpiredCoupon(_)
            | Self::CheckoutRejected(_)
            | Self::InvalidStatusTransition { .. } => StatusCode::BAD_REQUEST,
            Self::ProductNotFound(_)
            | Self::OrderNotFound
            | Self::CouponNotFound
            | Self::BillNotFound
            | Self::NoPendingOrder => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::CheckoutRejected(errors) => {
                ApiResponse::<()>::failure_with_errors(self.to_string(), errors.clone())
            }
            Self::Database(e) => {
                // Internal details go to the log, not the client.
                tracing::error!(error = %e, "database error");
                ApiResponse::<()>::failure("Internal server error")
            }
            _ => ApiResponse::<()>::failure(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
