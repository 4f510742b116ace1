//! Thin product endpoints. Catalog management proper lives elsewhere;
//! these exist so the order subsystem's collaborator can be exercised.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::auth::Identity;
use crate::api::response::ApiResponse;
use crate::api::AppState;
use crate::domain::Product;
use crate::error::{Error, Result};

/// GET /products
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let products = state.store.products().await?;
    Ok(Json(ApiResponse::ok("Products retrieved successfully", products)))
}

/// GET /products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = state.store.product(id).await?.ok_or(Error::ProductNotFound(id))?;
    Ok(Json(ApiResponse::ok("Product retrieved successfully", product)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub category: Option<String>,
    pub image: Option<String>,
}

/// POST /products (admin)
pub async fn create_product(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>)> {
    identity.require_admin()?;
    body.validate().map_err(|e| Error::Validation(e.to_string()))?;
    if body.price < Decimal::ZERO {
        return Err(Error::Validation("Price must not be negative".into()));
    }
    if body.stock < 0 {
        return Err(Error::Validation("Stock must not be negative".into()));
    }

    let mut product = Product::new(body.name, body.price, body.stock);
    product.description = body.description;
    product.category = body.category;
    product.image = body.image;
    state.store.insert_product(&product).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Product created successfully", product)),
    ))
}
