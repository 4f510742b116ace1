//! Persistence seam.
//!
//! The services speak to a [`Store`] trait so the same cart/checkout
//! logic runs against Postgres in production and the in-memory backend in
//! tests and `DATABASE_URL`-less development. Two guarantees live at this
//! layer rather than in application code:
//!
//! - stock changes are atomic adjust-by-delta operations that refuse to
//!   drive stock negative;
//! - at most one `pending` order exists per user.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Bill, BillStatus, Coupon, Order, Product};
use crate::error::Result;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One stock decrement inside a checkout commit. The product name rides
/// along so a failed conditional decrement can report which product ran
/// short.
#[derive(Debug, Clone)]
pub struct StockDecrement {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
}

/// Everything checkout writes, committed as one logical unit: the stock
/// decrements, the new completed order, its bill, and the rewritten cart.
#[derive(Debug, Clone)]
pub struct CheckoutCommit {
    pub decrements: Vec<StockDecrement>,
    pub completed: Order,
    pub bill: Bill,
    pub remaining_cart: Order,
}

#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<BillStatus>,
    pub page: u32,
    pub limit: u32,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Products
    async fn insert_product(&self, product: &Product) -> Result<()>;
    async fn product(&self, id: Uuid) -> Result<Option<Product>>;
    async fn products(&self) -> Result<Vec<Product>>;
    /// Atomically adjust stock by `delta` (negative to reserve, positive
    /// to release). Fails with `InsufficientStock` if the result would be
    /// negative, leaving stock unchanged. Returns the adjusted product.
    async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Product>;

    // Orders
    async fn pending_order(&self, user_id: Uuid) -> Result<Option<Order>>;
    async fn order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn completed_orders(&self, user_id: Uuid) -> Result<Vec<Order>>;
    /// Insert or update an order. Rejects a second `pending` order for
    /// the same user with `Conflict`.
    async fn save_order(&self, order: &Order) -> Result<()>;

    /// Apply a checkout as one unit. No partial effects remain if any
    /// decrement cannot be satisfied.
    async fn commit_checkout(&self, commit: CheckoutCommit) -> Result<()>;

    // Coupons
    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()>;
    async fn coupons(&self) -> Result<Vec<Coupon>>;
    async fn coupon(&self, id: Uuid) -> Result<Option<Coupon>>;
    /// Lookup by already-normalized (uppercase) code.
    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>>;
    async fn update_coupon(&self, coupon: &Coupon) -> Result<()>;
    async fn delete_coupon(&self, id: Uuid) -> Result<()>;

    // Bills
    async fn bills(&self, filter: &BillFilter) -> Result<(Vec<Bill>, i64)>;
    async fn bill(&self, id: Uuid) -> Result<Option<Bill>>;
    async fn set_bill_status(
        &self,
        id: Uuid,
        status: BillStatus,
        notes: Option<String>,
    ) -> Result<Bill>;
}
