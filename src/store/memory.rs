//! In-memory store: the test double and the `DATABASE_URL`-less dev mode.
//!
//! A single `RwLock` over all collections makes every operation — in
//! particular `commit_checkout` — atomic with respect to concurrent
//! requests, which is strictly stronger than the document-level atomicity
//! the services rely on.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Bill, BillStatus, Coupon, Order, OrderStatus, Product};
use crate::error::{Error, Result};

use super::{BillFilter, CheckoutCommit, Store};

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    coupons: HashMap<Uuid, Coupon>,
    bills: HashMap<Uuid, Bill>,
}

impl Inner {
    fn adjust_stock(&mut self, id: Uuid, delta: i32) -> Result<Product> {
        let product = self.products.get_mut(&id).ok_or(Error::ProductNotFound(id))?;
        let next = product.stock + delta;
        if next < 0 {
            return Err(Error::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: -delta,
            });
        }
        product.stock = next;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn products(&self) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut all: Vec<_> = inner.products.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Product> {
        self.inner.write().await.adjust_stock(id, delta)
    }

    async fn pending_order(&self, user_id: Uuid) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .find(|o| o.user_id == user_id && o.status == OrderStatus::Pending)
            .cloned())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn completed_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<_> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.status == OrderStatus::Completed)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn save_order(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        if order.status == OrderStatus::Pending {
            let duplicate = inner
                .orders
                .values()
                .any(|o| o.user_id == order.user_id && o.status == OrderStatus::Pending && o.id != order.id);
            if duplicate {
                return Err(Error::Conflict("user already has a pending order".into()));
            }
        }
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn commit_checkout(&self, commit: CheckoutCommit) -> Result<()> {
        let mut inner = self.inner.write().await;

        // All-or-nothing: verify every decrement before applying any.
        for dec in &commit.decrements {
            let product = inner
                .products
                .get(&dec.product_id)
                .ok_or(Error::ProductNotFound(dec.product_id))?;
            if product.stock < dec.quantity {
                return Err(Error::InsufficientStock {
                    product: dec.product_name.clone(),
                    available: product.stock,
                    requested: dec.quantity,
                });
            }
        }
        for dec in &commit.decrements {
            inner.adjust_stock(dec.product_id, -dec.quantity)?;
        }
        inner.orders.insert(commit.completed.id, commit.completed);
        inner.orders.insert(commit.remaining_cart.id, commit.remaining_cart);
        inner.bills.insert(commit.bill.id, commit.bill);
        Ok(())
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.coupons.values().any(|c| c.code == coupon.code) {
            return Err(Error::Conflict(format!(
                "coupon code {} already exists",
                coupon.code
            )));
        }
        inner.coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn coupons(&self) -> Result<Vec<Coupon>> {
        let inner = self.inner.read().await;
        let mut all: Vec<_> = inner.coupons.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn coupon(&self, id: Uuid) -> Result<Option<Coupon>> {
        Ok(self.inner.read().await.coupons.get(&id).cloned())
    }

    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let inner = self.inner.read().await;
        Ok(inner.coupons.values().find(|c| c.code.as_str() == code).cloned())
    }

    async fn update_coupon(&self, coupon: &Coupon) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.coupons.contains_key(&coupon.id) {
            return Err(Error::CouponNotFound);
        }
        let taken = inner
            .coupons
            .values()
            .any(|c| c.code == coupon.code && c.id != coupon.id);
        if taken {
            return Err(Error::Conflict(format!(
                "coupon code {} already exists",
                coupon.code
            )));
        }
        inner.coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn delete_coupon(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.coupons.remove(&id).map(|_| ()).ok_or(Error::CouponNotFound)
    }

    async fn bills(&self, filter: &BillFilter) -> Result<(Vec<Bill>, i64)> {
        let inner = self.inner.read().await;
        let mut matching: Vec<_> = inner
            .bills
            .values()
            .filter(|b| filter.user_id.map_or(true, |u| b.user_id == u))
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.bill_date.cmp(&a.bill_date));
        let total = matching.len() as i64;
        // Widen before multiplying; page is client-controlled and unbounded.
        let start = u64::from(filter.page.saturating_sub(1)) * u64::from(filter.limit);
        let page: Vec<_> = matching
            .into_iter()
            .skip(start as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn bill(&self, id: Uuid) -> Result<Option<Bill>> {
        Ok(self.inner.read().await.bills.get(&id).cloned())
    }

    async fn set_bill_status(
        &self,
        id: Uuid,
        status: BillStatus,
        notes: Option<String>,
    ) -> Result<Bill> {
        let mut inner = self.inner.write().await;
        let bill = inner.bills.get_mut(&id).ok_or(Error::BillNotFound)?;
        bill.status = status;
        if let Some(notes) = notes {
            bill.notes = Some(notes);
        }
        Ok(bill.clone())
    }
}
