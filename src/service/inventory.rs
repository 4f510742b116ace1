//! Inventory guard: the sole gate between "items requested" and "items
//! reserved".

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::Product;
use crate::error::{Error, Result};
use crate::store::Store;

#[derive(Clone)]
pub struct InventoryGuard {
    store: Arc<dyn Store>,
}

impl InventoryGuard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Read-only validation: the product exists and current stock covers
    /// `quantity`. Returns the product snapshot used for pricing/display.
    pub async fn check(&self, product_id: Uuid, quantity: i32) -> Result<Product> {
        if quantity <= 0 {
            return Err(Error::InvalidQuantity(quantity));
        }
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or(Error::ProductNotFound(product_id))?;
        if product.stock < quantity {
            return Err(Error::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: quantity,
            });
        }
        Ok(product)
    }

    /// Atomically take `quantity` units of stock. The decrement is issued
    /// as an adjust-by-delta against the store, so concurrent reservations
    /// cannot jointly over-sell.
    pub async fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<Product> {
        if quantity <= 0 {
            return Err(Error::InvalidQuantity(quantity));
        }
        self.store.adjust_stock(product_id, -quantity).await
    }

    /// Give `quantity` units back (cart line removed or cleared without
    /// checkout).
    pub async fn release(&self, product_id: Uuid, quantity: i32) -> Result<Product> {
        if quantity <= 0 {
            return Err(Error::InvalidQuantity(quantity));
        }
        self.store.adjust_stock(product_id, quantity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    async fn guard_with(stock: i32) -> (InventoryGuard, Uuid, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let product = Product::new("Widget", Decimal::new(10, 0), stock);
        store.insert_product(&product).await.unwrap();
        (InventoryGuard::new(store.clone()), product.id, store)
    }

    #[tokio::test]
    async fn reserve_then_release_round_trip() {
        let (guard, id, store) = guard_with(5).await;
        guard.reserve(id, 3).await.unwrap();
        assert_eq!(store.product(id).await.unwrap().unwrap().stock, 2);
        guard.release(id, 3).await.unwrap();
        assert_eq!(store.product(id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn failed_reserve_leaves_stock_unchanged() {
        let (guard, id, store) = guard_with(2).await;
        assert!(matches!(
            guard.reserve(id, 3).await.unwrap_err(),
            Error::InsufficientStock { available: 2, requested: 3, .. }
        ));
        assert_eq!(store.product(id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn rejects_non_positive_quantities() {
        let (guard, id, _) = guard_with(2).await;
        assert!(matches!(guard.check(id, 0).await.unwrap_err(), Error::InvalidQuantity(0)));
        assert!(matches!(guard.reserve(id, -1).await.unwrap_err(), Error::InvalidQuantity(-1)));
        assert!(matches!(guard.release(id, 0).await.unwrap_err(), Error::InvalidQuantity(0)));
    }

    #[tokio::test]
    async fn check_reports_unknown_product() {
        let (guard, _, _) = guard_with(1).await;
        assert!(matches!(
            guard.check(Uuid::new_v4(), 1).await.unwrap_err(),
            Error::ProductNotFound(_)
        ));
    }
}
