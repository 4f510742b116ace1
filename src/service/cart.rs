//! Cart aggregator: owns the single pending order per user.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Order, OrderLine};
use crate::error::{Error, Result};
use crate::service::inventory::InventoryGuard;
use crate::store::Store;

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
    guard: InventoryGuard,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let guard = InventoryGuard::new(store.clone());
        Self { store, guard }
    }

    pub async fn cart(&self, user_id: Uuid) -> Result<Option<Order>> {
        self.store.pending_order(user_id).await
    }

    /// Add or merge lines into the user's cart, reserving stock for the
    /// newly requested quantities. Repeated calls are additive: the same
    /// line twice doubles the cart quantity and the reservation.
    ///
    /// The whole batch is pre-checked (read-only) against the total
    /// requested quantity per product before anything is reserved; a
    /// failing line aborts the batch with nothing committed.
    pub async fn add_or_update(&self, user_id: Uuid, requested: Vec<OrderLine>) -> Result<Order> {
        if requested.is_empty() {
            return Err(Error::Validation("At least one item is required".into()));
        }
        for line in &requested {
            if line.price.is_sign_negative() {
                return Err(Error::Validation(format!(
                    "Negative price for product {}",
                    line.product_id
                )));
            }
        }

        // Pre-check against the total requested per product so a batch
        // that mentions a product twice is validated as one demand.
        let mut totals: HashMap<Uuid, i32> = HashMap::new();
        for line in &requested {
            if line.quantity <= 0 {
                return Err(Error::InvalidQuantity(line.quantity));
            }
            *totals.entry(line.product_id).or_insert(0) += line.quantity;
        }
        for (product_id, quantity) in &totals {
            self.guard.check(*product_id, *quantity).await?;
        }

        let mut cart = match self.store.pending_order(user_id).await? {
            Some(cart) => cart,
            None => Order::new_cart(user_id),
        };

        // Merge each line and reserve only its newly added quantity.
        for line in requested {
            let (product_id, quantity) = (line.product_id, line.quantity);
            cart.merge_line(line);
            self.guard.reserve(product_id, quantity).await?;
        }

        self.store.save_order(&cart).await?;
        Ok(cart)
    }

    /// Overwrite the cart's line list without touching stock. Pure cart
    /// edit: callers reconcile stock separately via [`Self::restore`] and
    /// [`Self::add_or_update`].
    pub async fn replace(&self, user_id: Uuid, lines: Vec<OrderLine>) -> Result<Order> {
        let mut cart = match self.store.pending_order(user_id).await? {
            Some(cart) => cart,
            None => Order::new_cart(user_id),
        };
        cart.replace_lines(lines);
        self.store.save_order(&cart).await?;
        Ok(cart)
    }

    /// Set one line's quantity within the user's pending order. Validates
    /// live stock for the new quantity but, like [`Self::replace`], does
    /// not itself adjust stock.
    pub async fn update_line_quantity(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Order> {
        if quantity < 1 {
            return Err(Error::InvalidQuantity(quantity));
        }
        let mut cart = match self.store.order(order_id).await? {
            Some(order) if order.user_id == user_id && order.is_cart() => order,
            _ => return Err(Error::OrderNotFound),
        };
        self.guard.check(product_id, quantity).await?;
        cart.set_line_quantity(product_id, quantity)
            .map_err(|_| Error::Validation(format!("Product {product_id} is not in the cart")))?;
        self.store.save_order(&cart).await?;
        Ok(cart)
    }

    /// Release stock for items removed from the cart. Unknown products
    /// and non-positive quantities are skipped rather than failing the
    /// batch.
    pub async fn restore(&self, items: Vec<(Uuid, i32)>) -> Result<()> {
        for (product_id, quantity) in items {
            if quantity <= 0 {
                continue;
            }
            match self.guard.release(product_id, quantity).await {
                Ok(_) => {}
                Err(Error::ProductNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Product;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<MemoryStore>,
        carts: CartService,
        user: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let carts = CartService::new(store.clone());
        Fixture { store, carts, user: Uuid::new_v4() }
    }

    impl Fixture {
        async fn seed_product(&self, stock: i32) -> Product {
            let product = Product::new("Widget", Decimal::new(10, 0), stock);
            self.store.insert_product(&product).await.unwrap();
            product
        }

        async fn stock_of(&self, id: Uuid) -> i32 {
            self.store.product(id).await.unwrap().unwrap().stock
        }
    }

    fn line(product: &Product, qty: i32) -> OrderLine {
        OrderLine::new(product.id, qty, product.price)
    }

    #[tokio::test]
    async fn repeated_adds_merge_and_reserve_cumulatively() {
        let fx = fixture().await;
        let product = fx.seed_product(10).await;

        fx.carts.add_or_update(fx.user, vec![line(&product, 2)]).await.unwrap();
        let cart = fx.carts.add_or_update(fx.user, vec![line(&product, 3)]).await.unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(fx.stock_of(product.id).await, 5);
    }

    #[tokio::test]
    async fn at_most_one_pending_order_per_user() {
        let fx = fixture().await;
        let product = fx.seed_product(10).await;

        fx.carts.add_or_update(fx.user, vec![line(&product, 1)]).await.unwrap();
        fx.carts.add_or_update(fx.user, vec![line(&product, 1)]).await.unwrap();
        fx.carts.replace(fx.user, vec![]).await.unwrap();

        // Still exactly one pending order after a sequence of operations.
        assert!(fx.store.pending_order(fx.user).await.unwrap().is_some());
        let other_user_cart = fx.store.pending_order(Uuid::new_v4()).await.unwrap();
        assert!(other_user_cart.is_none());
    }

    #[tokio::test]
    async fn batch_precheck_aborts_before_any_reservation() {
        let fx = fixture().await;
        let a = fx.seed_product(10).await;
        let b = fx.seed_product(1).await;

        let err = fx
            .carts
            .add_or_update(fx.user, vec![line(&a, 2), line(&b, 5)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { .. }));

        // Nothing was reserved for the batch, including the valid line.
        assert_eq!(fx.stock_of(a.id).await, 10);
        assert_eq!(fx.stock_of(b.id).await, 1);
        assert!(fx.store.pending_order(fx.user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn precheck_sums_duplicate_products_in_one_batch() {
        let fx = fixture().await;
        let product = fx.seed_product(5).await;

        let err = fx
            .carts
            .add_or_update(fx.user, vec![line(&product, 3), line(&product, 3)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { requested: 6, .. }));
        assert_eq!(fx.stock_of(product.id).await, 5);
    }

    #[tokio::test]
    async fn replace_does_not_touch_stock() {
        let fx = fixture().await;
        let product = fx.seed_product(10).await;
        fx.carts.add_or_update(fx.user, vec![line(&product, 4)]).await.unwrap();

        let cart = fx.carts.replace(fx.user, vec![line(&product, 1)]).await.unwrap();
        assert_eq!(cart.lines[0].quantity, 1);
        // Stock still reflects the original reservation.
        assert_eq!(fx.stock_of(product.id).await, 6);
    }

    #[tokio::test]
    async fn restore_releases_and_skips_unknown() {
        let fx = fixture().await;
        let product = fx.seed_product(10).await;
        fx.carts.add_or_update(fx.user, vec![line(&product, 4)]).await.unwrap();

        fx.carts
            .restore(vec![(product.id, 3), (Uuid::new_v4(), 2), (product.id, 0)])
            .await
            .unwrap();
        assert_eq!(fx.stock_of(product.id).await, 9);
    }

    #[tokio::test]
    async fn update_line_quantity_checks_ownership_and_stock() {
        let fx = fixture().await;
        let product = fx.seed_product(10).await;
        let cart = fx.carts.add_or_update(fx.user, vec![line(&product, 2)]).await.unwrap();

        let updated = fx
            .carts
            .update_line_quantity(fx.user, cart.id, product.id, 5)
            .await
            .unwrap();
        assert_eq!(updated.lines[0].quantity, 5);

        // Someone else's cart is invisible.
        assert!(matches!(
            fx.carts
                .update_line_quantity(Uuid::new_v4(), cart.id, product.id, 1)
                .await
                .unwrap_err(),
            Error::OrderNotFound
        ));
        // Quantity must be at least 1.
        assert!(matches!(
            fx.carts
                .update_line_quantity(fx.user, cart.id, product.id, 0)
                .await
                .unwrap_err(),
            Error::InvalidQuantity(0)
        ));
    }
}
