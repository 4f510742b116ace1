//! Checkout splitter: consumes a subset of cart lines plus an optional
//! coupon code, produces a finalized bill, and rewrites the remaining
//! cart.
//!
//! Validation is strictly two-phase: every selected line is checked
//! (live stock, cart membership, cart quantity) and all failures are
//! collected into one batch error before any stock or order mutation.
//! The mutation itself is a single `commit_checkout` store call.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Bill, BillLine, Order, SplitError};
use crate::error::{Error, Result};
use crate::service::coupon::CouponEvaluator;
use crate::service::inventory::InventoryGuard;
use crate::store::{CheckoutCommit, StockDecrement, Store};

/// One line of the checkout selection: which product, how many. The
/// price always comes from the captured cart line, never the client.
#[derive(Debug, Clone)]
pub struct SelectedLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Store>,
    guard: InventoryGuard,
    coupons: CouponEvaluator,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let guard = InventoryGuard::new(store.clone());
        let coupons = CouponEvaluator::new(store.clone());
        Self { store, guard, coupons }
    }

    pub async fn checkout(
        &self,
        user_id: Uuid,
        selected: Vec<SelectedLine>,
        coupon_code: Option<String>,
    ) -> Result<Bill> {
        if selected.is_empty() {
            return Err(Error::Validation("No items selected for checkout".into()));
        }
        let pending = self
            .store
            .pending_order(user_id)
            .await?
            .ok_or(Error::NoPendingOrder)?;

        // Phase 1: validate everything, collecting all failures so the
        // client can correct them in one round trip.
        let mut errors = Vec::new();
        let mut remaining = pending.clone();
        let mut taken = Vec::new();
        let mut seen = HashSet::new();

        for sel in &selected {
            if !seen.insert(sel.product_id) {
                errors.push(format!("Product {} selected more than once", sel.product_id));
                continue;
            }
            // Live stock re-check: stock may have moved since the line
            // entered the cart.
            let product = match self.guard.check(sel.product_id, sel.quantity).await {
                Ok(product) => product,
                Err(Error::Database(e)) => return Err(Error::Database(e)),
                Err(e) => {
                    errors.push(e.to_string());
                    continue;
                }
            };
            match remaining.split_off(sel.product_id, sel.quantity) {
                Ok(line) => taken.push((line, product.name)),
                Err(SplitError::NotInCart) => {
                    errors.push(format!("Product {} is not in the cart", product.name));
                }
                Err(SplitError::ExceedsCart { in_cart, requested }) => {
                    errors.push(format!(
                        "Product {}: only {in_cart} in the cart, requested {requested}",
                        product.name
                    ));
                }
            }
        }

        if !errors.is_empty() {
            return Err(Error::CheckoutRejected(errors));
        }

        let subtotal: Decimal = taken.iter().map(|(line, _)| line.subtotal()).sum();

        let (total, coupon_id, coupon_code) = match coupon_code.filter(|c| !c.trim().is_empty()) {
            Some(code) => {
                let coupon = self.coupons.redeemable(&code, Utc::now()).await?;
                (coupon.apply(subtotal), Some(coupon.id), Some(coupon.code.to_string()))
            }
            None => (subtotal, None, None),
        };

        let lines: Vec<_> = taken.iter().map(|(line, _)| line.clone()).collect();
        let completed = Order::completed(user_id, lines, total, coupon_id);

        let bill_lines: Vec<_> = taken
            .iter()
            .map(|(line, name)| BillLine::from_order_line(line, name.clone()))
            .collect();
        let bill = Bill::new(
            user_id,
            completed.id,
            bill_lines,
            subtotal,
            total,
            coupon_id,
            coupon_code,
        );

        let decrements = taken
            .iter()
            .map(|(line, name)| StockDecrement {
                product_id: line.product_id,
                product_name: name.clone(),
                quantity: line.quantity,
            })
            .collect();

        // Phase 2: one logical unit — stock decrements, the completed
        // order, its bill, and the rewritten cart.
        self.store
            .commit_checkout(CheckoutCommit {
                decrements,
                completed,
                bill: bill.clone(),
                remaining_cart: remaining,
            })
            .await?;

        Ok(bill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coupon, CouponCode, DiscountType, OrderLine, OrderStatus, Product};
    use crate::service::cart::CartService;
    use crate::store::MemoryStore;
    use chrono::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        carts: CartService,
        checkout: CheckoutService,
        user: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            carts: CartService::new(store.clone()),
            checkout: CheckoutService::new(store.clone()),
            store,
            user: Uuid::new_v4(),
        }
    }

    impl Fixture {
        async fn seed_product(&self, name: &str, price: i64, stock: i32) -> Product {
            let mut product = Product::new(name, Decimal::new(price, 0), stock);
            product.description = Some(format!("{name} description"));
            self.store.insert_product(&product).await.unwrap();
            product
        }

        async fn add_to_cart(&self, product: &Product, qty: i32) {
            self.carts
                .add_or_update(self.user, vec![OrderLine::new(product.id, qty, product.price)])
                .await
                .unwrap();
        }

        async fn stock_of(&self, id: Uuid) -> i32 {
            self.store.product(id).await.unwrap().unwrap().stock
        }

        fn select(&self, product: &Product, qty: i32) -> SelectedLine {
            SelectedLine { product_id: product.id, quantity: qty }
        }
    }

    #[tokio::test]
    async fn partial_checkout_conserves_quantities() {
        let fx = fixture().await;
        let product = fx.seed_product("Widget", 10, 20).await;
        fx.add_to_cart(&product, 5).await;
        assert_eq!(fx.stock_of(product.id).await, 15);

        let bill = fx
            .checkout
            .checkout(fx.user, vec![fx.select(&product, 3)], None)
            .await
            .unwrap();

        // Bill: one line, qty 3, subtotal 30.
        assert_eq!(bill.lines.len(), 1);
        assert_eq!(bill.lines[0].quantity, 3);
        assert_eq!(bill.lines[0].subtotal, Decimal::new(30, 0));
        assert_eq!(bill.total, Decimal::new(30, 0));

        // Remaining cart keeps the other 2.
        let cart = fx.store.pending_order(fx.user).await.unwrap().unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);

        // Net stock effect across add + checkout is the single add-time
        // reservation of 5, plus 3 taken at checkout.
        assert_eq!(fx.stock_of(product.id).await, 12);

        // The completed order is on record.
        let completed = fx.store.completed_orders(fx.user).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].status, OrderStatus::Completed);
        assert_eq!(completed[0].total_amount, Decimal::new(30, 0));
    }

    #[tokio::test]
    async fn full_selection_empties_the_cart_line() {
        let fx = fixture().await;
        let product = fx.seed_product("Widget", 10, 10).await;
        fx.add_to_cart(&product, 2).await;

        fx.checkout
            .checkout(fx.user, vec![fx.select(&product, 2)], None)
            .await
            .unwrap();

        let cart = fx.store.pending_order(fx.user).await.unwrap().unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn batch_errors_reported_together_with_no_commits() {
        let fx = fixture().await;
        let good = fx.seed_product("Good", 10, 20).await;
        let scarce = fx.seed_product("Scarce", 5, 20).await;
        let stranger = fx.seed_product("Stranger", 7, 20).await;
        fx.add_to_cart(&good, 2).await;
        fx.add_to_cart(&scarce, 1).await;
        let stock_before = fx.stock_of(good.id).await;

        let err = fx
            .checkout
            .checkout(
                fx.user,
                vec![
                    fx.select(&good, 2),
                    // In cart with 1, selecting 4 exceeds it.
                    fx.select(&scarce, 4),
                    // Never added to the cart.
                    fx.select(&stranger, 1),
                ],
                None,
            )
            .await
            .unwrap_err();

        match err {
            Error::CheckoutRejected(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|e| e.contains("Scarce")));
                assert!(errors.iter().any(|e| e.contains("Stranger")));
            }
            other => panic!("expected CheckoutRejected, got {other:?}"),
        }

        // All-or-nothing: the valid line committed nothing either.
        assert_eq!(fx.stock_of(good.id).await, stock_before);
        assert!(fx.store.completed_orders(fx.user).await.unwrap().is_empty());
        let (bills, total) = fx
            .store
            .bills(&crate::store::BillFilter { page: 1, limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert!(bills.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn requires_a_pending_order() {
        let fx = fixture().await;
        let product = fx.seed_product("Widget", 10, 5).await;
        assert!(matches!(
            fx.checkout
                .checkout(fx.user, vec![fx.select(&product, 1)], None)
                .await
                .unwrap_err(),
            Error::NoPendingOrder
        ));
    }

    #[tokio::test]
    async fn requires_a_non_empty_selection() {
        let fx = fixture().await;
        assert!(matches!(
            fx.checkout.checkout(fx.user, vec![], None).await.unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[tokio::test]
    async fn percentage_coupon_discounts_the_total() {
        let fx = fixture().await;
        let product = fx.seed_product("Widget", 100, 10).await;
        fx.add_to_cart(&product, 1).await;
        fx.store
            .insert_coupon(&Coupon::new(
                None,
                CouponCode::new("SAVE20").unwrap(),
                DiscountType::Percentage,
                Decimal::new(20, 0),
                Utc::now() + Duration::days(1),
                true,
            ))
            .await
            .unwrap();

        let bill = fx
            .checkout
            .checkout(fx.user, vec![fx.select(&product, 1)], Some("save20".into()))
            .await
            .unwrap();

        assert_eq!(bill.subtotal, Decimal::new(100, 0));
        assert_eq!(bill.discount, Decimal::new(20, 0));
        assert_eq!(bill.total, Decimal::new(80, 0));
        assert_eq!(bill.coupon_code.as_deref(), Some("SAVE20"));
    }

    #[tokio::test]
    async fn fixed_coupon_clamps_total_at_zero() {
        let fx = fixture().await;
        let product = fx.seed_product("Widget", 100, 10).await;
        fx.add_to_cart(&product, 1).await;
        fx.store
            .insert_coupon(&Coupon::new(
                None,
                CouponCode::new("MEGA").unwrap(),
                DiscountType::Fixed,
                Decimal::new(150, 0),
                Utc::now() + Duration::days(1),
                true,
            ))
            .await
            .unwrap();

        let bill = fx
            .checkout
            .checkout(fx.user, vec![fx.select(&product, 1)], Some("MEGA".into()))
            .await
            .unwrap();
        assert_eq!(bill.total, Decimal::ZERO);
        assert_eq!(bill.discount, Decimal::new(100, 0));
    }

    #[tokio::test]
    async fn expired_coupon_rejects_checkout_without_mutating() {
        let fx = fixture().await;
        let product = fx.seed_product("Widget", 100, 10).await;
        fx.add_to_cart(&product, 2).await;
        let stock_before = fx.stock_of(product.id).await;
        fx.store
            .insert_coupon(&Coupon::new(
                None,
                CouponCode::new("BYGONE").unwrap(),
                DiscountType::Percentage,
                Decimal::new(50, 0),
                Utc::now() - Duration::days(1),
                true,
            ))
            .await
            .unwrap();

        assert!(matches!(
            fx.checkout
                .checkout(fx.user, vec![fx.select(&product, 1)], Some("BYGONE".into()))
                .await
                .unwrap_err(),
            Error::InvalidOrExpiredCoupon(_)
        ));

        // Invalid coupon rejects the checkout before any stock movement.
        assert_eq!(fx.stock_of(product.id).await, stock_before);
        let cart = fx.store.pending_order(fx.user).await.unwrap().unwrap();
        assert_eq!(cart.lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn bill_prices_come_from_the_cart_not_the_request() {
        let fx = fixture().await;
        let mut product = fx.seed_product("Widget", 10, 20).await;
        fx.add_to_cart(&product, 3).await;

        // Price rises after the line was captured.
        product.price = Decimal::new(99, 0);
        fx.store.insert_product(&product).await.unwrap();

        let bill = fx
            .checkout
            .checkout(fx.user, vec![fx.select(&product, 3)], None)
            .await
            .unwrap();
        assert_eq!(bill.lines[0].price, Decimal::new(10, 0));
        assert_eq!(bill.total, Decimal::new(30, 0));
    }
}
