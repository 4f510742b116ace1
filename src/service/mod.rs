//! Application services over the store: inventory guard, cart
//! aggregator, checkout splitter, coupon evaluator.

pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod inventory;

pub use cart::CartService;
pub use checkout::{CheckoutService, SelectedLine};
pub use coupon::CouponEvaluator;
pub use inventory::InventoryGuard;
