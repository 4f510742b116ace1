//! Domain model: products, orders (cart/bill), coupons, bills.

pub mod bill;
pub mod coupon;
pub mod order;
pub mod product;

pub use bill::{Bill, BillLine, BillStatus};
pub use coupon::{Coupon, CouponCode, DiscountType};
pub use order::{Order, OrderLine, OrderStatus, SplitError};
pub use product::Product;
