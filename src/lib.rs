//! Shophouse shop backend.
//!
//! ## Features
//! - Shopping cart with merge-on-add semantics and stock reservation
//! - Partial checkout: selected lines become an immutable bill, the
//!   rest stays in the cart
//! - Coupon codes (percentage/fixed) applied at bill creation
//! - Bill lifecycle: paid -> processing -> shipped -> delivered
//! - Postgres or in-memory persistence behind one store trait

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;

pub use error::{Error, Result};
