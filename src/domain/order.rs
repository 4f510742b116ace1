//! Orders: the cart while `pending`, the purchase record once `completed`.
//!
//! A user has at most one `pending` order at a time (enforced by the
//! store). Lines merge by (product, captured price): adding the same
//! product at the same price sums quantities; a different price opens a
//! new line. Checkout splits quantities out of the cart with
//! [`Order::split_off`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// One cart/bill line: a product at a price captured when the line was
/// first reserved. The price is not re-read at display or checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

impl OrderLine {
    pub fn new(product_id: Uuid, quantity: i32, price: Decimal) -> Self {
        Self { product_id, quantity, price }
    }

    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Why a requested split could not be taken from the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    NotInCart,
    ExceedsCart { in_cart: i32, requested: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub coupon_applied: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Begin an empty cart for a user.
    pub fn new_cart(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            lines: Vec::new(),
            status: OrderStatus::Pending,
            total_amount: Decimal::ZERO,
            coupon_applied: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the immutable bill record produced by checkout.
    pub fn completed(
        user_id: Uuid,
        lines: Vec<OrderLine>,
        total_amount: Decimal,
        coupon_applied: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            lines,
            status: OrderStatus::Completed,
            total_amount,
            coupon_applied,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_cart(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_for_product(&self, product_id: Uuid) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Merge a line into the cart. Same (product, price) sums quantities;
    /// anything else appends. Always additive, never an overwrite.
    pub fn merge_line(&mut self, line: OrderLine) {
        match self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id && l.price == line.price)
        {
            Some(existing) => existing.quantity += line.quantity,
            None => self.lines.push(line),
        }
        self.recalculate();
    }

    /// Replace the whole line list without any stock bookkeeping.
    pub fn replace_lines(&mut self, lines: Vec<OrderLine>) {
        self.lines = lines;
        self.recalculate();
    }

    /// Set the quantity of the line holding `product_id`.
    pub fn set_line_quantity(&mut self, product_id: Uuid, quantity: i32) -> Result<(), SplitError> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(SplitError::NotInCart)?;
        line.quantity = quantity;
        self.recalculate();
        Ok(())
    }

    /// Take `quantity` of a product out of the cart, returning the taken
    /// portion at the captured price. Fully taken lines are removed;
    /// partially taken lines keep the remainder.
    pub fn split_off(&mut self, product_id: Uuid, quantity: i32) -> Result<OrderLine, SplitError> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or(SplitError::NotInCart)?;
        let in_cart = self.lines[idx].quantity;
        if quantity > in_cart {
            return Err(SplitError::ExceedsCart { in_cart, requested: quantity });
        }
        let price = self.lines[idx].price;
        if quantity == in_cart {
            self.lines.remove(idx);
        } else {
            self.lines[idx].quantity -= quantity;
        }
        self.recalculate();
        Ok(OrderLine::new(product_id, quantity, price))
    }

    fn recalculate(&mut self) {
        self.total_amount = self.lines.iter().map(OrderLine::subtotal).sum();
        self.updated_at = Utc::now();
    }
}
