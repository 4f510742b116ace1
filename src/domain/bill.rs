//! Bills: the persisted view of a completed order.
//!
//! A bill carries the subtotal/discount/total breakdown and a
//! human-facing order number. Its status runs a finer lifecycle than the
//! order's: `paid -> processing -> shipped -> delivered`, cancellable
//! from any pre-delivered state. Line contents never change after
//! creation; only the status field advances.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::order::OrderLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Forward progression plus cancellation from any pre-delivered state.
    pub fn can_transition_to(&self, next: BillStatus) -> bool {
        match (self, next) {
            (Self::Paid, Self::Processing)
            | (Self::Processing, Self::Shipped)
            | (Self::Shipped, Self::Delivered) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown bill status: {other}")),
        }
    }
}

/// A billed line, denormalized with the product name so the record stays
/// readable even if the product is later edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

impl BillLine {
    pub fn from_order_line(line: &OrderLine, product_name: impl Into<String>) -> Self {
        Self {
            product_id: line.product_id,
            product_name: product_name.into(),
            quantity: line.quantity,
            price: line.price,
            subtotal: line.subtotal(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub lines: Vec<BillLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub coupon_applied: Option<Uuid>,
    pub coupon_code: Option<String>,
    pub status: BillStatus,
    pub payment_method: String,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub bill_date: DateTime<Utc>,
}

impl Bill {
    pub fn new(
        user_id: Uuid,
        order_id: Uuid,
        lines: Vec<BillLine>,
        subtotal: Decimal,
        total: Decimal,
        coupon_applied: Option<Uuid>,
        coupon_code: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            order_id,
            order_number: generate_order_number(),
            lines,
            subtotal,
            discount: subtotal - total,
            total,
            coupon_applied,
            coupon_code,
            status: BillStatus::Paid,
            payment_method: "cash_on_delivery".to_string(),
            shipping_address: None,
            notes: None,
            bill_date: Utc::now(),
        }
    }
}

/// `ORD-<unix millis>-<3 random digits>`.
pub fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("ORD-{millis}-{suffix:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_progression_only() {
        assert!(BillStatus::Paid.can_transition_to(BillStatus::Processing));
        assert!(BillStatus::Processing.can_transition_to(BillStatus::Shipped));
        assert!(BillStatus::Shipped.can_transition_to(BillStatus::Delivered));
        assert!(!BillStatus::Paid.can_transition_to(BillStatus::Shipped));
        assert!(!BillStatus::Delivered.can_transition_to(BillStatus::Processing));
    }

    #[test]
    fn cancellable_until_delivered() {
        assert!(BillStatus::Paid.can_transition_to(BillStatus::Cancelled));
        assert!(BillStatus::Shipped.can_transition_to(BillStatus::Cancelled));
        assert!(!BillStatus::Delivered.can_transition_to(BillStatus::Cancelled));
        assert!(!BillStatus::Cancelled.can_transition_to(BillStatus::Cancelled));
    }

    #[test]
    fn order_number_shape() {
        let n = generate_order_number();
        assert!(n.starts_with("ORD-"));
        assert_eq!(n.split('-').count(), 3);
        assert_eq!(n.split('-').nth(2).unwrap().len(), 3);
    }

    #[test]
    fn bill_records_discount_breakdown() {
        let bill = Bill::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![],
            Decimal::new(100, 0),
            Decimal::new(80, 0),
            None,
            Some("SAVE20".into()),
        );
        assert_eq!(bill.discount, Decimal::new(20, 0));
        assert_eq!(bill.status, BillStatus::Paid);
        assert_eq!(bill.payment_method, "cash_on_delivery");
    }
}
