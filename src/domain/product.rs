//! Product catalog record.
//!
//! The order subsystem only ever touches `stock` (through the inventory
//! guard) and reads `price`/`name` for pricing and display. Stock lives in
//! a single `stock` column; quantity adjustments go through the store's
//! atomic adjust-by-delta operation, never a read-modify-write here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Decimal, stock: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            price,
            stock,
            category: None,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether `quantity` more units can be taken from current stock.
    pub fn can_cover(&self, quantity: i32) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_only_within_stock() {
        let p = Product::new("Widget", Decimal::new(10, 0), 5);
        assert!(p.can_cover(5));
        assert!(!p.can_cover(6));
        assert!(!p.can_cover(0));
        assert!(!p.can_cover(-1));
    }
}
