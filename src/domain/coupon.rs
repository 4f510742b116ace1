//! Coupons and discount evaluation.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Coupon code value object. Codes are matched case-insensitively by
/// normalizing to uppercase on both the write and read paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(value: impl Into<String>) -> Result<Self, CouponCodeError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() {
            return Err(CouponCodeError::Empty);
        }
        if value.len() > 32 {
            return Err(CouponCodeError::TooLong);
        }
        Ok(Self(value))
    }

    /// Generate a random 8-character A-Z/0-9 code.
    pub fn random() -> Self {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
        let mut rng = rand::thread_rng();
        let code: String = (0..8)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CouponCodeError {
    #[error("coupon code must not be empty")]
    Empty,
    #[error("coupon code must be at most 32 characters")]
    TooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown discount type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub name: Option<String>,
    pub code: CouponCode,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub expiration_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    pub fn new(
        name: Option<String>,
        code: CouponCode,
        discount_type: DiscountType,
        discount_value: Decimal,
        expiration_date: DateTime<Utc>,
        is_active: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            code,
            discount_type,
            discount_value,
            expiration_date,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// A coupon is redeemable while it is active and not yet expired. An
    /// expired coupon is rejected no matter what `is_active` says.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expiration_date
    }

    /// Apply the discount to `amount`, floored at zero.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        let discounted = match self.discount_type {
            DiscountType::Percentage => {
                amount - amount * self.discount_value / Decimal::from(100)
            }
            DiscountType::Fixed => amount - self.discount_value,
        };
        discounted.max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: DiscountType, value: i64) -> Coupon {
        Coupon::new(
            None,
            CouponCode::new("SAVE").unwrap(),
            kind,
            Decimal::new(value, 0),
            Utc::now() + Duration::days(7),
            true,
        )
    }

    #[test]
    fn code_normalizes_to_uppercase() {
        let code = CouponCode::new("  summer20 ").unwrap();
        assert_eq!(code.as_str(), "SUMMER20");
        assert!(CouponCode::new("   ").is_err());
    }

    #[test]
    fn random_code_shape() {
        let code = CouponCode::random();
        assert_eq!(code.as_str().len(), 8);
        assert!(code.as_str().chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn percentage_discount() {
        let c = coupon(DiscountType::Percentage, 20);
        assert_eq!(c.apply(Decimal::new(100, 0)), Decimal::new(80, 0));
    }

    #[test]
    fn fixed_discount_clamps_at_zero() {
        let c = coupon(DiscountType::Fixed, 150);
        assert_eq!(c.apply(Decimal::new(100, 0)), Decimal::ZERO);
    }

    #[test]
    fn expired_coupon_is_invalid_even_if_active() {
        let mut c = coupon(DiscountType::Percentage, 10);
        c.expiration_date = Utc::now() - Duration::hours(1);
        assert!(c.is_active);
        assert!(!c.is_valid(Utc::now()));
    }

    #[test]
    fn inactive_coupon_is_invalid() {
        let mut c = coupon(DiscountType::Percentage, 10);
        c.is_active = false;
        assert!(!c.is_valid(Utc::now()));
    }
}
