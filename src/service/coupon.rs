//! Coupon evaluator: lookup by normalized code, validity, discount.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{Coupon, CouponCode};
use crate::error::{Error, Result};
use crate::store::Store;

#[derive(Clone)]
pub struct CouponEvaluator {
    store: Arc<dyn Store>,
}

impl CouponEvaluator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Case-insensitive exact lookup; the code is normalized to uppercase
    /// before hitting the store, which is how it was stored.
    pub async fn lookup(&self, code: &str) -> Result<Option<Coupon>> {
        let code = CouponCode::new(code).map_err(|e| Error::Validation(e.to_string()))?;
        self.store.coupon_by_code(code.as_str()).await
    }

    /// Resolve a code for checkout: it must exist, be active, and not be
    /// expired. Anything else is one uniform rejection so the error does
    /// not reveal whether the code exists.
    pub async fn redeemable(&self, code: &str, now: DateTime<Utc>) -> Result<Coupon> {
        let normalized = CouponCode::new(code).map_err(|e| Error::Validation(e.to_string()))?;
        match self.store.coupon_by_code(normalized.as_str()).await? {
            Some(coupon) if coupon.is_valid(now) => Ok(coupon),
            _ => Err(Error::InvalidOrExpiredCoupon(normalized.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DiscountType;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use rust_decimal::Decimal;

    async fn evaluator_with(coupon: Coupon) -> CouponEvaluator {
        let store = Arc::new(MemoryStore::new());
        store.insert_coupon(&coupon).await.unwrap();
        CouponEvaluator::new(store)
    }

    fn coupon(code: &str, expires_in_hours: i64, active: bool) -> Coupon {
        Coupon::new(
            None,
            CouponCode::new(code).unwrap(),
            DiscountType::Percentage,
            Decimal::new(20, 0),
            Utc::now() + Duration::hours(expires_in_hours),
            active,
        )
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let eval = evaluator_with(coupon("SUMMER20", 24, true)).await;
        assert!(eval.lookup("summer20").await.unwrap().is_some());
        assert!(eval.lookup("SUMMER20").await.unwrap().is_some());
        assert!(eval.lookup("WINTER").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_code_is_not_redeemable() {
        let eval = evaluator_with(coupon("OLD", -1, true)).await;
        assert!(matches!(
            eval.redeemable("old", Utc::now()).await.unwrap_err(),
            Error::InvalidOrExpiredCoupon(code) if code == "OLD"
        ));
    }

    #[tokio::test]
    async fn inactive_and_unknown_codes_rejected_alike() {
        let eval = evaluator_with(coupon("PAUSED", 24, false)).await;
        assert!(matches!(
            eval.redeemable("PAUSED", Utc::now()).await.unwrap_err(),
            Error::InvalidOrExpiredCoupon(_)
        ));
        assert!(matches!(
            eval.redeemable("NOPE", Utc::now()).await.unwrap_err(),
            Error::InvalidOrExpiredCoupon(_)
        ));
    }
}
