//! Coupon eligibility and discount arithmetic.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    domain::{DiscountType, round_currency},
    models::CouponEntity,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CouponError {
    #[error("This coupon is no longer active")]
    Inactive,

    #[error("This coupon is not yet valid")]
    NotYetValid,

    #[error("This coupon has expired")]
    Expired,

    #[error("Minimum purchase amount of ₹{0} required")]
    BelowMinimum(f64),

    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,

    #[error("You have already used this coupon")]
    AlreadyUsed,
}

/// Checks every rule that can reject `coupon` for this order.
/// `user_usage` is how many times the caller already redeemed it.
pub fn check_eligibility(
    coupon: &CouponEntity,
    order_amount: f64,
    user_usage: i64,
    now: DateTime<Utc>,
) -> Result<(), CouponError> {
    if !coupon.is_active {
        return Err(CouponError::Inactive);
    }
    if coupon.valid_from.is_some_and(|from| from > now) {
        return Err(CouponError::NotYetValid);
    }
    if coupon.valid_until.is_some_and(|until| until < now) {
        return Err(CouponError::Expired);
    }
    if let Some(minimum) = coupon.min_purchase_amount.filter(|m| *m > 0.0) {
        if order_amount < minimum {
            return Err(CouponError::BelowMinimum(minimum));
        }
    }
    // a zero limit means unlimited
    if let Some(limit) = coupon.usage_limit.filter(|l| *l > 0) {
        if coupon.usage_count >= limit {
            return Err(CouponError::UsageLimitReached);
        }
    }
    let per_user = coupon.user_limit.filter(|l| *l > 0).unwrap_or(1);
    if user_usage >= i64::from(per_user) {
        return Err(CouponError::AlreadyUsed);
    }
    Ok(())
}

/// Discount for `order_amount`, rounded to two decimals. Percentage
/// discounts respect `max_discount_amount`; fixed ones never exceed the order.
pub fn calculate_discount(coupon: &CouponEntity, order_amount: f64) -> f64 {
    let discount = match coupon.discount_type.parse::<DiscountType>() {
        Ok(DiscountType::Percentage) => {
            let discount = order_amount * coupon.discount_value / 100.0;
            match coupon.max_discount_amount.filter(|m| *m > 0.0) {
                Some(cap) => discount.min(cap),
                None => discount,
            }
        }
        _ => coupon.discount_value.min(order_amount),
    };
    round_currency(discount)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;

    fn coupon(discount_type: &str, value: f64) -> CouponEntity {
        CouponEntity {
            id: Uuid::new_v4(),
            code: "SPECS10".into(),
            description: None,
            discount_type: discount_type.into(),
            discount_value: value,
            min_purchase_amount: None,
            max_discount_amount: None,
            usage_limit: None,
            usage_count: 0,
            user_limit: None,
            is_active: true,
            valid_from: None,
            valid_until: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_is_capped() {
        let mut c = coupon("percentage", 10.0);
        assert_eq!(calculate_discount(&c, 2499.0), 249.9);

        c.max_discount_amount = Some(200.0);
        assert_eq!(calculate_discount(&c, 2499.0), 200.0);
    }

    #[test]
    fn fixed_never_exceeds_order() {
        let c = coupon("fixed", 500.0);
        assert_eq!(calculate_discount(&c, 1200.0), 500.0);
        assert_eq!(calculate_discount(&c, 300.0), 300.0);
    }

    #[test]
    fn percentage_rounds_to_paise() {
        let c = coupon("percentage", 15.0);
        assert_eq!(calculate_discount(&c, 333.33), 50.0);
    }

    #[test]
    fn validity_window() {
        let now = Utc::now();
        let mut c = coupon("fixed", 100.0);

        c.valid_from = Some(now + Duration::days(1));
        assert_eq!(
            check_eligibility(&c, 1000.0, 0, now),
            Err(CouponError::NotYetValid)
        );

        c.valid_from = None;
        c.valid_until = Some(now - Duration::days(1));
        assert_eq!(
            check_eligibility(&c, 1000.0, 0, now),
            Err(CouponError::Expired)
        );
    }

    #[test]
    fn limits() {
        let now = Utc::now();
        let mut c = coupon("fixed", 100.0);
        c.min_purchase_amount = Some(999.0);
        assert_eq!(
            check_eligibility(&c, 500.0, 0, now),
            Err(CouponError::BelowMinimum(999.0))
        );

        c.min_purchase_amount = None;
        c.usage_limit = Some(5);
        c.usage_count = 5;
        assert_eq!(
            check_eligibility(&c, 500.0, 0, now),
            Err(CouponError::UsageLimitReached)
        );

        c.usage_count = 4;
        assert_eq!(
            check_eligibility(&c, 500.0, 1, now),
            Err(CouponError::AlreadyUsed)
        );

        c.user_limit = Some(2);
        assert!(check_eligibility(&c, 500.0, 1, now).is_ok());
    }

    #[test]
    fn inactive_wins() {
        let mut c = coupon("fixed", 100.0);
        c.is_active = false;
        assert_eq!(
            check_eligibility(&c, 500.0, 0, Utc::now()),
            Err(CouponError::Inactive)
        );
    }
}
