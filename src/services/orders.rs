//! Order bookkeeping shared by the customer and seller handlers.

use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{domain::OrderStatus, models::OrderEntity};

/// Days after delivery during which a return is accepted.
pub const RETURN_WINDOW_DAYS: i64 = 14;

pub const REFUND_ETA: &str = "5-7 business days";

/// `<prefix>-<unix millis>-<7 upper-case alphanumerics>`, e.g. `ORD-1727740800000-K3J9QZ1`.
pub fn reference_number(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(7)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{prefix}-{}-{suffix}", Utc::now().timestamp_millis())
}

pub fn within_return_window(delivered_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    delivered_at.is_some_and(|delivered| (now - delivered).num_days() <= RETURN_WINDOW_DAYS)
}

pub fn cancellation_note(reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("Cancelled by customer. Reason: {reason}"),
        None => "Cancelled by customer".to_string(),
    }
}

pub fn return_note(reason: Option<&str>, authorization: &str) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => {
            format!("Return requested by customer. Reason: {reason}. Auth: {authorization}")
        }
        None => format!("Return requested by customer. Auth: {authorization}"),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub shipped: usize,
    pub delivered: usize,
    pub cancelled: usize,
    pub total_revenue: f64,
}

impl OrderStats {
    pub fn from_orders(orders: &[OrderEntity]) -> Self {
        let mut stats = OrderStats {
            total: orders.len(),
            ..Default::default()
        };
        for order in orders {
            stats.total_revenue += order.total_amount;
            match order.status.parse::<OrderStatus>() {
                Ok(OrderStatus::Pending) => stats.pending += 1,
                Ok(OrderStatus::Processing) => stats.processing += 1,
                Ok(OrderStatus::Shipped) => stats.shipped += 1,
                Ok(OrderStatus::Delivered) => stats.delivered += 1,
                Ok(OrderStatus::Cancelled) => stats.cancelled += 1,
                _ => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn order(status: &str, total: f64) -> OrderEntity {
        let now = Utc::now();
        OrderEntity {
            id: Uuid::new_v4(),
            order_number: reference_number("ORD"),
            user_id: Uuid::new_v4(),
            order_source: "customer".into(),
            status: status.into(),
            payment_status: "pending".into(),
            subtotal: total,
            tax_amount: 0.0,
            shipping_amount: 0.0,
            discount_amount: 0.0,
            total_amount: total,
            shipping_address: json!({}),
            tracking_number: None,
            admin_notes: None,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn reference_number_shape() {
        let number = reference_number("ORD");
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 7);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn return_window_is_fourteen_days() {
        let now = Utc::now();
        assert!(within_return_window(Some(now - Duration::days(14)), now));
        assert!(!within_return_window(Some(now - Duration::days(15)), now));
        assert!(!within_return_window(None, now));
    }

    #[test]
    fn notes() {
        assert_eq!(cancellation_note(None), "Cancelled by customer");
        assert_eq!(
            cancellation_note(Some("ordered twice")),
            "Cancelled by customer. Reason: ordered twice"
        );
        assert_eq!(
            return_note(None, "RET-1-ABC"),
            "Return requested by customer. Auth: RET-1-ABC"
        );
    }

    #[test]
    fn stats_count_by_status() {
        let orders = vec![
            order("pending", 100.0),
            order("pending", 50.5),
            order("shipped", 20.0),
            order("returned", 10.0),
        ];
        let stats = OrderStats::from_orders(&orders);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.shipped, 1);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.total_revenue, 180.5);
    }
}
