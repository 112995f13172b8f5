//! Storefront vocabulary shared by handlers and storage.
//!
//! Statuses are persisted as lowercase text; the enums here are the only
//! place those strings are spelled out.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error returned when a persisted or submitted string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Seller,
    Reseller,
}

text_enum!(Role, "role", {
    Customer => "customer",
    Seller => "seller",
    Reseller => "reseller",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Returned => "returned",
});

impl OrderStatus {
    /// Statuses a seller may move an order into.
    pub const SELLER_SETTABLE: &'static [OrderStatus] = &[
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn is_seller_settable(&self) -> bool {
        Self::SELLER_SETTABLE.contains(self)
    }

    /// Whether a customer may still cancel an order in this status.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

text_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Refunded => "refunded",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderSource {
    #[default]
    Customer,
    Reseller,
}

text_enum!(OrderSource, "order source", {
    Customer => "customer",
    Reseller => "reseller",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

text_enum!(DiscountType, "discount type", {
    Percentage => "percentage",
    Fixed => "fixed",
});

/// How a stock adjustment combines with the current quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockAction {
    #[default]
    Set,
    Add,
    Subtract,
}

text_enum!(StockAction, "stock action", {
    Set => "set",
    Add => "add",
    Subtract => "subtract",
});

impl StockAction {
    /// New stock level. Subtraction never goes below zero and a negative
    /// `quantity` counts as zero.
    pub fn apply(&self, current: i32, quantity: i32) -> i32 {
        let quantity = quantity.max(0);
        match self {
            StockAction::Set => quantity.max(0),
            StockAction::Add => current.saturating_add(quantity),
            StockAction::Subtract => current.saturating_sub(quantity).max(0),
        }
    }
}

/// A login identifier, either an e-mail address or a phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactIdentifier {
    Email(String),
    Phone(String),
}

impl ContactIdentifier {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.contains('@') {
            ContactIdentifier::Email(raw.to_string())
        } else {
            ContactIdentifier::Phone(raw.to_string())
        }
    }
}

/// Upper bound for the quantity of a single cart or order line.
pub const MAX_LINE_QUANTITY: i32 = 1000;

/// Rounds a currency amount to two decimal places.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
