//! Seller-scoped orders created at checkout
//!
//! A checkout fans out into one order per distinct seller. Order status
//! only advances through shipment lifecycle transitions and is never
//! mutated once terminal.

use crate::geo::Address;
use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Packed,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Terminal orders are never mutated again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }
}

/// A single ordered line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
}

/// A seller-scoped order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub seller_id: String,
    pub items: Vec<OrderLine>,
    pub status: OrderStatus,
    /// Σ (unit price − unit discount) × qty, rounded to 2 dp
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub shipping_fee: f64,
    /// subtotal + tax + shipping
    pub total_amount: f64,
    pub currency: String,
    /// Address snapshot taken at checkout (never a live reference)
    pub shipping_address: Address,
    /// Paired shipment, set right after order creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }
}
