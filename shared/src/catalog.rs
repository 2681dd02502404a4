//! Read-only catalog contract and stock counters
//!
//! Product descriptive data (name, price, seller) is owned by an external
//! catalog; the engine consumes immutable snapshots of it. The stock
//! counters, on the other hand, are owned by the inventory ledger.

use serde::{Deserialize, Serialize};

/// Immutable product snapshot consumed at checkout time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub seller_id: String,
    pub name: String,
    /// Unit price before discount
    pub price: f64,
    /// Per-unit discount subtracted from the price
    #[serde(default)]
    pub discount: f64,
}

impl ProductSnapshot {
    /// Effective unit price after discount (floored at zero)
    pub fn unit_price(&self) -> f64 {
        (self.price - self.discount).max(0.0)
    }
}

/// Per-product inventory counters owned by the ledger
///
/// Invariants: `available >= 0` and `reserved >= 0` after every
/// reserve/release sequence, including concurrent ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StockRecord {
    /// Units available for sale
    pub available: i64,
    /// Units committed to unfulfilled orders
    pub reserved: i64,
    /// Monotonic order counter, used for popularity ranking (best effort)
    #[serde(default)]
    pub order_count: u64,
}

impl StockRecord {
    pub fn with_available(available: i64) -> Self {
        Self {
            available,
            reserved: 0,
            order_count: 0,
        }
    }
}
