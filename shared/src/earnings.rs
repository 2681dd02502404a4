//! Delivery earnings entries
//!
//! One immutable entry is written per completed shipment. A separate
//! payout process (out of scope here) later advances `status` from
//! pending to processed to paid.

use serde::{Deserialize, Serialize};

/// Settlement state of an earnings entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EarningsStatus {
    #[default]
    Pending,
    Processed,
    Paid,
}

/// Pure result of the earnings formula, all values rounded to 2 dp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EarningsBreakdown {
    pub base_amount: f64,
    pub distance_bonus: f64,
    pub peak_hour_bonus: f64,
    /// base + distance bonus + peak bonus
    pub total_amount: f64,
    pub platform_commission: f64,
    /// total − commission, credited to the agent
    pub net_amount: f64,
}

/// Immutable earnings record for one completed delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EarningsEntry {
    pub entry_id: i64,
    pub agent_id: String,
    pub shipment_id: String,
    pub order_id: String,
    pub base_amount: f64,
    pub distance_bonus: f64,
    pub peak_hour_bonus: f64,
    pub total_amount: f64,
    pub platform_commission: f64,
    pub net_amount: f64,
    pub distance_km: f64,
    pub is_peak_hour: bool,
    pub status: EarningsStatus,
    pub earned_at: i64,
}

impl EarningsEntry {
    pub fn from_breakdown(
        agent_id: impl Into<String>,
        shipment_id: impl Into<String>,
        order_id: impl Into<String>,
        breakdown: &EarningsBreakdown,
        distance_km: f64,
        is_peak_hour: bool,
    ) -> Self {
        Self {
            entry_id: crate::util::snowflake_id(),
            agent_id: agent_id.into(),
            shipment_id: shipment_id.into(),
            order_id: order_id.into(),
            base_amount: breakdown.base_amount,
            distance_bonus: breakdown.distance_bonus,
            peak_hour_bonus: breakdown.peak_hour_bonus,
            total_amount: breakdown.total_amount,
            platform_commission: breakdown.platform_commission,
            net_amount: breakdown.net_amount,
            distance_km,
            is_peak_hour,
            status: EarningsStatus::Pending,
            earned_at: crate::util::now_millis(),
        }
    }
}
