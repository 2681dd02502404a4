//! Delivery agent profiles

use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// Vehicle used by a delivery agent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Bike,
    Scooter,
    Car,
    Van,
}

/// KYC verification state; only approved agents may hold shipments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Account state of the agent profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

/// Running payout balances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EarningsBalance {
    pub total: f64,
    pub pending: f64,
    pub paid: f64,
}

/// Last reported agent position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationPing {
    pub point: GeoPoint,
    pub timestamp: i64,
}

/// Delivery agent profile
///
/// `current_assignments` is a small working set of shipments the agent
/// holds right now, not a queue. The dispatch assigner mutates the
/// working set; the settlement ledger mutates the balances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProfile {
    pub agent_id: String,
    pub vehicle_type: VehicleType,
    pub region: String,
    pub is_online: bool,
    pub is_available: bool,
    pub rating: f64,
    pub kyc_status: KycStatus,
    pub status: AgentStatus,
    /// Advisory, used only for nearest-agent selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_location: Option<LocationPing>,
    pub current_assignments: Vec<String>,
    pub completed_assignments: Vec<String>,
    pub earnings: EarningsBalance,
    pub total_deliveries: u64,
    pub completed_deliveries: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AgentProfile {
    pub fn new(agent_id: impl Into<String>, vehicle_type: VehicleType, region: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            agent_id: agent_id.into(),
            vehicle_type,
            region: region.into(),
            is_online: false,
            is_available: true,
            rating: 0.0,
            kyc_status: KycStatus::Pending,
            status: AgentStatus::Active,
            last_location: None,
            current_assignments: Vec::new(),
            completed_assignments: Vec::new(),
            earnings: EarningsBalance::default(),
            total_deliveries: 0,
            completed_deliveries: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// May this agent hold a shipment at all (KYC approved, account active)
    pub fn can_accept(&self) -> bool {
        self.kyc_status == KycStatus::Approved && self.status == AgentStatus::Active
    }

    /// Eligible for auto-assignment: online, available, and able to accept
    pub fn is_eligible(&self) -> bool {
        self.is_online && self.is_available && self.can_accept()
    }
}
