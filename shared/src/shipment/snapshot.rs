//! Shipment snapshot - current state of a delivery unit

use crate::geo::{Address, GeoPoint};
use serde::{Deserialize, Serialize};

/// Shipment status
///
/// ```text
/// pending -> assigned -> accepted -> picked_up -> in_transit -> delivered
/// pending -> accepted                 (agent self-claim)
/// assigned -> pending                 (agent rejects, agent cleared)
/// any non-terminal -> failed
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    #[default]
    Pending,
    Assigned,
    Accepted,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
}

impl ShipmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Failed)
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ShipmentStatus::Pending => "PENDING",
            ShipmentStatus::Assigned => "ASSIGNED",
            ShipmentStatus::Accepted => "ACCEPTED",
            ShipmentStatus::PickedUp => "PICKED_UP",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Proof of delivery, recorded only at completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryProof {
    /// Signature reference (base64 or URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub verified_at: i64,
}

/// Shipment snapshot - computed from the event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentSnapshot {
    pub shipment_id: String,
    /// Paired order (1:1)
    pub order_id: String,
    /// Globally unique, human-legible tracking number
    pub tracking_number: String,
    /// 6-digit one-time code proving physical handoff; generated once at
    /// creation and never regenerated
    pub otp_code: String,
    pub status: ShipmentStatus,
    /// Bound delivery agent; set by a single successful assignment,
    /// cleared only on rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<Address>,
    pub delivery_address: Address,
    /// Last reported courier position, advisory only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<DeliveryProof>,
    pub customer_name: String,
    pub customer_phone: String,
    pub created_at: i64,
    pub updated_at: i64,
    /// Last applied event sequence
    pub last_sequence: u64,
}

impl ShipmentSnapshot {
    /// Create an empty shipment shell; the `Created` event fills it in
    pub fn new(shipment_id: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            shipment_id,
            order_id: String::new(),
            tracking_number: String::new(),
            otp_code: String::new(),
            status: ShipmentStatus::Pending,
            delivery_agent_id: None,
            pickup_address: None,
            delivery_address: Address {
                street: String::new(),
                city: String::new(),
                state: String::new(),
                zip_code: String::new(),
                phone: None,
                coordinates: None,
            },
            current_location: None,
            pickup_time: None,
            delivered_time: None,
            proof: None,
            customer_name: String::new(),
            customer_phone: String::new(),
            created_at: now,
            updated_at: now,
            last_sequence: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether `agent_id` is the currently bound agent
    pub fn is_bound_to(&self, agent_id: &str) -> bool {
        self.delivery_agent_id.as_deref() == Some(agent_id)
    }
}
