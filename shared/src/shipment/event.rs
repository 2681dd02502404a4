//! Shipment events - immutable audit records
//!
//! The event log is append-only and is the authoritative audit trail of a
//! shipment. Transitions are recorded in the order they were durably
//! applied; a command that loses a race appends nothing.

use crate::geo::{Address, GeoPoint};
use crate::shipment::snapshot::{DeliveryProof, ShipmentStatus};
use serde::{Deserialize, Serialize};

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentEventType {
    Created,
    Assigned,
    Accepted,
    Rejected,
    PickedUp,
    Departed,
    LocationUpdated,
    Delivered,
    Failed,
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    /// Shipment created alongside its order at checkout
    Created {
        order_id: String,
        tracking_number: String,
        /// One-time delivery code, issued exactly once here
        otp_code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pickup_address: Option<Address>,
        delivery_address: Address,
        customer_name: String,
        customer_phone: String,
    },

    /// Agent bound by auto- or directed assignment
    Assigned { agent_id: String },

    /// Agent confirmed an assignment, or self-claimed a pending shipment
    Accepted { agent_id: String },

    /// Bound agent rejected the assignment; shipment returns to the pool
    Rejected { agent_id: String },

    PickedUp {},

    Departed {},

    LocationUpdated {},

    Delivered { proof: DeliveryProof },

    Failed {},
}

/// Shipment event - one immutable entry of the audit trail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number - the authoritative ordering mechanism
    pub sequence: u64,
    /// Shipment this event belongs to
    pub shipment_id: String,
    /// Server timestamp (Unix milliseconds), set when the event is created
    pub timestamp: i64,
    /// Caller who triggered this event
    pub actor_id: String,
    /// Command that produced this event (for audit tracing)
    pub command_id: String,
    /// Shipment status after this event was applied
    pub status: ShipmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Courier position at event time, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub event_type: ShipmentEventType,
    pub payload: EventPayload,
}

impl ShipmentEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        shipment_id: String,
        actor_id: String,
        command_id: String,
        status: ShipmentStatus,
        note: Option<String>,
        location: Option<GeoPoint>,
        event_type: ShipmentEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            shipment_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            actor_id,
            command_id,
            status,
            note,
            location,
            event_type,
            payload,
        }
    }
}
