//! Rejected event applier
//!
//! A rejection returns the shipment to the pool: the agent reference is
//! cleared before any later acceptance can bind a new one.

use crate::fulfillment::traits::EventApplier;
use shared::shipment::EventPayload;
use shared::{ShipmentEvent, ShipmentSnapshot, ShipmentStatus};

pub struct RejectedApplier;

impl EventApplier for RejectedApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent) {
        if let EventPayload::Rejected { .. } = &event.payload {
            snapshot.delivery_agent_id = None;
            snapshot.status = ShipmentStatus::Pending;
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
