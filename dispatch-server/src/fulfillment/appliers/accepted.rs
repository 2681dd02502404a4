//! Accepted event applier
//!
//! Covers both flows: self-claim from pending and confirmation of an
//! assignment. Either way the agent ends up bound.

use crate::fulfillment::traits::EventApplier;
use shared::shipment::EventPayload;
use shared::{ShipmentEvent, ShipmentSnapshot, ShipmentStatus};

pub struct AcceptedApplier;

impl EventApplier for AcceptedApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent) {
        if let EventPayload::Accepted { agent_id } = &event.payload {
            snapshot.delivery_agent_id = Some(agent_id.clone());
            snapshot.status = ShipmentStatus::Accepted;
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
