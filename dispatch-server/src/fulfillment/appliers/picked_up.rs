//! PickedUp event applier

use crate::fulfillment::traits::EventApplier;
use shared::shipment::EventPayload;
use shared::{ShipmentEvent, ShipmentSnapshot, ShipmentStatus};

pub struct PickedUpApplier;

impl EventApplier for PickedUpApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent) {
        if let EventPayload::PickedUp {} = &event.payload {
            snapshot.status = ShipmentStatus::PickedUp;
            snapshot.pickup_time = Some(event.timestamp);
            if event.location.is_some() {
                snapshot.current_location = event.location;
            }
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}
