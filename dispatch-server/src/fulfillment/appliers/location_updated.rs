//! LocationUpdated event applier
//!
//! Advisory position updates only; status is untouched.

use crate::fulfillment::traits::EventApplier;
use shared::shipment::EventPayload;
use shared::{ShipmentEvent, ShipmentSnapshot};

pub struct LocationUpdatedApplier;

impl EventApplier for LocationUpdatedApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent) {
        if let EventPayload::LocationUpdated {} = &event.payload {
            if event.location.is_some() {
                snapshot.current_location = event.location;
            }
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::shipment::ShipmentEventType;
    use shared::{GeoPoint, ShipmentStatus};

    #[test]
    fn location_update_leaves_status_alone() {
        let mut snapshot = ShipmentSnapshot::new("shp-1".to_string());
        snapshot.status = ShipmentStatus::InTransit;

        let event = ShipmentEvent::new(
            9,
            "shp-1".to_string(),
            "agent-3".to_string(),
            "cmd-1".to_string(),
            ShipmentStatus::InTransit,
            None,
            Some(GeoPoint::new(18.52, 73.85)),
            ShipmentEventType::LocationUpdated,
            EventPayload::LocationUpdated {},
        );

        LocationUpdatedApplier.apply(&mut snapshot, &event);
        assert_eq!(snapshot.status, ShipmentStatus::InTransit);
        assert_eq!(snapshot.current_location.unwrap().lat, 18.52);
    }
}
