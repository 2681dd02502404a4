//! Departed event applier

use crate::fulfillment::traits::EventApplier;
use shared::shipment::EventPayload;
use shared::{ShipmentEvent, ShipmentSnapshot, ShipmentStatus};

pub struct DepartedApplier;

impl EventApplier for DepartedApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent) {
        if let EventPayload::Departed {} = &event.payload {
            snapshot.status = ShipmentStatus::InTransit;
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

    #[test]
    fn departure_moves_to_in_transit() {
        let mut snapshot = ShipmentSnapshot::new("shp-1".to_string());
        snapshot.status = ShipmentStatus::PickedUp;

        let event = ShipmentEvent::new(
            7,
            "shp-1".to_string(),
            "agent-3".to_string(),
            "cmd-1".to_string(),
            ShipmentStatus::InTransit,
            Some("Package is in transit".to_string()),
            None,
            ShipmentEventType::Departed,
            EventPayload::Departed {},
        );

        DepartedApplier.apply(&mut snapshot, &event);
        assert_eq!(snapshot.status, ShipmentStatus::InTransit);
    }
}
