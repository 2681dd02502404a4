//! Failed event applier

use crate::fulfillment::traits::EventApplier;
use shared::shipment::EventPayload;
use shared::{ShipmentEvent, ShipmentSnapshot, ShipmentStatus};

pub struct FailedApplier;

impl EventApplier for FailedApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent) {
        if let EventPayload::Failed {} = &event.payload {
            snapshot.status = ShipmentStatus::Failed;
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
    fn failure_is_terminal() {
        let mut snapshot = ShipmentSnapshot::new("shp-1".to_string());
        snapshot.status = ShipmentStatus::Accepted;

        let event = ShipmentEvent::new(
            3,
            "shp-1".to_string(),
            "agent-3".to_string(),
            "cmd-1".to_string(),
            ShipmentStatus::Failed,
            Some("Customer unreachable".to_string()),
            None,
            ShipmentEventType::Failed,
            EventPayload::Failed {},
        );

        FailedApplier.apply(&mut snapshot, &event);
        assert_eq!(snapshot.status, ShipmentStatus::Failed);
        assert!(snapshot.is_terminal());
    }
}
