//! Delivered event applier

use crate::fulfillment::traits::EventApplier;
use shared::shipment::EventPayload;
use shared::{ShipmentEvent, ShipmentSnapshot, ShipmentStatus};

pub struct DeliveredApplier;

impl EventApplier for DeliveredApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent) {
        if let EventPayload::Delivered { proof } = &event.payload {
            snapshot.status = ShipmentStatus::Delivered;
            snapshot.delivered_time = Some(event.timestamp);
            snapshot.proof = Some(proof.clone());
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
    use shared::DeliveryProof;

    #[test]
    fn delivery_is_terminal_with_proof() {
        let mut snapshot = ShipmentSnapshot::new("shp-1".to_string());
        snapshot.status = ShipmentStatus::InTransit;

        let event = ShipmentEvent::new(
            8,
            "shp-1".to_string(),
            "agent-3".to_string(),
            "cmd-1".to_string(),
            ShipmentStatus::Delivered,
            Some("Package delivered successfully".to_string()),
            None,
            ShipmentEventType::Delivered,
            EventPayload::Delivered {
                proof: DeliveryProof {
                    signature: Some("sig".to_string()),
                    verified_at: 1_700_000_000_000,
                },
            },
        );

        DeliveredApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.status, ShipmentStatus::Delivered);
        assert!(snapshot.is_terminal());
        assert_eq!(snapshot.delivered_time, Some(event.timestamp));
        assert!(snapshot.proof.is_some());
    }
}
