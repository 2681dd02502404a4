//! Assigned event applier

use crate::fulfillment::traits::EventApplier;
use shared::shipment::EventPayload;
use shared::{ShipmentEvent, ShipmentSnapshot, ShipmentStatus};

pub struct AssignedApplier;

impl EventApplier for AssignedApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent) {
        if let EventPayload::Assigned { agent_id } = &event.payload {
            snapshot.delivery_agent_id = Some(agent_id.clone());
            snapshot.status = ShipmentStatus::Assigned;
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
    fn binds_agent_and_advances_status() {
        let mut snapshot = ShipmentSnapshot::new("shp-1".to_string());

        let event = ShipmentEvent::new(
            4,
            "shp-1".to_string(),
            "admin-1".to_string(),
            "cmd-1".to_string(),
            ShipmentStatus::Assigned,
            None,
            None,
            ShipmentEventType::Assigned,
            EventPayload::Assigned {
                agent_id: "agent-7".to_string(),
            },
        );

        AssignedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.status, ShipmentStatus::Assigned);
        assert_eq!(snapshot.delivery_agent_id.as_deref(), Some("agent-7"));
        assert_eq!(snapshot.last_sequence, 4);
    }
}
