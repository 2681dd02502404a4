//! Created event applier
//!
//! Fills in the initial shipment state from the creation payload.

use crate::fulfillment::traits::EventApplier;
use shared::shipment::EventPayload;
use shared::{ShipmentEvent, ShipmentSnapshot, ShipmentStatus};

pub struct CreatedApplier;

impl EventApplier for CreatedApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent) {
        if let EventPayload::Created {
            order_id,
            tracking_number,
            otp_code,
            pickup_address,
            delivery_address,
            customer_name,
            customer_phone,
        } = &event.payload
        {
            // Set shipment_id from the event (important for replay)
            snapshot.shipment_id = event.shipment_id.clone();
            snapshot.order_id = order_id.clone();
            snapshot.tracking_number = tracking_number.clone();
            snapshot.otp_code = otp_code.clone();
            snapshot.pickup_address = pickup_address.clone();
            snapshot.delivery_address = delivery_address.clone();
            snapshot.customer_name = customer_name.clone();
            snapshot.customer_phone = customer_phone.clone();
            snapshot.status = ShipmentStatus::Pending;
            snapshot.delivery_agent_id = None;
            snapshot.created_at = event.timestamp;
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::shipment::ShipmentEventType;
    use shared::Address;

    #[test]
    fn created_applier_initializes_snapshot() {
        let mut snapshot = ShipmentSnapshot::new("shp-1".to_string());

        let event = ShipmentEvent::new(
            1,
            "shp-1".to_string(),
            "cust-1".to_string(),
            "cmd-1".to_string(),
            ShipmentStatus::Pending,
            Some("Order placed, awaiting assignment".to_string()),
            None,
            ShipmentEventType::Created,
            EventPayload::Created {
                order_id: "ord-1".to_string(),
                tracking_number: "DLGAAA11111".to_string(),
                otp_code: "654321".to_string(),
                pickup_address: None,
                delivery_address: Address {
                    street: "1 Main St".to_string(),
                    city: "Pune".to_string(),
                    state: "MH".to_string(),
                    zip_code: "411001".to_string(),
                    phone: None,
                    coordinates: None,
                },
                customer_name: "Asha".to_string(),
                customer_phone: "999".to_string(),
            },
        );

        CreatedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.order_id, "ord-1");
        assert_eq!(snapshot.tracking_number, "DLGAAA11111");
        assert_eq!(snapshot.otp_code, "654321");
        assert_eq!(snapshot.status, ShipmentStatus::Pending);
        assert!(snapshot.delivery_agent_id.is_none());
        assert_eq!(snapshot.last_sequence, 1);
    }
}
