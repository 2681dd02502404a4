//! Depart command handler
//!
//! The bound agent leaves the pickup point; valid only from `PickedUp`.
//! Advances the paired order to `Shipped`.

use async_trait::async_trait;
use tracing::info;

use crate::fulfillment::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError};
use shared::shipment::{EventPayload, ShipmentEventType};
use shared::{GeoPoint, OrderStatus, ShipmentEvent, ShipmentStatus};

pub struct DepartAction {
    pub shipment_id: String,
    pub location: Option<GeoPoint>,
}

#[async_trait]
impl CommandHandler for DepartAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        let shipment = ctx.load_shipment(&self.shipment_id)?;

        if !shipment.is_bound_to(&metadata.caller.id) {
            return Err(DispatchError::NotAssignedToYou(self.shipment_id.clone()));
        }
        if shipment.status != ShipmentStatus::PickedUp {
            return Err(DispatchError::InvalidTransition {
                shipment_id: self.shipment_id.clone(),
                from: shipment.status,
                attempted: "depart",
            });
        }

        let mut order = ctx.load_order(&shipment.order_id)?;
        if !order.status.is_terminal() {
            order.status = OrderStatus::Shipped;
            order.updated_at = metadata.timestamp;
            ctx.save_order(order);
        }

        let seq = ctx.next_sequence();
        let event = ShipmentEvent::new(
            seq,
            self.shipment_id.clone(),
            metadata.caller.id.clone(),
            metadata.command_id.clone(),
            ShipmentStatus::InTransit,
            Some("Package is in transit".to_string()),
            self.location,
            ShipmentEventType::Departed,
            EventPayload::Departed {},
        );

        info!(shipment_id = %self.shipment_id, "Shipment in transit");
        Ok(vec![event])
    }
}
