//! UpdateLocation command handler
//!
//! Advisory position report from the bound agent. Allowed in any
//! non-terminal state; does not advance the state machine.

use async_trait::async_trait;

use crate::fulfillment::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError};
use shared::agent::LocationPing;
use shared::shipment::{EventPayload, ShipmentEventType};
use shared::{GeoPoint, ShipmentEvent};

pub struct UpdateLocationAction {
    pub shipment_id: String,
    pub location: GeoPoint,
}

#[async_trait]
impl CommandHandler for UpdateLocationAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        let shipment = ctx.load_shipment(&self.shipment_id)?;

        if !shipment.is_bound_to(&metadata.caller.id) {
            return Err(DispatchError::NotAssignedToYou(self.shipment_id.clone()));
        }
        if shipment.status.is_terminal() {
            return Err(DispatchError::InvalidTransition {
                shipment_id: self.shipment_id.clone(),
                from: shipment.status,
                attempted: "update location",
            });
        }

        // Keep the agent's own advisory position fresh as well
        let mut agent = ctx.load_agent(&metadata.caller.id)?;
        agent.last_location = Some(LocationPing {
            point: self.location,
            timestamp: metadata.timestamp,
        });
        agent.updated_at = metadata.timestamp;
        ctx.save_agent(agent);

        let seq = ctx.next_sequence();
        let event = ShipmentEvent::new(
            seq,
            self.shipment_id.clone(),
            metadata.caller.id.clone(),
            metadata.command_id.clone(),
            shipment.status,
            None,
            Some(self.location),
            ShipmentEventType::LocationUpdated,
            EventPayload::LocationUpdated {},
        );
        Ok(vec![event])
    }
}
