//! FailShipment command handler
//!
//! Terminal operational failure. The bound agent (or an admin) can fail
//! any non-terminal shipment; the reason lands in the audit trail.

use async_trait::async_trait;
use tracing::warn;

use crate::fulfillment::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError};
use shared::shipment::{EventPayload, ShipmentEventType};
use shared::{Role, ShipmentEvent, ShipmentStatus};

pub struct FailShipmentAction {
    pub shipment_id: String,
    pub reason: String,
}

#[async_trait]
impl CommandHandler for FailShipmentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        let shipment = ctx.load_shipment(&self.shipment_id)?;

        if shipment.status.is_terminal() {
            return Err(DispatchError::InvalidTransition {
                shipment_id: self.shipment_id.clone(),
                from: shipment.status,
                attempted: "fail",
            });
        }
        let is_admin = metadata.caller.role == Role::Admin;
        if !is_admin && !shipment.is_bound_to(&metadata.caller.id) {
            return Err(DispatchError::NotAssignedToYou(self.shipment_id.clone()));
        }

        // Failed shipments leave the agent's working set
        if let Some(agent_id) = &shipment.delivery_agent_id
            && let Ok(mut agent) = ctx.load_agent(agent_id)
        {
            agent.current_assignments.retain(|id| id != &self.shipment_id);
            agent.updated_at = metadata.timestamp;
            ctx.save_agent(agent);
        }

        let seq = ctx.next_sequence();
        let event = ShipmentEvent::new(
            seq,
            self.shipment_id.clone(),
            metadata.caller.id.clone(),
            metadata.command_id.clone(),
            ShipmentStatus::Failed,
            Some(self.reason.clone()),
            None,
            ShipmentEventType::Failed,
            EventPayload::Failed {},
        );

        warn!(
            shipment_id = %self.shipment_id,
            reason = %self.reason,
            "Shipment failed"
        );
        Ok(vec![event])
    }
}
