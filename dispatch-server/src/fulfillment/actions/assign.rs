//! AssignAgent command handler - auto-assignment and directed assignment
//!
//! With `agent_id: None` the nearest eligible agent is selected against
//! the shipment's delivery coordinates; with `Some(id)` a specific agent
//! is bound (admin flow). Either way the shipment must still be pending
//! and unbound inside the transaction, so racing assigners cannot both
//! win.

use async_trait::async_trait;
use tracing::info;

use crate::fulfillment::selection;
use crate::fulfillment::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError};
use shared::shipment::{EventPayload, ShipmentEventType};
use shared::{OrderStatus, ShipmentEvent, ShipmentStatus};

pub struct AssignAgentAction {
    pub shipment_id: String,
    /// `None` selects the nearest eligible agent
    pub agent_id: Option<String>,
}

#[async_trait]
impl CommandHandler for AssignAgentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        let shipment = ctx.load_shipment(&self.shipment_id)?;

        if shipment.status != ShipmentStatus::Pending {
            return Err(DispatchError::InvalidTransition {
                shipment_id: self.shipment_id.clone(),
                from: shipment.status,
                attempted: "assign",
            });
        }
        if shipment.delivery_agent_id.is_some() {
            return Err(DispatchError::AlreadyAssigned(self.shipment_id.clone()));
        }

        let mut agent = match &self.agent_id {
            Some(agent_id) => {
                let agent = ctx.load_agent(agent_id)?;
                if !agent.is_eligible() {
                    return Err(DispatchError::AgentNotEligible(agent_id.clone()));
                }
                agent
            }
            None => {
                let agents = ctx.all_agents()?;
                let target = shipment.delivery_address.coordinates;
                selection::select_agent(&agents, target)
                    .cloned()
                    .ok_or(DispatchError::NoAgentsAvailable)?
            }
        };

        let agent_id = agent.agent_id.clone();
        agent.current_assignments.push(self.shipment_id.clone());
        agent.total_deliveries += 1;
        agent.updated_at = metadata.timestamp;
        ctx.save_agent(agent);

        // The order is confirmed once a courier is on the hook
        let mut order = ctx.load_order(&shipment.order_id)?;
        if !order.status.is_terminal() {
            order.status = OrderStatus::Confirmed;
            order.updated_at = metadata.timestamp;
            ctx.save_order(order);
        }

        let seq = ctx.next_sequence();
        let event = ShipmentEvent::new(
            seq,
            self.shipment_id.clone(),
            metadata.caller.id.clone(),
            metadata.command_id.clone(),
            ShipmentStatus::Assigned,
            Some(format!("Assigned to delivery agent {}", agent_id)),
            None,
            ShipmentEventType::Assigned,
            EventPayload::Assigned {
                agent_id: agent_id.clone(),
            },
        );

        info!(
            shipment_id = %self.shipment_id,
            agent_id = %agent_id,
            directed = self.agent_id.is_some(),
            "Shipment assigned"
        );
        Ok(vec![event])
    }
}
