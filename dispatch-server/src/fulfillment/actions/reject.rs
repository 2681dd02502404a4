//! RejectShipment command handler
//!
//! Only the bound agent may reject, and only from the `Assigned` state:
//! rejecting a never-assigned shipment fails rather than silently
//! succeeding. The shipment returns to the pool with the agent cleared.

use async_trait::async_trait;
use tracing::info;

use crate::fulfillment::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError};
use shared::shipment::{EventPayload, ShipmentEventType};
use shared::{ShipmentEvent, ShipmentStatus};

pub struct RejectShipmentAction {
    pub shipment_id: String,
}

#[async_trait]
impl CommandHandler for RejectShipmentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        let shipment = ctx.load_shipment(&self.shipment_id)?;
        let agent_id = metadata.caller.id.clone();

        if shipment.status != ShipmentStatus::Assigned {
            return Err(DispatchError::InvalidTransition {
                shipment_id: self.shipment_id.clone(),
                from: shipment.status,
                attempted: "reject",
            });
        }
        if !shipment.is_bound_to(&agent_id) {
            return Err(DispatchError::NotAssignedToYou(self.shipment_id.clone()));
        }

        // Remove from the agent's working set
        let mut agent = ctx.load_agent(&agent_id)?;
        agent.current_assignments.retain(|id| id != &self.shipment_id);
        agent.updated_at = metadata.timestamp;
        ctx.save_agent(agent);

        let seq = ctx.next_sequence();
        let event = ShipmentEvent::new(
            seq,
            self.shipment_id.clone(),
            agent_id.clone(),
            metadata.command_id.clone(),
            ShipmentStatus::Pending,
            Some("Delivery agent rejected the assignment".to_string()),
            None,
            ShipmentEventType::Rejected,
            EventPayload::Rejected { agent_id },
        );

        info!(shipment_id = %self.shipment_id, "Assignment rejected, shipment returned to pool");
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fulfillment::storage::DispatchStorage;
    use shared::{AgentProfile, AgentStatus, Caller, KycStatus, Role, ShipmentSnapshot, VehicleType};

    fn setup_assigned(agent_id: &str) -> DispatchStorage {
        let storage = DispatchStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();

        let mut shipment = ShipmentSnapshot::new("shp-1".to_string());
        shipment.status = ShipmentStatus::Assigned;
        shipment.delivery_agent_id = Some(agent_id.to_string());
        storage.store_shipment(&txn, &shipment).unwrap();

        let mut agent = AgentProfile::new(agent_id, VehicleType::Bike, "south");
        agent.kyc_status = KycStatus::Approved;
        agent.status = AgentStatus::Active;
        agent.current_assignments.push("shp-1".to_string());
        storage.store_agent(&txn, &agent).unwrap();

        txn.commit().unwrap();
        storage
    }

    fn metadata_for(agent_id: &str) -> CommandMetadata {
        CommandMetadata {
            command_id: uuid::Uuid::new_v4().to_string(),
            caller: Caller::new(agent_id, Role::DeliveryAgent),
            timestamp: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn bound_agent_can_reject() {
        let storage = setup_assigned("agent-1");
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = RejectShipmentAction {
            shipment_id: "shp-1".to_string(),
        };
        let events = action.execute(&mut ctx, &metadata_for("agent-1")).await.unwrap();

        assert_eq!(events[0].event_type, ShipmentEventType::Rejected);
        assert_eq!(events[0].status, ShipmentStatus::Pending);

        let agent = ctx.modified_agents().next().unwrap();
        assert!(agent.current_assignments.is_empty());
    }

    #[tokio::test]
    async fn rejecting_unassigned_shipment_fails() {
        let storage = DispatchStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let shipment = ShipmentSnapshot::new("shp-1".to_string());
        storage.store_shipment(&txn, &shipment).unwrap();
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let action = RejectShipmentAction {
            shipment_id: "shp-1".to_string(),
        };
        let err = action.execute(&mut ctx, &metadata_for("agent-1")).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidTransition {
                from: ShipmentStatus::Pending,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn other_agent_cannot_reject() {
        let storage = setup_assigned("agent-1");
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = RejectShipmentAction {
            shipment_id: "shp-1".to_string(),
        };
        let err = action.execute(&mut ctx, &metadata_for("agent-2")).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotAssignedToYou(_)));
    }
}
