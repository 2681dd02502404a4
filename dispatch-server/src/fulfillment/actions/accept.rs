//! AcceptShipment command handler
//!
//! Two flows share this command:
//! - self-claim: any eligible agent takes an unassigned pending shipment
//! - confirmation: the bound agent confirms a shipment assigned to them
//!
//! The status check and the agent binding happen inside one write
//! transaction; a racing agent observes `AlreadyAssigned`.

use async_trait::async_trait;
use tracing::info;

use crate::fulfillment::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError};
use shared::shipment::{EventPayload, ShipmentEventType};
use shared::{ShipmentEvent, ShipmentStatus};

pub struct AcceptShipmentAction {
    pub shipment_id: String,
}

#[async_trait]
impl CommandHandler for AcceptShipmentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        let shipment = ctx.load_shipment(&self.shipment_id)?;
        let agent_id = metadata.caller.id.clone();

        let mut agent = ctx.load_agent(&agent_id)?;
        if !agent.can_accept() {
            return Err(DispatchError::AgentNotEligible(agent_id));
        }

        let self_claim = match shipment.status {
            ShipmentStatus::Pending => {
                if shipment.delivery_agent_id.is_some() {
                    return Err(DispatchError::AlreadyAssigned(self.shipment_id.clone()));
                }
                true
            }
            ShipmentStatus::Assigned => {
                if !shipment.is_bound_to(&agent_id) {
                    return Err(DispatchError::NotAssignedToYou(self.shipment_id.clone()));
                }
                false
            }
            _ => {
                // Someone else already holds it, or it is past acceptance
                if shipment.delivery_agent_id.is_some() && !shipment.is_bound_to(&agent_id) {
                    return Err(DispatchError::AlreadyAssigned(self.shipment_id.clone()));
                }
                return Err(DispatchError::InvalidTransition {
                    shipment_id: self.shipment_id.clone(),
                    from: shipment.status,
                    attempted: "accept",
                });
            }
        };

        let note = if self_claim {
            // Claiming marks the agent online and available (idempotent)
            agent.is_online = true;
            agent.is_available = true;
            agent.total_deliveries += 1;
            agent.current_assignments.push(self.shipment_id.clone());
            format!("Accepted by delivery agent {}", agent_id)
        } else {
            "Delivery agent accepted the assignment".to_string()
        };
        agent.updated_at = metadata.timestamp;
        ctx.save_agent(agent);

        let seq = ctx.next_sequence();
        let event = ShipmentEvent::new(
            seq,
            self.shipment_id.clone(),
            agent_id.clone(),
            metadata.command_id.clone(),
            ShipmentStatus::Accepted,
            Some(note),
            None,
            ShipmentEventType::Accepted,
            EventPayload::Accepted { agent_id },
        );

        info!(
            shipment_id = %self.shipment_id,
            self_claim,
            "Shipment accepted"
        );
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fulfillment::storage::DispatchStorage;
    use shared::{AgentProfile, AgentStatus, Caller, KycStatus, Role, ShipmentSnapshot, VehicleType};

    fn approved_agent(id: &str) -> AgentProfile {
        let mut agent = AgentProfile::new(id, VehicleType::Bike, "south");
        agent.kyc_status = KycStatus::Approved;
        agent.status = AgentStatus::Active;
        agent
    }

    fn pending_shipment(id: &str) -> ShipmentSnapshot {
        let mut s = ShipmentSnapshot::new(id.to_string());
        s.order_id = "ord-1".to_string();
        s.otp_code = "123456".to_string();
        s
    }

    fn metadata_for(agent_id: &str) -> CommandMetadata {
        CommandMetadata {
            command_id: uuid::Uuid::new_v4().to_string(),
            caller: Caller::new(agent_id, Role::DeliveryAgent),
            timestamp: 1_700_000_000_000,
        }
    }

    fn setup(shipment: ShipmentSnapshot, agents: &[AgentProfile]) -> DispatchStorage {
        let storage = DispatchStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_shipment(&txn, &shipment).unwrap();
        for agent in agents {
            storage.store_agent(&txn, agent).unwrap();
        }
        txn.commit().unwrap();
        storage
    }

    #[tokio::test]
    async fn self_claim_succeeds_and_marks_agent_online() {
        let storage = setup(pending_shipment("shp-1"), &[approved_agent("agent-1")]);
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = AcceptShipmentAction {
            shipment_id: "shp-1".to_string(),
        };
        let events = action.execute(&mut ctx, &metadata_for("agent-1")).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, ShipmentEventType::Accepted);

        let agent = ctx.modified_agents().next().unwrap();
        assert!(agent.is_online);
        assert!(agent.is_available);
        assert_eq!(agent.total_deliveries, 1);
        assert_eq!(agent.current_assignments, vec!["shp-1".to_string()]);
    }

    #[tokio::test]
    async fn claim_of_already_held_shipment_fails() {
        let mut shipment = pending_shipment("shp-1");
        shipment.delivery_agent_id = Some("agent-9".to_string());
        let storage = setup(shipment, &[approved_agent("agent-1")]);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = AcceptShipmentAction {
            shipment_id: "shp-1".to_string(),
        };
        let err = action.execute(&mut ctx, &metadata_for("agent-1")).await.unwrap_err();
        assert!(matches!(err, DispatchError::AlreadyAssigned(_)));
    }

    #[tokio::test]
    async fn confirm_requires_binding() {
        let mut shipment = pending_shipment("shp-1");
        shipment.status = ShipmentStatus::Assigned;
        shipment.delivery_agent_id = Some("agent-1".to_string());
        let storage = setup(
            shipment,
            &[approved_agent("agent-1"), approved_agent("agent-2")],
        );

        // The wrong agent cannot confirm
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let action = AcceptShipmentAction {
            shipment_id: "shp-1".to_string(),
        };
        let err = action.execute(&mut ctx, &metadata_for("agent-2")).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotAssignedToYou(_)));
        drop(txn);

        // The bound agent can
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let events = action.execute(&mut ctx, &metadata_for("agent-1")).await.unwrap();
        assert_eq!(events[0].status, ShipmentStatus::Accepted);
    }

    #[tokio::test]
    async fn unapproved_agent_cannot_accept() {
        let mut agent = approved_agent("agent-1");
        agent.kyc_status = KycStatus::Pending;
        let storage = setup(pending_shipment("shp-1"), &[agent]);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let action = AcceptShipmentAction {
            shipment_id: "shp-1".to_string(),
        };
        let err = action.execute(&mut ctx, &metadata_for("agent-1")).await.unwrap_err();
        assert!(matches!(err, DispatchError::AgentNotEligible(_)));
    }

    #[tokio::test]
    async fn accept_of_delivered_shipment_fails() {
        let mut shipment = pending_shipment("shp-1");
        shipment.status = ShipmentStatus::Delivered;
        let storage = setup(shipment, &[approved_agent("agent-1")]);

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let action = AcceptShipmentAction {
            shipment_id: "shp-1".to_string(),
        };
        let err = action.execute(&mut ctx, &metadata_for("agent-1")).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidTransition { .. }));
    }
}
