//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles one
//! specific command type. Checkout is constructed by the manager (it
//! injects catalog snapshots and runs once per seller group), everything
//! else converts straight from the command payload.

use async_trait::async_trait;

use crate::fulfillment::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError};
use shared::{CommandPayload, DispatchCommand, ShipmentEvent};

mod accept;
mod assign;
mod checkout;
mod complete;
mod depart;
mod fail;
mod pickup;
mod reject;
mod update_location;

pub use accept::AcceptShipmentAction;
pub use assign::AssignAgentAction;
pub use checkout::{CheckoutAction, CheckoutPricing, ResolvedLine};
pub use complete::CompleteAction;
pub use depart::DepartAction;
pub use fail::FailShipmentAction;
pub use pickup::PickupAction;
pub use reject::RejectShipmentAction;
pub use update_location::UpdateLocationAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    Checkout(CheckoutAction),
    Accept(AcceptShipmentAction),
    Reject(RejectShipmentAction),
    Assign(AssignAgentAction),
    Pickup(PickupAction),
    Depart(DepartAction),
    Complete(CompleteAction),
    Fail(FailShipmentAction),
    UpdateLocation(UpdateLocationAction),
}

#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        match self {
            CommandAction::Checkout(action) => action.execute(ctx, metadata).await,
            CommandAction::Accept(action) => action.execute(ctx, metadata).await,
            CommandAction::Reject(action) => action.execute(ctx, metadata).await,
            CommandAction::Assign(action) => action.execute(ctx, metadata).await,
            CommandAction::Pickup(action) => action.execute(ctx, metadata).await,
            CommandAction::Depart(action) => action.execute(ctx, metadata).await,
            CommandAction::Complete(action) => action.execute(ctx, metadata).await,
            CommandAction::Fail(action) => action.execute(ctx, metadata).await,
            CommandAction::UpdateLocation(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert a DispatchCommand into its action
///
/// This is the ONLY place with a match on CommandPayload.
impl From<&DispatchCommand> for CommandAction {
    fn from(cmd: &DispatchCommand) -> Self {
        match &cmd.payload {
            CommandPayload::Checkout { .. } => {
                // Checkout needs catalog resolution and per-seller-group
                // transactions; the manager builds CheckoutAction directly.
                unreachable!("Checkout is handled by DispatchManager, not From<&DispatchCommand>")
            }
            CommandPayload::AcceptShipment { shipment_id } => {
                CommandAction::Accept(AcceptShipmentAction {
                    shipment_id: shipment_id.clone(),
                })
            }
            CommandPayload::RejectShipment { shipment_id } => {
                CommandAction::Reject(RejectShipmentAction {
                    shipment_id: shipment_id.clone(),
                })
            }
            CommandPayload::AutoAssign { shipment_id } => {
                CommandAction::Assign(AssignAgentAction {
                    shipment_id: shipment_id.clone(),
                    agent_id: None,
                })
            }
            CommandPayload::AssignAgent {
                shipment_id,
                agent_id,
            } => CommandAction::Assign(AssignAgentAction {
                shipment_id: shipment_id.clone(),
                agent_id: Some(agent_id.clone()),
            }),
            CommandPayload::Pickup {
                shipment_id,
                location,
            } => CommandAction::Pickup(PickupAction {
                shipment_id: shipment_id.clone(),
                location: *location,
            }),
            CommandPayload::Depart {
                shipment_id,
                location,
            } => CommandAction::Depart(DepartAction {
                shipment_id: shipment_id.clone(),
                location: *location,
            }),
            CommandPayload::Complete {
                shipment_id,
                otp_code,
                location,
                signature,
            } => CommandAction::Complete(CompleteAction {
                shipment_id: shipment_id.clone(),
                otp_code: otp_code.clone(),
                location: *location,
                signature: signature.clone(),
            }),
            CommandPayload::FailShipment {
                shipment_id,
                reason,
            } => CommandAction::Fail(FailShipmentAction {
                shipment_id: shipment_id.clone(),
                reason: reason.clone(),
            }),
            CommandPayload::UpdateLocation {
                shipment_id,
                location,
            } => CommandAction::UpdateLocation(UpdateLocationAction {
                shipment_id: shipment_id.clone(),
                location: *location,
            }),
        }
    }
}
