//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles one
//! specific event type. Appliers are PURE functions: they fold an event
//! into a shipment snapshot and touch nothing else.

use enum_dispatch::enum_dispatch;

use shared::shipment::EventPayload;
use shared::ShipmentEvent;

mod accepted;
mod assigned;
mod created;
mod delivered;
mod departed;
mod failed;
mod location_updated;
mod picked_up;
mod rejected;

pub use accepted::AcceptedApplier;
pub use assigned::AssignedApplier;
pub use created::CreatedApplier;
pub use delivered::DeliveredApplier;
pub use departed::DepartedApplier;
pub use failed::FailedApplier;
pub use location_updated::LocationUpdatedApplier;
pub use picked_up::PickedUpApplier;
pub use rejected::RejectedApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    Created(CreatedApplier),
    Assigned(AssignedApplier),
    Accepted(AcceptedApplier),
    Rejected(RejectedApplier),
    PickedUp(PickedUpApplier),
    Departed(DepartedApplier),
    LocationUpdated(LocationUpdatedApplier),
    Delivered(DeliveredApplier),
    Failed(FailedApplier),
}

/// Convert a ShipmentEvent reference to its applier
///
/// This is the ONLY place with a match on EventPayload.
impl From<&ShipmentEvent> for EventAction {
    fn from(event: &ShipmentEvent) -> Self {
        match &event.payload {
            EventPayload::Created { .. } => EventAction::Created(CreatedApplier),
            EventPayload::Assigned { .. } => EventAction::Assigned(AssignedApplier),
            EventPayload::Accepted { .. } => EventAction::Accepted(AcceptedApplier),
            EventPayload::Rejected { .. } => EventAction::Rejected(RejectedApplier),
            EventPayload::PickedUp {} => EventAction::PickedUp(PickedUpApplier),
            EventPayload::Departed {} => EventAction::Departed(DepartedApplier),
            EventPayload::LocationUpdated {} => {
                EventAction::LocationUpdated(LocationUpdatedApplier)
            }
            EventPayload::Delivered { .. } => EventAction::Delivered(DeliveredApplier),
            EventPayload::Failed {} => EventAction::Failed(FailedApplier),
        }
    }
}
