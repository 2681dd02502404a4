//! Authorization policy
//!
//! One policy function decides every (role, operation) pair, instead of
//! role checks scattered through handlers. The session provider is
//! trusted for the role itself.

use shared::Role;

/// Operations guarded by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Checkout,
    ManageCart,
    ViewOwnOrders,
    AcceptShipment,
    RejectShipment,
    AutoAssign,
    DirectAssign,
    Pickup,
    Depart,
    Complete,
    FailShipment,
    UpdateLocation,
    SetAvailability,
    ViewAssignments,
    ViewEarnings,
    ViewPendingShipments,
    TrackShipment,
}

/// Allow or deny an operation for a role
pub fn authorize(role: Role, operation: Operation) -> bool {
    use Operation::*;
    match operation {
        Checkout | ManageCart | ViewOwnOrders => role == Role::Customer,
        AcceptShipment | RejectShipment | Pickup | Depart | Complete | UpdateLocation
        | SetAvailability | ViewAssignments | ViewEarnings => role == Role::DeliveryAgent,
        FailShipment => matches!(role, Role::DeliveryAgent | Role::Admin),
        // Sellers nudge unassigned shipments toward couriers; admins run the desk
        AutoAssign | ViewPendingShipments => matches!(role, Role::Seller | Role::Admin),
        DirectAssign => role == Role::Admin,
        // Anyone logged in may follow a tracking number
        TrackShipment => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customers_shop_agents_deliver() {
        assert!(authorize(Role::Customer, Operation::Checkout));
        assert!(!authorize(Role::DeliveryAgent, Operation::Checkout));
        assert!(authorize(Role::DeliveryAgent, Operation::Complete));
        assert!(!authorize(Role::Customer, Operation::Complete));
    }

    #[test]
    fn assignment_control_is_staff_only() {
        assert!(authorize(Role::Admin, Operation::DirectAssign));
        assert!(!authorize(Role::Seller, Operation::DirectAssign));
        assert!(authorize(Role::Seller, Operation::AutoAssign));
        assert!(!authorize(Role::Customer, Operation::AutoAssign));
    }

    #[test]
    fn failing_a_shipment_takes_agent_or_admin() {
        assert!(authorize(Role::DeliveryAgent, Operation::FailShipment));
        assert!(authorize(Role::Admin, Operation::FailShipment));
        assert!(!authorize(Role::Seller, Operation::FailShipment));
    }

    #[test]
    fn anyone_can_track() {
        for role in [Role::Customer, Role::Seller, Role::DeliveryAgent, Role::Admin] {
            assert!(authorize(role, Operation::TrackShipment));
        }
    }
}
