//! Shipment domain types
//!
//! A shipment is the trackable delivery unit created 1:1 with an order.
//! Its state evolves exclusively through the dispatch engine's command
//! pipeline; every transition appends an immutable [`ShipmentEvent`].

pub mod event;
pub mod snapshot;

pub use event::{EventPayload, ShipmentEvent, ShipmentEventType};
pub use snapshot::{DeliveryProof, ShipmentSnapshot, ShipmentStatus};
