//! Shared types for the delivery marketplace dispatch engine
//!
//! This crate holds the wire and domain types exchanged between the
//! dispatch server and its clients:
//!
//! - **`shipment`**: shipment snapshot, state machine status, event log types
//! - **`order`**: seller-scoped orders created at checkout
//! - **`agent`**: delivery agent profiles and working sets
//! - **`earnings`**: per-delivery earnings entries and balances
//! - **`command`**: command envelope, payloads and responses
//! - **`catalog`**: read-only product snapshots and stock counters
//! - **`geo`**: coordinates and address snapshots

pub mod agent;
pub mod catalog;
pub mod command;
pub mod earnings;
pub mod geo;
pub mod order;
pub mod shipment;
pub mod types;
pub mod util;

// Re-export the most commonly used types
pub use agent::{AgentProfile, AgentStatus, EarningsBalance, KycStatus, VehicleType};
pub use catalog::{ProductSnapshot, StockRecord};
pub use command::{
    CommandError, CommandErrorCode, CommandPayload, CommandResponse, DispatchCommand, PlacedOrder,
    PurchaseItem,
};
pub use earnings::{EarningsBreakdown, EarningsEntry, EarningsStatus};
pub use geo::{Address, GeoPoint};
pub use order::{Order, OrderLine, OrderStatus};
pub use shipment::{
    DeliveryProof, EventPayload, ShipmentEvent, ShipmentEventType, ShipmentSnapshot,
    ShipmentStatus,
};
pub use types::{Caller, Role};
