//! Order Fulfillment & Delivery Dispatch Engine
//!
//! This module turns checkouts into seller-scoped orders with trackable
//! shipments, binds shipments to delivery agents, walks each shipment
//! through an OTP-gated state machine and settles agent earnings:
//!
//! - **manager**: DispatchManager for command processing
//! - **storage**: redb-based persistence (snapshots, events, counters)
//! - **actions**: one command handler per operation
//! - **appliers**: pure event folds into shipment snapshots
//! - **inventory**: stock reservation ledger
//! - **selection**: nearest-eligible-agent choice
//! - **payout**: earnings formula
//!
//! # Command Flow
//!
//! ```text
//! Command → DispatchManager → Action → Event(s) → Storage (redb)
//!                 ↓                        ↓
//!            Notifications          Snapshot update
//!                 ↓
//!          Event subscribers
//! ```

pub mod actions;
pub mod appliers;
pub mod inventory;
pub mod manager;
pub mod payout;
pub mod selection;
pub mod storage;
pub mod traits;

// Re-exports
pub use manager::{AssignmentStats, DispatchManager, EarningsSummary};
pub use storage::{DispatchStorage, StorageError, StorageStats};
pub use traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError, EventApplier};

// Re-export shared types for convenience
pub use shared::{
    CommandError, CommandErrorCode, CommandPayload, CommandResponse, DispatchCommand,
    ShipmentEvent, ShipmentSnapshot, ShipmentStatus,
};
