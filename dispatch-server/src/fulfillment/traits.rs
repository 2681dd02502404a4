//! Core traits and context for the command pipeline
//!
//! - [`CommandHandler`]: one implementation per command; validates against
//!   current state and emits events plus entity mutations
//! - [`EventApplier`]: one implementation per event type; pure fold of an
//!   event into a shipment snapshot
//! - [`CommandContext`]: transaction-scoped view of storage with
//!   write-buffered entities, so a failing command leaves no partial state

use std::collections::BTreeMap;

use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;
use shared::{AgentProfile, Caller, Order, ShipmentEvent, ShipmentSnapshot, ShipmentStatus};
use thiserror::Error;

use super::appliers::{
    AcceptedApplier, AssignedApplier, CreatedApplier, DeliveredApplier, DepartedApplier,
    EventAction, FailedApplier, LocationUpdatedApplier, PickedUpApplier, RejectedApplier,
};
use super::storage::{DispatchStorage, StorageError};

/// Domain errors surfaced by command handlers
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Shipment not found: {0}")]
    ShipmentNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid shipping address: {0}")]
    InvalidAddress(String),

    #[error("Shipment {0} is not assigned to you")]
    NotAssignedToYou(String),

    #[error("Shipment {0} is already assigned to another delivery agent")]
    AlreadyAssigned(String),

    #[error("No delivery agents available at the moment")]
    NoAgentsAvailable,

    #[error("Invalid OTP code")]
    InvalidOtp,

    #[error("Agent {0} is not eligible for assignments")]
    AgentNotEligible(String),

    #[error("Shipment {shipment_id} cannot {attempted} from {from}")]
    InvalidTransition {
        shipment_id: String,
        from: ShipmentStatus,
        attempted: &'static str,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for DispatchError {
    fn from(err: StorageError) -> Self {
        DispatchError::Storage(err.to_string())
    }
}

/// Metadata extracted from the command envelope
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub caller: Caller,
    /// Client timestamp (audit only)
    pub timestamp: i64,
}

/// Transaction-scoped command context
///
/// Entity reads go through a write buffer so a handler observes its own
/// pending mutations; nothing reaches storage until the manager persists
/// the buffers and commits the transaction.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a DispatchStorage,
    sequence: u64,
    shipments: BTreeMap<String, ShipmentSnapshot>,
    orders: BTreeMap<String, Order>,
    agents: BTreeMap<String, AgentProfile>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a DispatchStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            sequence: current_sequence,
            shipments: BTreeMap::new(),
            orders: BTreeMap::new(),
            agents: BTreeMap::new(),
        }
    }

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Highest sequence number allocated so far
    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    pub fn txn(&self) -> &WriteTransaction {
        self.txn
    }

    pub fn storage(&self) -> &DispatchStorage {
        self.storage
    }

    // ========== Shipments ==========

    pub fn load_shipment(&self, shipment_id: &str) -> Result<ShipmentSnapshot, DispatchError> {
        if let Some(buffered) = self.shipments.get(shipment_id) {
            return Ok(buffered.clone());
        }
        self.storage
            .get_shipment_txn(self.txn, shipment_id)?
            .ok_or_else(|| DispatchError::ShipmentNotFound(shipment_id.to_string()))
    }

    pub fn save_shipment(&mut self, snapshot: ShipmentSnapshot) {
        self.shipments.insert(snapshot.shipment_id.clone(), snapshot);
    }

    pub fn modified_shipments(&self) -> impl Iterator<Item = &ShipmentSnapshot> {
        self.shipments.values()
    }

    // ========== Orders ==========

    pub fn load_order(&self, order_id: &str) -> Result<Order, DispatchError> {
        if let Some(buffered) = self.orders.get(order_id) {
            return Ok(buffered.clone());
        }
        self.storage
            .get_order_txn(self.txn, order_id)?
            .ok_or_else(|| DispatchError::OrderNotFound(order_id.to_string()))
    }

    pub fn save_order(&mut self, order: Order) {
        self.orders.insert(order.order_id.clone(), order);
    }

    pub fn modified_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    // ========== Agents ==========

    pub fn load_agent(&self, agent_id: &str) -> Result<AgentProfile, DispatchError> {
        if let Some(buffered) = self.agents.get(agent_id) {
            return Ok(buffered.clone());
        }
        self.storage
            .get_agent_txn(self.txn, agent_id)?
            .ok_or_else(|| DispatchError::AgentNotFound(agent_id.to_string()))
    }

    /// All registered agents in stable id order, buffered versions winning
    pub fn all_agents(&self) -> Result<Vec<AgentProfile>, DispatchError> {
        let mut agents = self.storage.get_agents_txn(self.txn)?;
        for agent in &mut agents {
            if let Some(buffered) = self.agents.get(&agent.agent_id) {
                *agent = buffered.clone();
            }
        }
        Ok(agents)
    }

    pub fn save_agent(&mut self, agent: AgentProfile) {
        self.agents.insert(agent.agent_id.clone(), agent);
    }

    pub fn modified_agents(&self) -> impl Iterator<Item = &AgentProfile> {
        self.agents.values()
    }

    // ========== Indices ==========

    pub fn tracking_exists(&self, tracking_number: &str) -> Result<bool, DispatchError> {
        Ok(self
            .storage
            .get_shipment_id_by_tracking_txn(self.txn, tracking_number)?
            .is_some())
    }
}

/// Command handler - validates and produces events
#[async_trait]
pub trait CommandHandler {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError>;
}

/// Event applier - pure fold of one event into a shipment snapshot
#[enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut ShipmentSnapshot, event: &ShipmentEvent);
}
