//! redb-based storage layer for the dispatch engine
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `shipments` | `shipment_id` | `ShipmentSnapshot` | Current shipment state |
//! | `shipment_events` | `(shipment_id, sequence)` | `ShipmentEvent` | Append-only audit trail |
//! | `orders` | `order_id` | `Order` | Seller-scoped orders |
//! | `agents` | `agent_id` | `AgentProfile` | Delivery agent profiles |
//! | `stock` | `product_id` | `StockRecord` | Inventory counters |
//! | `earnings` | `shipment_id` | `EarningsEntry` | One entry per delivered shipment |
//! | `pending_shipments` | `shipment_id` | `()` | Unassigned-shipment index |
//! | `tracking_index` | `tracking_number` | `shipment_id` | Tracking number uniqueness + lookup |
//! | `carts` | `customer_id` | `Vec<PurchaseItem>` | Stored carts |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | `"seq"` | `u64` | Global event sequence |
//!
//! # Atomicity
//!
//! redb admits a single write transaction at a time; every conditional
//! guard (stock check, shipment status check, unset-agent check, OTP
//! check) runs inside the same exclusive transaction as its mutation.
//! That transaction is the engine's compare-and-swap primitive.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::{
    AgentProfile, EarningsEntry, Order, PurchaseItem, ShipmentEvent, ShipmentSnapshot, StockRecord,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const SHIPMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("shipments");

const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("shipment_events");

const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

const AGENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("agents");

const STOCK_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("stock");

const EARNINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("earnings");

/// Existence-only index of unassigned pending shipments
const PENDING_SHIPMENTS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("pending_shipments");

const TRACKING_TABLE: TableDefinition<&str, &str> = TableDefinition::new("tracking_index");

const CARTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("carts");

const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Dispatch storage backed by redb
///
/// Commits are durable as soon as `commit()` returns; the database file
/// is always left in a consistent state.
#[derive(Clone)]
pub struct DispatchStorage {
    db: Arc<Database>,
}

impl DispatchStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(SHIPMENTS_TABLE)?;
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(AGENTS_TABLE)?;
            let _ = write_txn.open_table(STOCK_TABLE)?;
            let _ = write_txn.open_table(EARNINGS_TABLE)?;
            let _ = write_txn.open_table(PENDING_SHIPMENTS_TABLE)?;
            let _ = write_txn.open_table(TRACKING_TABLE)?;
            let _ = write_txn.open_table(CARTS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Set sequence number (within transaction)
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Event Operations ==========

    /// Append an event to the audit trail
    pub fn store_event(&self, txn: &WriteTransaction, event: &ShipmentEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let key = (event.shipment_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get all events for a shipment, in sequence order
    pub fn get_events_for_shipment(&self, shipment_id: &str) -> StorageResult<Vec<ShipmentEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        let range_start = (shipment_id, 0u64);
        let range_end = (shipment_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: ShipmentEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Get events across all shipments with sequence greater than the given one
    pub fn get_events_since(&self, since_sequence: u64) -> StorageResult<Vec<ShipmentEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let event: ShipmentEvent = serde_json::from_slice(value.value())?;
            if event.sequence > since_sequence {
                events.push(event);
            }
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Shipment Operations ==========

    /// Store a shipment snapshot
    pub fn store_shipment(
        &self,
        txn: &WriteTransaction,
        snapshot: &ShipmentSnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SHIPMENTS_TABLE)?;
        let value = serde_json::to_vec(snapshot)?;
        table.insert(snapshot.shipment_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a shipment snapshot by id
    pub fn get_shipment(&self, shipment_id: &str) -> StorageResult<Option<ShipmentSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SHIPMENTS_TABLE)?;
        match table.get(shipment_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a shipment snapshot by id (within transaction)
    pub fn get_shipment_txn(
        &self,
        txn: &WriteTransaction,
        shipment_id: &str,
    ) -> StorageResult<Option<ShipmentSnapshot>> {
        let table = txn.open_table(SHIPMENTS_TABLE)?;
        match table.get(shipment_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All shipments currently bound to the given agent
    pub fn get_shipments_for_agent(&self, agent_id: &str) -> StorageResult<Vec<ShipmentSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SHIPMENTS_TABLE)?;

        let mut shipments = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let snapshot: ShipmentSnapshot = serde_json::from_slice(value.value())?;
            if snapshot.delivery_agent_id.as_deref() == Some(agent_id) {
                shipments.push(snapshot);
            }
        }
        Ok(shipments)
    }

    // ========== Pending Shipment Index ==========

    /// Mark a shipment as pending (awaiting assignment)
    pub fn mark_pending(&self, txn: &WriteTransaction, shipment_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_SHIPMENTS_TABLE)?;
        table.insert(shipment_id, ())?;
        Ok(())
    }

    /// Remove a shipment from the pending index
    pub fn clear_pending(&self, txn: &WriteTransaction, shipment_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_SHIPMENTS_TABLE)?;
        table.remove(shipment_id)?;
        Ok(())
    }

    /// Snapshots of all pending, unassigned shipments
    pub fn get_pending_shipments(&self) -> StorageResult<Vec<ShipmentSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let pending_table = read_txn.open_table(PENDING_SHIPMENTS_TABLE)?;
        let shipments_table = read_txn.open_table(SHIPMENTS_TABLE)?;

        let mut shipments = Vec::new();
        for result in pending_table.iter()? {
            let (key, _) = result?;
            if let Some(value) = shipments_table.get(key.value())? {
                let snapshot: ShipmentSnapshot = serde_json::from_slice(value.value())?;
                shipments.push(snapshot);
            }
        }
        Ok(shipments)
    }

    // ========== Tracking Number Index ==========

    /// Record a tracking number for a shipment
    pub fn index_tracking(
        &self,
        txn: &WriteTransaction,
        tracking_number: &str,
        shipment_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TRACKING_TABLE)?;
        table.insert(tracking_number, shipment_id)?;
        Ok(())
    }

    /// Resolve a tracking number to a shipment id
    pub fn get_shipment_id_by_tracking(
        &self,
        tracking_number: &str,
    ) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRACKING_TABLE)?;
        Ok(table
            .get(tracking_number)?
            .map(|guard| guard.value().to_string()))
    }

    /// Resolve a tracking number to a shipment id (within transaction)
    pub fn get_shipment_id_by_tracking_txn(
        &self,
        txn: &WriteTransaction,
        tracking_number: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(TRACKING_TABLE)?;
        Ok(table
            .get(tracking_number)?
            .map(|guard| guard.value().to_string()))
    }

    // ========== Order Operations ==========

    /// Store an order
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.order_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an order by id
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by id (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All orders belonging to a customer
    pub fn get_orders_for_customer(&self, customer_id: &str) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            if order.customer_id == customer_id {
                orders.push(order);
            }
        }
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(orders)
    }

    // ========== Agent Operations ==========

    /// Store an agent profile (within transaction)
    pub fn store_agent(&self, txn: &WriteTransaction, agent: &AgentProfile) -> StorageResult<()> {
        let mut table = txn.open_table(AGENTS_TABLE)?;
        let value = serde_json::to_vec(agent)?;
        table.insert(agent.agent_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Store an agent profile in its own transaction (registration path)
    pub fn upsert_agent(&self, agent: &AgentProfile) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.store_agent(&txn, agent)?;
        txn.commit()?;
        Ok(())
    }

    /// Get an agent profile by id
    pub fn get_agent(&self, agent_id: &str) -> StorageResult<Option<AgentProfile>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AGENTS_TABLE)?;
        match table.get(agent_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an agent profile by id (within transaction)
    pub fn get_agent_txn(
        &self,
        txn: &WriteTransaction,
        agent_id: &str,
    ) -> StorageResult<Option<AgentProfile>> {
        let table = txn.open_table(AGENTS_TABLE)?;
        match table.get(agent_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All agent profiles in stable id order (within transaction)
    pub fn get_agents_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<AgentProfile>> {
        let table = txn.open_table(AGENTS_TABLE)?;
        let mut agents = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            agents.push(serde_json::from_slice(value.value())?);
        }
        Ok(agents)
    }

    // ========== Stock Operations ==========

    /// Get stock counters for a product
    pub fn get_stock(&self, product_id: &str) -> StorageResult<Option<StockRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;
        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get stock counters for a product (within transaction)
    pub fn get_stock_txn(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> StorageResult<Option<StockRecord>> {
        let table = txn.open_table(STOCK_TABLE)?;
        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Write stock counters (within transaction)
    pub fn put_stock(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
        record: &StockRecord,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STOCK_TABLE)?;
        let value = serde_json::to_vec(record)?;
        table.insert(product_id, value.as_slice())?;
        Ok(())
    }

    /// Seed stock counters in a standalone transaction
    pub fn set_stock(&self, product_id: &str, record: &StockRecord) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.put_stock(&txn, product_id, record)?;
        txn.commit()?;
        Ok(())
    }

    // ========== Earnings Operations ==========

    /// Store an earnings entry, keyed by shipment id (one per shipment)
    pub fn store_earnings(&self, txn: &WriteTransaction, entry: &EarningsEntry) -> StorageResult<()> {
        let mut table = txn.open_table(EARNINGS_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert(entry.shipment_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get the earnings entry for a shipment
    pub fn get_earnings_for_shipment(
        &self,
        shipment_id: &str,
    ) -> StorageResult<Option<EarningsEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EARNINGS_TABLE)?;
        match table.get(shipment_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All earnings entries for an agent, newest first
    pub fn get_earnings_for_agent(&self, agent_id: &str) -> StorageResult<Vec<EarningsEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EARNINGS_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let entry: EarningsEntry = serde_json::from_slice(value.value())?;
            if entry.agent_id == agent_id {
                entries.push(entry);
            }
        }
        entries.sort_by_key(|e| std::cmp::Reverse(e.earned_at));
        Ok(entries)
    }

    // ========== Cart Operations ==========

    /// Get a customer's stored cart
    pub fn get_cart(&self, customer_id: &str) -> StorageResult<Vec<PurchaseItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;
        match table.get(customer_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace a customer's stored cart
    pub fn put_cart(&self, customer_id: &str, items: &[PurchaseItem]) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(CARTS_TABLE)?;
            let value = serde_json::to_vec(items)?;
            table.insert(customer_id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Clear a customer's stored cart
    pub fn clear_cart(&self, customer_id: &str) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(CARTS_TABLE)?;
            table.remove(customer_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let shipments_table = read_txn.open_table(SHIPMENTS_TABLE)?;
        let events_table = read_txn.open_table(EVENTS_TABLE)?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;
        let pending_table = read_txn.open_table(PENDING_SHIPMENTS_TABLE)?;
        let commands_table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            shipment_count: shipments_table.len()?,
            event_count: events_table.len()?,
            order_count: orders_table.len()?,
            pending_shipment_count: pending_table.len()?,
            processed_command_count: commands_table.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub shipment_count: u64,
    pub event_count: u64,
    pub order_count: u64,
    pub pending_shipment_count: u64,
    pub processed_command_count: u64,
    pub current_sequence: u64,
}
