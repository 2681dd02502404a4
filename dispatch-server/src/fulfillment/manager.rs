//! DispatchManager - command processing and event generation
//!
//! Every mutating operation flows through here:
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Create CommandContext
//!     ├─ 4. Convert command to action and execute
//!     ├─ 5. Apply events to shipment snapshots via EventApplier
//!     ├─ 6. Persist events, snapshots, orders, agents, indices
//!     ├─ 7. Mark command processed
//!     ├─ 8. Commit transaction
//!     ├─ 9. Broadcast event(s), emit notifications
//!     └─ 10. Return response
//! ```
//!
//! Checkout is the exception: it partitions the purchase into seller
//! groups and runs the pipeline once per group, each group atomic on its
//! own. A later group's failure leaves earlier groups committed; the
//! response then reports both the created orders and the error.

use std::sync::Arc;

use shared::{
    AgentProfile, CommandError, CommandErrorCode, CommandPayload, CommandResponse,
    DispatchCommand, EarningsEntry, GeoPoint, Order, PlacedOrder, PurchaseItem, ShipmentEvent,
    ShipmentSnapshot, ShipmentStatus,
};
use shared::agent::LocationPing;
use shared::shipment::EventPayload;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::actions::{CheckoutAction, CheckoutPricing, CommandAction, ResolvedLine};
use super::appliers::EventAction;
use super::inventory;
use super::storage::{DispatchStorage, StorageError};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError, EventApplier};
use crate::catalog::CatalogService;
use crate::notify::{NoticeCategory, Notifier};

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 16384;

impl From<DispatchError> for CommandError {
    fn from(err: DispatchError) -> Self {
        let code = match &err {
            DispatchError::ShipmentNotFound(_) => CommandErrorCode::ShipmentNotFound,
            DispatchError::OrderNotFound(_) => CommandErrorCode::OrderNotFound,
            DispatchError::AgentNotFound(_) => CommandErrorCode::AgentNotFound,
            DispatchError::ProductNotFound(_) => CommandErrorCode::ProductNotFound,
            DispatchError::InsufficientStock { .. } => CommandErrorCode::InsufficientStock,
            DispatchError::EmptyCart => CommandErrorCode::EmptyCart,
            DispatchError::InvalidAddress(_) => CommandErrorCode::InvalidAddress,
            DispatchError::NotAssignedToYou(_) => CommandErrorCode::NotAssignedToYou,
            DispatchError::AlreadyAssigned(_) => CommandErrorCode::AlreadyAssigned,
            DispatchError::NoAgentsAvailable => CommandErrorCode::NoAgentsAvailable,
            DispatchError::InvalidOtp => CommandErrorCode::InvalidOtp,
            DispatchError::AgentNotEligible(_) => CommandErrorCode::AgentNotEligible,
            DispatchError::InvalidTransition { .. } => CommandErrorCode::InvalidTransition,
            DispatchError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error during command");
                CommandErrorCode::InternalError
            }
        };
        CommandError::new(code, err.to_string())
    }
}

/// Per-agent assignment statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct AssignmentStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// Earnings listing with running sums
#[derive(Debug, Clone, serde::Serialize)]
pub struct EarningsSummary {
    pub entries: Vec<EarningsEntry>,
    pub total_net: f64,
    pub pending_net: f64,
}

/// DispatchManager - the fulfillment engine's front door
///
/// The `epoch` is a unique identifier generated on each startup; clients
/// use it to detect server restarts and resync.
pub struct DispatchManager {
    storage: DispatchStorage,
    catalog: Arc<CatalogService>,
    notifier: Notifier,
    event_tx: broadcast::Sender<ShipmentEvent>,
    pricing: CheckoutPricing,
    epoch: String,
}

impl std::fmt::Debug for DispatchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchManager")
            .field("storage", &"<DispatchStorage>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl DispatchManager {
    /// Create a manager over the given storage
    pub fn new(storage: DispatchStorage, catalog: Arc<CatalogService>, notifier: Notifier) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        info!(epoch = %epoch, "DispatchManager started with new epoch");
        Self {
            storage,
            catalog,
            notifier,
            event_tx,
            pricing: CheckoutPricing::default(),
            epoch,
        }
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<ShipmentEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &DispatchStorage {
        &self.storage
    }

    /// Get the catalog registry
    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    /// Register a product snapshot plus its sellable stock
    pub fn sync_product(
        &self,
        product: shared::ProductSnapshot,
        available: i64,
    ) -> Result<(), DispatchError> {
        inventory::sync_stock(&self.storage, &product.product_id, available)?;
        self.catalog.upsert_product(product);
        Ok(())
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: DispatchCommand) -> CommandResponse {
        match &cmd.payload {
            CommandPayload::Checkout { .. } => self.process_checkout(cmd),
            _ => match self.process_command(cmd.clone()) {
                Ok((response, events)) => {
                    self.publish(&events);
                    response
                }
                Err(err) => CommandResponse::error(cmd.command_id, err.into()),
            },
        }
    }

    /// Process a non-checkout command in a single write transaction
    fn process_command(
        &self,
        cmd: DispatchCommand,
    ) -> Result<(CommandResponse, Vec<ShipmentEvent>), DispatchError> {
        tracing::info!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 2. Begin write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within the transaction
        if self.storage.is_command_processed_txn(&txn, &cmd.command_id)? {
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 3. Context and metadata
        let current_sequence = self.storage.get_current_sequence()?;
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            caller: cmd.caller.clone(),
            timestamp: cmd.timestamp,
        };

        // 4. Convert to action and execute
        let action: CommandAction = (&cmd).into();
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))?;

        // 5-7. Apply, persist, mark processed
        let max_sequence = self.apply_and_persist(&txn, &mut ctx, &events)?;
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;
        drop(ctx);

        // 8. Commit
        txn.commit().map_err(StorageError::from)?;

        let shipment_id = events.first().map(|e| e.shipment_id.clone());
        info!(
            command_id = %cmd.command_id,
            shipment_id = ?shipment_id,
            event_count = events.len(),
            "Command processed successfully"
        );

        let mut response = CommandResponse::success(cmd.command_id);
        response.shipment_id = shipment_id;
        Ok((response, events))
    }

    /// Fold events into snapshots and persist everything the context
    /// accumulated. Returns the highest sequence seen.
    fn apply_and_persist(
        &self,
        txn: &redb::WriteTransaction,
        ctx: &mut CommandContext<'_>,
        events: &[ShipmentEvent],
    ) -> Result<u64, DispatchError> {
        // Apply events via EventApplier (pure)
        for event in events {
            let mut snapshot = ctx
                .load_shipment(&event.shipment_id)
                .unwrap_or_else(|_| ShipmentSnapshot::new(event.shipment_id.clone()));
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);
            ctx.save_shipment(snapshot);
        }

        // Persist events
        for event in events {
            self.storage.store_event(txn, event)?;
            // Fresh tracking numbers enter the uniqueness index here
            if let EventPayload::Created {
                tracking_number, ..
            } = &event.payload
            {
                self.storage
                    .index_tracking(txn, tracking_number, &event.shipment_id)?;
            }
        }

        // Persist snapshots and maintain the pending pool index
        for snapshot in ctx.modified_shipments() {
            self.storage.store_shipment(txn, snapshot)?;
            if snapshot.status == ShipmentStatus::Pending && snapshot.delivery_agent_id.is_none() {
                self.storage.mark_pending(txn, &snapshot.shipment_id)?;
            } else {
                self.storage.clear_pending(txn, &snapshot.shipment_id)?;
            }
        }

        // Persist orders and agents touched by the action
        for order in ctx.modified_orders() {
            self.storage.store_order(txn, order)?;
        }
        for agent in ctx.modified_agents() {
            self.storage.store_agent(txn, agent)?;
        }

        Ok(events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(ctx.current_sequence()))
    }

    // ========== Checkout ==========

    /// Process a checkout: validate, partition by seller, then run one
    /// atomic transaction per seller group.
    fn process_checkout(&self, cmd: DispatchCommand) -> CommandResponse {
        let CommandPayload::Checkout {
            shipping_address,
            items,
            contact_name,
        } = cmd.payload.clone()
        else {
            unreachable!("process_checkout called with a non-checkout payload")
        };
        let command_id = cmd.command_id.clone();

        match self.storage.is_command_processed(&command_id) {
            Ok(true) => {
                warn!(command_id = %command_id, "Duplicate checkout command");
                return CommandResponse::duplicate(command_id);
            }
            Ok(false) => {}
            Err(err) => {
                return CommandResponse::error(command_id, DispatchError::from(err).into());
            }
        }

        // Validation happens before any mutation
        if !shipping_address.is_complete() {
            return CommandResponse::error(
                command_id,
                DispatchError::InvalidAddress("complete shipping address is required".to_string())
                    .into(),
            );
        }

        let from_cart = items.is_none();
        let raw_items = match items {
            Some(list) => list,
            None => match self.storage.get_cart(&cmd.caller.id) {
                Ok(list) => list,
                Err(err) => {
                    return CommandResponse::error(command_id, DispatchError::from(err).into());
                }
            },
        };
        let raw_items: Vec<PurchaseItem> =
            raw_items.into_iter().filter(|item| item.quantity > 0).collect();
        if raw_items.is_empty() {
            return CommandResponse::error(command_id, DispatchError::EmptyCart.into());
        }

        // Resolve against the catalog and partition by seller. Items the
        // catalog no longer knows are dropped; the checkout fails only
        // when nothing resolvable remains.
        let mut groups: std::collections::BTreeMap<String, Vec<ResolvedLine>> =
            std::collections::BTreeMap::new();
        for item in &raw_items {
            let Some(product) = self.catalog.get_product(&item.product_id) else {
                warn!(product_id = %item.product_id, "Checkout item skipped: unknown product");
                continue;
            };
            groups.entry(product.seller_id.clone()).or_default().push(ResolvedLine {
                product,
                quantity: item.quantity,
            });
        }
        if groups.is_empty() {
            return CommandResponse::error(command_id, DispatchError::EmptyCart.into());
        }

        let metadata = CommandMetadata {
            command_id: command_id.clone(),
            caller: cmd.caller.clone(),
            timestamp: cmd.timestamp,
        };
        let customer_name = contact_name.unwrap_or_else(|| cmd.caller.id.clone());
        let customer_phone = shipping_address.phone.clone().unwrap_or_default();

        // One atomic transaction per seller group; earlier groups stay
        // committed when a later one fails (documented partial-success
        // contract of multi-seller checkout).
        let mut placed: Vec<PlacedOrder> = Vec::new();
        let mut all_events: Vec<ShipmentEvent> = Vec::new();
        let mut failure: Option<DispatchError> = None;
        let group_count = groups.len();

        for (index, (seller_id, lines)) in groups.into_iter().enumerate() {
            let action = CheckoutAction {
                seller_id: seller_id.clone(),
                shipping_address: shipping_address.clone(),
                lines,
                pickup_address: self.catalog.seller_address(&seller_id),
                customer_name: customer_name.clone(),
                customer_phone: customer_phone.clone(),
                pricing: self.pricing.clone(),
            };
            match self.process_checkout_group(&metadata, action, index == 0) {
                Ok(None) => {
                    // Raced by a resubmission of the same command id
                    return CommandResponse::duplicate(command_id);
                }
                Ok(Some((order, events))) => {
                    placed.push(order);
                    all_events.extend(events);
                }
                Err(err) => {
                    warn!(
                        command_id = %command_id,
                        seller_id = %seller_id,
                        committed_groups = placed.len(),
                        error = %err,
                        "Seller group rejected during checkout"
                    );
                    failure = Some(err);
                    break;
                }
            }
        }

        self.publish(&all_events);

        // A cart checkout clears the cart only when every group succeeded
        if from_cart && failure.is_none() && !placed.is_empty() {
            if let Err(err) = self.storage.clear_cart(&cmd.caller.id) {
                warn!(error = %err, "Failed to clear cart after checkout");
            }
        }

        info!(
            command_id = %command_id,
            orders_created = placed.len(),
            group_count,
            "Checkout finished"
        );

        match failure {
            None => CommandResponse::with_orders(command_id, placed),
            Some(err) if placed.is_empty() => CommandResponse::error(command_id, err.into()),
            Some(err) => {
                // Partial success: report both the created orders and the error
                let mut response = CommandResponse::with_orders(command_id, placed);
                response.error = Some(err.into());
                response
            }
        }
    }

    /// Run one seller group through the pipeline in its own transaction.
    /// Returns `Ok(None)` when the command id turns out to be already
    /// processed (concurrent resubmission).
    fn process_checkout_group(
        &self,
        metadata: &CommandMetadata,
        action: CheckoutAction,
        first_group: bool,
    ) -> Result<Option<(PlacedOrder, Vec<ShipmentEvent>)>, DispatchError> {
        let txn = self.storage.begin_write()?;
        if first_group && self.storage.is_command_processed_txn(&txn, &metadata.command_id)? {
            return Ok(None);
        }
        let current_sequence = self.storage.get_current_sequence()?;
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);

        let events = futures::executor::block_on(action.execute(&mut ctx, metadata))?;

        let max_sequence = self.apply_and_persist(&txn, &mut ctx, &events)?;
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }
        // The command id is burnt with the first committed group, so a
        // resubmitted checkout cannot double-create earlier groups
        if first_group {
            self.storage.mark_command_processed(&txn, &metadata.command_id)?;
        }

        let order = ctx
            .modified_orders()
            .next()
            .cloned()
            .ok_or_else(|| DispatchError::Storage("checkout produced no order".to_string()))?;
        let shipment = ctx
            .modified_shipments()
            .next()
            .cloned()
            .ok_or_else(|| DispatchError::Storage("checkout produced no shipment".to_string()))?;
        drop(ctx);

        txn.commit().map_err(StorageError::from)?;

        Ok(Some((
            PlacedOrder {
                order_id: order.order_id.clone(),
                shipment_id: shipment.shipment_id.clone(),
                seller_id: order.seller_id.clone(),
                tracking_number: shipment.tracking_number.clone(),
                otp_code: shipment.otp_code.clone(),
                total_amount: order.total_amount,
            },
            events,
        )))
    }

    // ========== Agent Administration ==========

    /// Register or replace an agent profile
    pub fn upsert_agent(&self, agent: &AgentProfile) -> Result<(), DispatchError> {
        self.storage.upsert_agent(agent)?;
        Ok(())
    }

    /// Agent availability toggle with an optional position ping
    pub fn set_availability(
        &self,
        agent_id: &str,
        is_online: bool,
        is_available: bool,
        location: Option<GeoPoint>,
    ) -> Result<AgentProfile, DispatchError> {
        let txn = self.storage.begin_write()?;
        let mut agent = self
            .storage
            .get_agent_txn(&txn, agent_id)?
            .ok_or_else(|| DispatchError::AgentNotFound(agent_id.to_string()))?;

        agent.is_online = is_online;
        agent.is_available = is_available;
        if let Some(point) = location {
            agent.last_location = Some(LocationPing {
                point,
                timestamp: shared::util::now_millis(),
            });
        }
        agent.updated_at = shared::util::now_millis();
        self.storage.store_agent(&txn, &agent)?;
        txn.commit().map_err(StorageError::from)?;

        info!(agent_id = %agent_id, is_online, is_available, "Agent availability updated");
        Ok(agent)
    }

    // ========== Queries ==========

    pub fn get_shipment(&self, shipment_id: &str) -> Result<Option<ShipmentSnapshot>, DispatchError> {
        Ok(self.storage.get_shipment(shipment_id)?)
    }

    pub fn get_shipment_by_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<Option<ShipmentSnapshot>, DispatchError> {
        match self.storage.get_shipment_id_by_tracking(tracking_number)? {
            Some(shipment_id) => Ok(self.storage.get_shipment(&shipment_id)?),
            None => Ok(None),
        }
    }

    pub fn get_pending_shipments(&self) -> Result<Vec<ShipmentSnapshot>, DispatchError> {
        Ok(self.storage.get_pending_shipments()?)
    }

    pub fn get_events_for_shipment(
        &self,
        shipment_id: &str,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        Ok(self.storage.get_events_for_shipment(shipment_id)?)
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<Option<AgentProfile>, DispatchError> {
        Ok(self.storage.get_agent(agent_id)?)
    }

    pub fn get_order(&self, order_id: &str) -> Result<Option<Order>, DispatchError> {
        Ok(self.storage.get_order(order_id)?)
    }

    pub fn get_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, DispatchError> {
        Ok(self.storage.get_orders_for_customer(customer_id)?)
    }

    /// An agent's shipments, optionally filtered by status, plus stats
    pub fn get_agent_assignments(
        &self,
        agent_id: &str,
        status: Option<ShipmentStatus>,
    ) -> Result<(Vec<ShipmentSnapshot>, AssignmentStats), DispatchError> {
        let all = self.storage.get_shipments_for_agent(agent_id)?;

        let stats = AssignmentStats {
            total: all.len(),
            pending: all
                .iter()
                .filter(|s| {
                    matches!(s.status, ShipmentStatus::Assigned | ShipmentStatus::Accepted)
                })
                .count(),
            in_progress: all
                .iter()
                .filter(|s| {
                    matches!(s.status, ShipmentStatus::PickedUp | ShipmentStatus::InTransit)
                })
                .count(),
            completed: all
                .iter()
                .filter(|s| s.status == ShipmentStatus::Delivered)
                .count(),
        };

        let shipments = match status {
            Some(wanted) => all.into_iter().filter(|s| s.status == wanted).collect(),
            None => all,
        };
        Ok((shipments, stats))
    }

    /// An agent's earnings entries with running sums
    pub fn get_agent_earnings(&self, agent_id: &str) -> Result<EarningsSummary, DispatchError> {
        let entries = self.storage.get_earnings_for_agent(agent_id)?;
        let total_net = entries.iter().map(|e| e.net_amount).sum();
        let pending_net = entries
            .iter()
            .filter(|e| e.status == shared::EarningsStatus::Pending)
            .map(|e| e.net_amount)
            .sum();
        Ok(EarningsSummary {
            entries,
            total_net,
            pending_net,
        })
    }

    // ========== Cart ==========

    pub fn get_cart(&self, customer_id: &str) -> Result<Vec<PurchaseItem>, DispatchError> {
        Ok(self.storage.get_cart(customer_id)?)
    }

    pub fn put_cart(
        &self,
        customer_id: &str,
        items: &[PurchaseItem],
    ) -> Result<(), DispatchError> {
        Ok(self.storage.put_cart(customer_id, items)?)
    }

    pub fn clear_cart(&self, customer_id: &str) -> Result<(), DispatchError> {
        Ok(self.storage.clear_cart(customer_id)?)
    }

    // ========== Broadcast & Notifications ==========

    /// Broadcast committed events and fan out notices; both best effort
    fn publish(&self, events: &[ShipmentEvent]) {
        for event in events {
            let _ = self.event_tx.send(event.clone());
            self.notify_for_event(event);
        }
    }

    /// Derive recipient notices for one committed event. Lookup or send
    /// failures are logged and never surface to the caller.
    fn notify_for_event(&self, event: &ShipmentEvent) {
        let Ok(Some(shipment)) = self.storage.get_shipment(&event.shipment_id) else {
            warn!(shipment_id = %event.shipment_id, "Notification skipped: shipment missing");
            return;
        };
        let Ok(Some(order)) = self.storage.get_order(&shipment.order_id) else {
            warn!(order_id = %shipment.order_id, "Notification skipped: order missing");
            return;
        };

        match &event.payload {
            EventPayload::Created { .. } => {
                self.notifier.send(
                    &order.seller_id,
                    format!(
                        "New order received! Order ID: {}. Total: ₹{}",
                        order.order_id, order.total_amount
                    ),
                    NoticeCategory::Order,
                );
                self.notifier.send(
                    &order.customer_id,
                    format!(
                        "Order placed. Track your delivery with {}",
                        shipment.tracking_number
                    ),
                    NoticeCategory::Order,
                );
            }
            EventPayload::Assigned { agent_id } => {
                self.notifier.send(
                    agent_id,
                    format!("New delivery assigned! Tracking: {}", shipment.tracking_number),
                    NoticeCategory::Delivery,
                );
                self.notifier.send(
                    &order.customer_id,
                    format!(
                        "A delivery agent has been assigned to your order {}",
                        order.order_id
                    ),
                    NoticeCategory::Order,
                );
            }
            EventPayload::Accepted { .. } => {
                self.notifier.send(
                    &order.customer_id,
                    format!(
                        "A delivery agent has been assigned to your order {}",
                        order.order_id
                    ),
                    NoticeCategory::Order,
                );
                self.notifier.send(
                    &order.seller_id,
                    format!("Order {} has been assigned to a delivery agent", order.order_id),
                    NoticeCategory::Order,
                );
            }
            EventPayload::PickedUp {} => {
                self.notifier.send(
                    &order.customer_id,
                    format!(
                        "Your order {} has been picked up and is on the way!",
                        order.order_id
                    ),
                    NoticeCategory::Order,
                );
            }
            EventPayload::Departed {} => {
                self.notifier.send(
                    &order.customer_id,
                    format!("Your order {} is out for delivery!", order.order_id),
                    NoticeCategory::Order,
                );
            }
            EventPayload::Delivered { .. } => {
                self.notifier.send(
                    &order.customer_id,
                    format!("Your order {} has been delivered successfully!", order.order_id),
                    NoticeCategory::Order,
                );
                self.notifier.send(
                    &order.seller_id,
                    format!("Order {} has been delivered to customer", order.order_id),
                    NoticeCategory::Order,
                );
                if let Ok(Some(entry)) = self.storage.get_earnings_for_shipment(&event.shipment_id)
                {
                    self.notifier.send(
                        &entry.agent_id,
                        format!("Delivery completed! You earned ₹{:.2}", entry.net_amount),
                        NoticeCategory::Payment,
                    );
                }
            }
            EventPayload::Failed {} => {
                self.notifier.send(
                    &order.customer_id,
                    format!("Delivery of order {} failed, we are on it", order.order_id),
                    NoticeCategory::Order,
                );
            }
            EventPayload::Rejected { .. } | EventPayload::LocationUpdated {} => {}
        }
    }
}

// Make DispatchManager Clone-able (storage and channels are shared handles)
impl Clone for DispatchManager {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            catalog: self.catalog.clone(),
            notifier: self.notifier.clone(),
            event_tx: self.event_tx.clone(),
            pricing: self.pricing.clone(),
            epoch: self.epoch.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{
        Address, AgentStatus, Caller, KycStatus, ProductSnapshot, Role, VehicleType,
    };

    fn address(coords: Option<GeoPoint>) -> Address {
        Address {
            street: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            zip_code: "560001".to_string(),
            phone: Some("9000000000".to_string()),
            coordinates: coords,
        }
    }

    fn product(id: &str, seller: &str, price: f64, discount: f64) -> ProductSnapshot {
        ProductSnapshot {
            product_id: id.to_string(),
            seller_id: seller.to_string(),
            name: format!("Product {}", id),
            price,
            discount,
        }
    }

    fn eligible_agent(id: &str, point: Option<GeoPoint>) -> AgentProfile {
        let mut agent = AgentProfile::new(id, VehicleType::Bike, "south");
        agent.kyc_status = KycStatus::Approved;
        agent.status = AgentStatus::Active;
        agent.is_online = true;
        agent.is_available = true;
        agent.last_location = point.map(|p| LocationPing {
            point: p,
            timestamp: 0,
        });
        agent
    }

    fn test_manager() -> DispatchManager {
        let storage = DispatchStorage::open_in_memory().unwrap();
        DispatchManager::new(storage, Arc::new(CatalogService::new()), Notifier::new())
    }

    fn checkout_cmd(customer: &str, items: Vec<(&str, i64)>) -> DispatchCommand {
        DispatchCommand::new(
            Caller::new(customer, Role::Customer),
            CommandPayload::Checkout {
                shipping_address: address(None),
                items: Some(
                    items
                        .into_iter()
                        .map(|(product_id, quantity)| PurchaseItem {
                            product_id: product_id.to_string(),
                            quantity,
                        })
                        .collect(),
                ),
                contact_name: Some("Asha".to_string()),
            },
        )
    }

    fn agent_cmd(agent: &str, payload: CommandPayload) -> DispatchCommand {
        DispatchCommand::new(Caller::new(agent, Role::DeliveryAgent), payload)
    }

    fn admin_cmd(payload: CommandPayload) -> DispatchCommand {
        DispatchCommand::new(Caller::new("admin-1", Role::Admin), payload)
    }

    /// Checkout a single product and return (shipment_id, otp, order_id)
    fn place_single_order(manager: &DispatchManager) -> (String, String, String) {
        manager.sync_product(product("p1", "seller-1", 100.0, 0.0), 10).unwrap();
        let resp = manager.execute_command(checkout_cmd("cust-1", vec![("p1", 2)]));
        assert!(resp.success, "checkout failed: {:?}", resp.error);
        let placed = &resp.orders[0];
        (
            placed.shipment_id.clone(),
            placed.otp_code.clone(),
            placed.order_id.clone(),
        )
    }

    // ========================================================================
    // Checkout
    // ========================================================================

    #[test]
    fn multi_seller_checkout_creates_one_order_per_seller() {
        let manager = test_manager();
        manager.sync_product(product("p1", "seller-1", 100.0, 10.0), 10).unwrap();
        manager.sync_product(product("p2", "seller-1", 50.0, 0.0), 10).unwrap();
        manager.sync_product(product("p3", "seller-2", 80.0, 0.0), 10).unwrap();

        let resp =
            manager.execute_command(checkout_cmd("cust-1", vec![("p1", 1), ("p2", 1), ("p3", 3)]));
        assert!(resp.success);
        assert_eq!(resp.orders.len(), 2, "one order per distinct seller");

        let s1 = resp.orders.iter().find(|o| o.seller_id == "seller-1").unwrap();
        let s2 = resp.orders.iter().find(|o| o.seller_id == "seller-2").unwrap();
        assert_ne!(s1.tracking_number, s2.tracking_number);
        assert_ne!(s1.shipment_id, s2.shipment_id);

        // subtotal s1: (100-10) + 50 = 140; tax 7; total 187
        assert_eq!(s1.total_amount, 187.0);
        // subtotal s2: 240; tax 12; total 292
        assert_eq!(s2.total_amount, 292.0);

        // Combined reservations equal the requested quantities
        let stock1 = manager.storage().get_stock("p1").unwrap().unwrap();
        let stock3 = manager.storage().get_stock("p3").unwrap().unwrap();
        assert_eq!((stock1.available, stock1.reserved), (9, 1));
        assert_eq!((stock3.available, stock3.reserved), (7, 3));

        // Both shipments sit in the pending pool
        assert_eq!(manager.get_pending_shipments().unwrap().len(), 2);
    }

    #[test]
    fn checkout_rejects_insufficient_stock_naming_product() {
        let manager = test_manager();
        manager.sync_product(product("p1", "seller-1", 100.0, 0.0), 1).unwrap();

        let resp = manager.execute_command(checkout_cmd("cust-1", vec![("p1", 5)]));
        assert!(!resp.success);
        let error = resp.error.unwrap();
        assert_eq!(error.code, CommandErrorCode::InsufficientStock);
        assert!(error.message.contains("p1"));

        let stock = manager.storage().get_stock("p1").unwrap().unwrap();
        assert_eq!((stock.available, stock.reserved), (1, 0));
    }

    #[test]
    fn checkout_rejects_empty_cart_and_bad_address() {
        let manager = test_manager();

        let resp = manager.execute_command(DispatchCommand::new(
            Caller::new("cust-1", Role::Customer),
            CommandPayload::Checkout {
                shipping_address: address(None),
                items: None,
                contact_name: None,
            },
        ));
        assert_eq!(resp.error.unwrap().code, CommandErrorCode::EmptyCart);

        let mut bad = address(None);
        bad.zip_code = String::new();
        let resp = manager.execute_command(DispatchCommand::new(
            Caller::new("cust-1", Role::Customer),
            CommandPayload::Checkout {
                shipping_address: bad,
                items: Some(vec![PurchaseItem {
                    product_id: "p1".to_string(),
                    quantity: 1,
                }]),
                contact_name: None,
            },
        ));
        assert_eq!(resp.error.unwrap().code, CommandErrorCode::InvalidAddress);
    }

    #[test]
    fn unknown_products_are_dropped_not_fatal() {
        let manager = test_manager();

        // Nothing resolvable: the checkout is an empty cart
        let resp = manager.execute_command(checkout_cmd("cust-1", vec![("ghost", 1)]));
        assert_eq!(resp.error.unwrap().code, CommandErrorCode::EmptyCart);

        // A resolvable item alongside a ghost still checks out
        manager.sync_product(product("p1", "seller-1", 10.0, 0.0), 5).unwrap();
        let resp = manager.execute_command(checkout_cmd("cust-1", vec![("ghost", 1), ("p1", 1)]));
        assert!(resp.success);
        assert_eq!(resp.orders.len(), 1);
        assert_eq!(resp.orders[0].seller_id, "seller-1");
    }

    #[test]
    fn cart_checkout_clears_cart_but_direct_purchase_does_not() {
        let manager = test_manager();
        manager.sync_product(product("p1", "seller-1", 10.0, 0.0), 10).unwrap();

        let cart = vec![PurchaseItem {
            product_id: "p1".to_string(),
            quantity: 1,
        }];
        manager.put_cart("cust-1", &cart).unwrap();

        // Direct purchase: cart untouched
        let resp = manager.execute_command(checkout_cmd("cust-1", vec![("p1", 1)]));
        assert!(resp.success);
        assert_eq!(manager.get_cart("cust-1").unwrap().len(), 1);

        // Cart checkout: cart cleared
        let resp = manager.execute_command(DispatchCommand::new(
            Caller::new("cust-1", Role::Customer),
            CommandPayload::Checkout {
                shipping_address: address(None),
                items: None,
                contact_name: None,
            },
        ));
        assert!(resp.success);
        assert!(manager.get_cart("cust-1").unwrap().is_empty());
    }

    #[test]
    fn later_group_failure_keeps_earlier_groups() {
        let manager = test_manager();
        // Seller ids are processed in order: a-seller commits first
        manager.sync_product(product("p1", "a-seller", 10.0, 0.0), 10).unwrap();
        manager.sync_product(product("p2", "b-seller", 10.0, 0.0), 0).unwrap();

        let resp = manager.execute_command(checkout_cmd("cust-1", vec![("p1", 1), ("p2", 1)]));

        // Partial success: the first seller's order exists, the second
        // group's failure is reported alongside it
        assert!(resp.success);
        assert_eq!(resp.orders.len(), 1);
        assert_eq!(resp.orders[0].seller_id, "a-seller");
        assert_eq!(resp.error.unwrap().code, CommandErrorCode::InsufficientStock);

        let order = manager.get_order(&resp.orders[0].order_id).unwrap().unwrap();
        assert_eq!(order.seller_id, "a-seller");
        let stock1 = manager.storage().get_stock("p1").unwrap().unwrap();
        assert_eq!(stock1.reserved, 1);
    }

    #[test]
    fn duplicate_checkout_command_is_benign() {
        let manager = test_manager();
        manager.sync_product(product("p1", "seller-1", 10.0, 0.0), 10).unwrap();

        let cmd = checkout_cmd("cust-1", vec![("p1", 1)]);
        let first = manager.execute_command(cmd.clone());
        assert!(first.success && !first.duplicate);

        let second = manager.execute_command(cmd);
        assert!(second.duplicate);
        assert!(second.orders.is_empty());

        // Only one reservation happened
        let stock = manager.storage().get_stock("p1").unwrap().unwrap();
        assert_eq!(stock.reserved, 1);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[test]
    fn full_lifecycle_from_checkout_to_settled_delivery() {
        let manager = test_manager();
        manager.upsert_agent(&eligible_agent("agent-1", None)).unwrap();
        let (shipment_id, otp, order_id) = place_single_order(&manager);

        // Auto-assign binds the only eligible agent
        let resp = manager.execute_command(admin_cmd(CommandPayload::AutoAssign {
            shipment_id: shipment_id.clone(),
        }));
        assert!(resp.success, "{:?}", resp.error);
        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Assigned);
        assert!(shipment.is_bound_to("agent-1"));
        assert!(manager.get_pending_shipments().unwrap().is_empty());
        assert_eq!(
            manager.get_order(&order_id).unwrap().unwrap().status,
            shared::OrderStatus::Confirmed
        );

        // Confirm, pick up, depart
        let resp = manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::AcceptShipment {
                shipment_id: shipment_id.clone(),
            },
        ));
        assert!(resp.success);
        let resp = manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::Pickup {
                shipment_id: shipment_id.clone(),
                location: None,
            },
        ));
        assert!(resp.success);
        assert_eq!(
            manager.get_order(&order_id).unwrap().unwrap().status,
            shared::OrderStatus::Packed
        );
        let resp = manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::Depart {
                shipment_id: shipment_id.clone(),
                location: None,
            },
        ));
        assert!(resp.success);
        assert_eq!(
            manager.get_order(&order_id).unwrap().unwrap().status,
            shared::OrderStatus::Shipped
        );

        // Complete with the right code
        let resp = manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::Complete {
                shipment_id: shipment_id.clone(),
                otp_code: otp,
                location: None,
                signature: Some("sig".to_string()),
            },
        ));
        assert!(resp.success, "{:?}", resp.error);

        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Delivered);
        assert!(shipment.proof.is_some());
        assert!(shipment.delivered_time.is_some());
        assert_eq!(
            manager.get_order(&order_id).unwrap().unwrap().status,
            shared::OrderStatus::Delivered
        );

        // Settlement: earnings entry, balances, working set, stock release
        let summary = manager.get_agent_earnings("agent-1").unwrap();
        assert_eq!(summary.entries.len(), 1);
        let entry = &summary.entries[0];
        assert_eq!(entry.shipment_id, shipment_id);
        assert_eq!(entry.order_id, order_id);
        assert!(entry.net_amount > 0.0);
        assert_eq!(summary.pending_net, entry.net_amount);

        let agent = manager.get_agent("agent-1").unwrap().unwrap();
        assert!(agent.current_assignments.is_empty());
        assert_eq!(agent.completed_assignments, vec![shipment_id.clone()]);
        assert_eq!(agent.completed_deliveries, 1);
        assert_eq!(agent.earnings.pending, entry.net_amount);

        let stock = manager.storage().get_stock("p1").unwrap().unwrap();
        assert_eq!(stock.reserved, 0);
        assert_eq!(stock.available, 8);

        // The audit trail is strictly ordered
        let events = manager.get_events_for_shipment(&shipment_id).unwrap();
        assert_eq!(events.len(), 6);
        for pair in events.windows(2) {
            assert!(pair[1].sequence > pair[0].sequence);
        }
        assert_eq!(events.last().unwrap().status, ShipmentStatus::Delivered);
    }

    #[test]
    fn wrong_otp_is_rejected_and_nothing_settles() {
        let manager = test_manager();
        manager.upsert_agent(&eligible_agent("agent-1", None)).unwrap();
        let (shipment_id, otp, _order_id) = place_single_order(&manager);

        for payload in [
            CommandPayload::AcceptShipment {
                shipment_id: shipment_id.clone(),
            },
            CommandPayload::Pickup {
                shipment_id: shipment_id.clone(),
                location: None,
            },
            CommandPayload::Depart {
                shipment_id: shipment_id.clone(),
                location: None,
            },
        ] {
            assert!(manager.execute_command(agent_cmd("agent-1", payload)).success);
        }

        let wrong = if otp == "999999" { "111111" } else { "999999" };
        let resp = manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::Complete {
                shipment_id: shipment_id.clone(),
                otp_code: wrong.to_string(),
                location: None,
                signature: None,
            },
        ));
        assert_eq!(resp.error.unwrap().code, CommandErrorCode::InvalidOtp);

        // Still in transit, nothing credited or released
        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();
        assert_eq!(shipment.status, ShipmentStatus::InTransit);
        assert!(manager.get_agent_earnings("agent-1").unwrap().entries.is_empty());
        let stock = manager.storage().get_stock("p1").unwrap().unwrap();
        assert_eq!(stock.reserved, 2);

        // The caller may retry with the correct code
        let resp = manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::Complete {
                shipment_id,
                otp_code: otp,
                location: None,
                signature: None,
            },
        ));
        assert!(resp.success);
    }

    #[test]
    fn completion_is_not_repeatable() {
        let manager = test_manager();
        manager.upsert_agent(&eligible_agent("agent-1", None)).unwrap();
        let (shipment_id, otp, _) = place_single_order(&manager);

        for payload in [
            CommandPayload::AcceptShipment {
                shipment_id: shipment_id.clone(),
            },
            CommandPayload::Pickup {
                shipment_id: shipment_id.clone(),
                location: None,
            },
            CommandPayload::Depart {
                shipment_id: shipment_id.clone(),
                location: None,
            },
        ] {
            assert!(manager.execute_command(agent_cmd("agent-1", payload)).success);
        }

        let complete = agent_cmd(
            "agent-1",
            CommandPayload::Complete {
                shipment_id: shipment_id.clone(),
                otp_code: otp.clone(),
                location: None,
                signature: None,
            },
        );
        assert!(manager.execute_command(complete.clone()).success);

        // Same command id: benign duplicate, no double credit
        let resp = manager.execute_command(complete);
        assert!(resp.duplicate);

        // Fresh command id against the delivered shipment: clean failure
        let resp = manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::Complete {
                shipment_id: shipment_id.clone(),
                otp_code: otp,
                location: None,
                signature: None,
            },
        ));
        assert_eq!(resp.error.unwrap().code, CommandErrorCode::InvalidTransition);

        // Exactly one earnings entry, stock released exactly once
        assert_eq!(manager.get_agent_earnings("agent-1").unwrap().entries.len(), 1);
        let agent = manager.get_agent("agent-1").unwrap().unwrap();
        assert_eq!(agent.completed_deliveries, 1);
        let stock = manager.storage().get_stock("p1").unwrap().unwrap();
        assert_eq!(stock.reserved, 0);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    #[test]
    fn self_claim_takes_shipment_straight_to_accepted() {
        let manager = test_manager();
        manager.upsert_agent(&eligible_agent("agent-1", None)).unwrap();
        let (shipment_id, _, _) = place_single_order(&manager);

        let resp = manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::AcceptShipment {
                shipment_id: shipment_id.clone(),
            },
        ));
        assert!(resp.success);

        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Accepted);
        assert!(shipment.is_bound_to("agent-1"));
        assert!(manager.get_pending_shipments().unwrap().is_empty());

        let agent = manager.get_agent("agent-1").unwrap().unwrap();
        assert_eq!(agent.current_assignments, vec![shipment_id]);
        assert_eq!(agent.total_deliveries, 1);
    }

    #[test]
    fn rejected_shipment_returns_to_pool_for_another_agent() {
        let manager = test_manager();
        manager.upsert_agent(&eligible_agent("agent-1", None)).unwrap();
        manager.upsert_agent(&{
            let mut a = eligible_agent("agent-2", None);
            a.is_online = false; // not eligible for auto-assign
            a
        }).unwrap();
        let (shipment_id, _, _) = place_single_order(&manager);

        let resp = manager.execute_command(admin_cmd(CommandPayload::AutoAssign {
            shipment_id: shipment_id.clone(),
        }));
        assert!(resp.success);

        let resp = manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::RejectShipment {
                shipment_id: shipment_id.clone(),
            },
        ));
        assert!(resp.success);

        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert!(shipment.delivery_agent_id.is_none());
        assert_eq!(manager.get_pending_shipments().unwrap().len(), 1);
        let agent = manager.get_agent("agent-1").unwrap().unwrap();
        assert!(agent.current_assignments.is_empty());

        // A different (KYC-approved) agent can now claim it
        let resp = manager.execute_command(agent_cmd(
            "agent-2",
            CommandPayload::AcceptShipment {
                shipment_id: shipment_id.clone(),
            },
        ));
        assert!(resp.success);
        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();
        assert!(shipment.is_bound_to("agent-2"));
    }

    #[test]
    fn auto_assign_with_no_agents_leaves_shipment_pending() {
        let manager = test_manager();
        let (shipment_id, _, _) = place_single_order(&manager);

        let resp = manager.execute_command(admin_cmd(CommandPayload::AutoAssign {
            shipment_id: shipment_id.clone(),
        }));
        assert_eq!(resp.error.unwrap().code, CommandErrorCode::NoAgentsAvailable);

        // Still pending, still claimable later
        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert_eq!(manager.get_pending_shipments().unwrap().len(), 1);
    }

    #[test]
    fn auto_assign_binds_nearest_agent_end_to_end() {
        let manager = test_manager();
        manager.sync_product(product("p1", "seller-1", 10.0, 0.0), 10).unwrap();
        // Delivery point at 12.90; far agent ~4.2 km, near agent ~1.1 km
        manager
            .upsert_agent(&eligible_agent("agent-far", Some(GeoPoint::new(12.9378, 77.6))))
            .unwrap();
        manager
            .upsert_agent(&eligible_agent("agent-near", Some(GeoPoint::new(12.9099, 77.6))))
            .unwrap();

        let resp = manager.execute_command(DispatchCommand::new(
            Caller::new("cust-1", Role::Customer),
            CommandPayload::Checkout {
                shipping_address: address(Some(GeoPoint::new(12.9000, 77.6))),
                items: Some(vec![PurchaseItem {
                    product_id: "p1".to_string(),
                    quantity: 1,
                }]),
                contact_name: None,
            },
        ));
        let shipment_id = resp.orders[0].shipment_id.clone();

        let resp = manager.execute_command(admin_cmd(CommandPayload::AutoAssign {
            shipment_id: shipment_id.clone(),
        }));
        assert!(resp.success);

        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();
        assert!(shipment.is_bound_to("agent-near"));
    }

    #[test]
    fn concurrent_claims_admit_exactly_one_winner() {
        let manager = std::sync::Arc::new(test_manager());
        for i in 0..4 {
            manager
                .upsert_agent(&eligible_agent(&format!("agent-{}", i), None))
                .unwrap();
        }
        let (shipment_id, _, _) = place_single_order(&manager);

        let mut handles = Vec::new();
        for i in 0..4 {
            let manager = manager.clone();
            let shipment_id = shipment_id.clone();
            handles.push(std::thread::spawn(move || {
                manager.execute_command(agent_cmd(
                    &format!("agent-{}", i),
                    CommandPayload::AcceptShipment { shipment_id },
                ))
            }));
        }

        let responses: Vec<CommandResponse> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = responses.iter().filter(|r| r.success).count();
        assert_eq!(winners, 1, "exactly one claim must win");
        for loser in responses.iter().filter(|r| !r.success) {
            let code = loser.error.as_ref().unwrap().code;
            assert!(
                code == CommandErrorCode::AlreadyAssigned
                    || code == CommandErrorCode::InvalidTransition,
                "unexpected loser code {:?}",
                code
            );
        }

        // Single binding, single working-set entry across all agents
        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();
        let holder = shipment.delivery_agent_id.clone().unwrap();
        let mut holding = 0;
        for i in 0..4 {
            let agent = manager.get_agent(&format!("agent-{}", i)).unwrap().unwrap();
            if agent.current_assignments.contains(&shipment_id) {
                holding += 1;
                assert_eq!(agent.agent_id, holder);
            }
        }
        assert_eq!(holding, 1);

        // Only the winning transition reached the audit trail
        let events = manager.get_events_for_shipment(&shipment_id).unwrap();
        assert_eq!(events.len(), 2, "created + single accepted event");
    }

    #[test]
    fn duplicate_lifecycle_command_is_benign() {
        let manager = test_manager();
        manager.upsert_agent(&eligible_agent("agent-1", None)).unwrap();
        let (shipment_id, _, _) = place_single_order(&manager);

        let cmd = agent_cmd(
            "agent-1",
            CommandPayload::AcceptShipment {
                shipment_id: shipment_id.clone(),
            },
        );
        assert!(manager.execute_command(cmd.clone()).success);

        let resp = manager.execute_command(cmd);
        assert!(resp.duplicate);

        let agent = manager.get_agent("agent-1").unwrap().unwrap();
        assert_eq!(agent.total_deliveries, 1, "no double bookkeeping");
    }

    #[test]
    fn events_are_broadcast_after_commit() {
        let manager = test_manager();
        let mut rx = manager.subscribe();
        let (shipment_id, _, _) = place_single_order(&manager);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.shipment_id, shipment_id);
        assert!(matches!(event.payload, EventPayload::Created { .. }));
    }

    #[test]
    fn notices_fan_out_to_the_right_recipients() {
        let storage = DispatchStorage::open_in_memory().unwrap();
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let manager =
            DispatchManager::new(storage, Arc::new(CatalogService::new()), notifier);
        manager.sync_product(product("p1", "seller-1", 10.0, 0.0), 5).unwrap();

        let resp = manager.execute_command(checkout_cmd("cust-1", vec![("p1", 1)]));
        assert!(resp.success);

        let mut recipients = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            recipients.push(notice.recipient_id);
        }
        assert!(recipients.contains(&"seller-1".to_string()));
        assert!(recipients.contains(&"cust-1".to_string()));
    }

    #[test]
    fn availability_toggle_updates_profile_and_ping() {
        let manager = test_manager();
        manager.upsert_agent(&eligible_agent("agent-1", None)).unwrap();

        let agent = manager
            .set_availability("agent-1", true, false, Some(GeoPoint::new(12.9, 77.6)))
            .unwrap();
        assert!(agent.is_online);
        assert!(!agent.is_available);
        assert!(agent.last_location.is_some());

        let err = manager.set_availability("ghost", true, true, None).unwrap_err();
        assert!(matches!(err, DispatchError::AgentNotFound(_)));
    }

    #[test]
    fn assignment_stats_reflect_working_state() {
        let manager = test_manager();
        manager.upsert_agent(&eligible_agent("agent-1", None)).unwrap();
        let (shipment_id, _, _) = place_single_order(&manager);

        manager.execute_command(agent_cmd(
            "agent-1",
            CommandPayload::AcceptShipment {
                shipment_id: shipment_id.clone(),
            },
        ));

        let (shipments, stats) = manager.get_agent_assignments("agent-1", None).unwrap();
        assert_eq!(shipments.len(), 1);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 0);

        let (filtered, _) = manager
            .get_agent_assignments("agent-1", Some(ShipmentStatus::Delivered))
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn tracking_lookup_resolves_shipment() {
        let manager = test_manager();
        let (shipment_id, _, _) = place_single_order(&manager);
        let shipment = manager.get_shipment(&shipment_id).unwrap().unwrap();

        let by_tracking = manager
            .get_shipment_by_tracking(&shipment.tracking_number)
            .unwrap()
            .unwrap();
        assert_eq!(by_tracking.shipment_id, shipment_id);
        assert!(manager.get_shipment_by_tracking("DLGNOPE").unwrap().is_none());
    }
}
