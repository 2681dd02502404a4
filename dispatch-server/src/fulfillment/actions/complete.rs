//! Complete command handler - OTP-gated delivery completion
//!
//! Valid only from `InTransit` by the bound agent, and only with the
//! matching one-time code. A successful completion settles everything in
//! one transaction: proof + delivered timestamps on the shipment, the
//! paired order to `Delivered`, an immutable earnings entry, agent
//! balances and working set, and the release of every line's inventory
//! reservation. A failed OTP leaves no trace of any of it.

use async_trait::async_trait;
use chrono::Timelike;
use tracing::info;

use crate::fulfillment::inventory;
use crate::fulfillment::payout;
use crate::fulfillment::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError};
use crate::utils::codes;
use shared::shipment::{EventPayload, ShipmentEventType};
use shared::{
    DeliveryProof, EarningsEntry, GeoPoint, OrderStatus, ShipmentEvent, ShipmentStatus,
};

pub struct CompleteAction {
    pub shipment_id: String,
    pub otp_code: String,
    pub location: Option<GeoPoint>,
    pub signature: Option<String>,
}

#[async_trait]
impl CommandHandler for CompleteAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        let shipment = ctx.load_shipment(&self.shipment_id)?;
        let agent_id = metadata.caller.id.clone();

        if !shipment.is_bound_to(&agent_id) {
            return Err(DispatchError::NotAssignedToYou(self.shipment_id.clone()));
        }
        if shipment.status != ShipmentStatus::InTransit {
            return Err(DispatchError::InvalidTransition {
                shipment_id: self.shipment_id.clone(),
                from: shipment.status,
                attempted: "complete",
            });
        }
        if !codes::verify_otp(&self.otp_code, &shipment.otp_code) {
            return Err(DispatchError::InvalidOtp);
        }

        // Earnings: distance from the address pair, default when unknown
        let distance_km = payout::delivery_distance_km(
            shipment.pickup_address.as_ref().and_then(|a| a.coordinates),
            shipment.delivery_address.coordinates,
        );
        let is_peak = payout::is_peak_hour(chrono::Local::now().hour());
        let breakdown = payout::quote(distance_km, is_peak);

        let entry = EarningsEntry::from_breakdown(
            agent_id.clone(),
            self.shipment_id.clone(),
            shipment.order_id.clone(),
            &breakdown,
            distance_km,
            is_peak,
        );
        ctx.storage().store_earnings(ctx.txn(), &entry)?;

        // Settle the agent: working set, counters, balances
        let mut agent = ctx.load_agent(&agent_id)?;
        agent.current_assignments.retain(|id| id != &self.shipment_id);
        agent.completed_assignments.push(self.shipment_id.clone());
        agent.completed_deliveries += 1;
        agent.earnings.total += breakdown.net_amount;
        agent.earnings.pending += breakdown.net_amount;
        agent.updated_at = metadata.timestamp;
        ctx.save_agent(agent);

        // Deliver the order and release every reserved line
        let mut order = ctx.load_order(&shipment.order_id)?;
        for line in &order.items {
            inventory::release(ctx.storage(), ctx.txn(), &line.product_id, line.quantity)?;
        }
        order.status = OrderStatus::Delivered;
        order.updated_at = metadata.timestamp;
        ctx.save_order(order);

        let seq = ctx.next_sequence();
        let event = ShipmentEvent::new(
            seq,
            self.shipment_id.clone(),
            agent_id,
            metadata.command_id.clone(),
            ShipmentStatus::Delivered,
            Some("Package delivered successfully".to_string()),
            self.location,
            ShipmentEventType::Delivered,
            EventPayload::Delivered {
                proof: DeliveryProof {
                    signature: self.signature.clone(),
                    verified_at: event_timestamp(),
                },
            },
        );

        info!(
            shipment_id = %self.shipment_id,
            distance_km,
            is_peak,
            net_amount = breakdown.net_amount,
            "Delivery completed"
        );
        Ok(vec![event])
    }
}

fn event_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
