//! Checkout command handler - one seller group per execution
//!
//! The manager partitions a validated checkout into seller groups and runs
//! this action once per group, each in its own transaction. Within the
//! group everything is all-or-nothing: every line is reserved against the
//! inventory ledger, the order and its paired shipment are created, and
//! the initial shipment event is emitted.

use async_trait::async_trait;
use rust_decimal::prelude::*;
use tracing::info;
use uuid::Uuid;

use crate::fulfillment::inventory;
use crate::fulfillment::traits::{CommandContext, CommandHandler, CommandMetadata, DispatchError};
use crate::utils::codes;
use shared::shipment::{EventPayload, ShipmentEventType};
use shared::{
    Address, Order, OrderLine, OrderStatus, ProductSnapshot, ShipmentEvent, ShipmentStatus,
};

/// Flat per-order shipping fee
const SHIPPING_FEE: f64 = 40.0;
/// Tax rate applied to the discounted subtotal
const TAX_RATE: f64 = 0.05;
/// Settlement currency
const CURRENCY: &str = "INR";

/// Checkout pricing knobs (defaults mirror production values)
#[derive(Debug, Clone)]
pub struct CheckoutPricing {
    pub tax_rate: f64,
    pub shipping_fee: f64,
    pub currency: String,
}

impl Default for CheckoutPricing {
    fn default() -> Self {
        Self {
            tax_rate: TAX_RATE,
            shipping_fee: SHIPPING_FEE,
            currency: CURRENCY.to_string(),
        }
    }
}

/// A purchase line resolved against the catalog
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub product: ProductSnapshot,
    pub quantity: i64,
}

/// Checkout action for a single seller group
pub struct CheckoutAction {
    pub seller_id: String,
    pub shipping_address: Address,
    pub lines: Vec<ResolvedLine>,
    /// Seller pickup point, when the catalog knows it
    pub pickup_address: Option<Address>,
    pub customer_name: String,
    pub customer_phone: String,
    pub pricing: CheckoutPricing,
}

#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

#[inline]
fn round2(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

impl CheckoutAction {
    /// Allocate a tracking number that is not yet in the index
    fn fresh_tracking_number(&self, ctx: &CommandContext<'_>) -> Result<String, DispatchError> {
        loop {
            let candidate = codes::generate_tracking_number();
            if !ctx.tracking_exists(&candidate)? {
                return Ok(candidate);
            }
        }
    }
}

#[async_trait]
impl CommandHandler for CheckoutAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<ShipmentEvent>, DispatchError> {
        if self.lines.is_empty() {
            return Err(DispatchError::EmptyCart);
        }

        // 1. Reserve every line; any failure aborts the whole group
        for line in &self.lines {
            inventory::reserve(
                ctx.storage(),
                ctx.txn(),
                &line.product.product_id,
                line.quantity,
            )?;
        }

        // 2. Totals, rounded at each derived step. The discount is already
        // netted out of the subtotal; discount_amount reports it.
        let mut subtotal = Decimal::ZERO;
        let mut discount_total = Decimal::ZERO;
        for line in &self.lines {
            let qty = Decimal::from(line.quantity);
            subtotal += to_decimal(line.product.unit_price()) * qty;
            discount_total +=
                to_decimal(line.product.price - line.product.unit_price()) * qty;
        }
        let subtotal = round2(subtotal);
        let discount_amount = round2(discount_total);
        let tax_amount = round2(to_decimal(subtotal) * to_decimal(self.pricing.tax_rate));
        let total_amount = round2(
            to_decimal(subtotal) + to_decimal(tax_amount) + to_decimal(self.pricing.shipping_fee),
        );

        // 3. Create the order
        let order_id = Uuid::new_v4().to_string();
        let shipment_id = Uuid::new_v4().to_string();
        let order = Order {
            order_id: order_id.clone(),
            customer_id: metadata.caller.id.clone(),
            seller_id: self.seller_id.clone(),
            items: self
                .lines
                .iter()
                .map(|line| OrderLine {
                    product_id: line.product.product_id.clone(),
                    quantity: line.quantity,
                })
                .collect(),
            status: OrderStatus::Pending,
            subtotal,
            tax_amount,
            discount_amount,
            shipping_fee: self.pricing.shipping_fee,
            total_amount,
            currency: self.pricing.currency.clone(),
            shipping_address: self.shipping_address.clone(),
            shipment_id: Some(shipment_id.clone()),
            created_at: metadata.timestamp,
            updated_at: metadata.timestamp,
        };
        ctx.save_order(order);

        // 4. Pair it with a shipment: tracking number + one-time code
        let tracking_number = self.fresh_tracking_number(ctx)?;
        let otp_code = codes::generate_otp();

        let seq = ctx.next_sequence();
        let event = ShipmentEvent::new(
            seq,
            shipment_id.clone(),
            metadata.caller.id.clone(),
            metadata.command_id.clone(),
            ShipmentStatus::Pending,
            Some("Order placed, awaiting assignment".to_string()),
            None,
            ShipmentEventType::Created,
            EventPayload::Created {
                order_id,
                tracking_number,
                otp_code,
                pickup_address: self.pickup_address.clone(),
                delivery_address: self.shipping_address.clone(),
                customer_name: self.customer_name.clone(),
                customer_phone: self.customer_phone.clone(),
            },
        );

        info!(
            shipment_id = %shipment_id,
            seller_id = %self.seller_id,
            lines = self.lines.len(),
            total = total_amount,
            "Seller order created"
        );
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fulfillment::storage::DispatchStorage;
    use shared::{Caller, Role, StockRecord};

    fn test_address() -> Address {
        Address {
            street: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            zip_code: "560001".to_string(),
            phone: Some("900".to_string()),
            coordinates: None,
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

    fn metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            caller: Caller::new("cust-1", Role::Customer),
            timestamp: 1_700_000_000_000,
        }
    }

    fn action(lines: Vec<ResolvedLine>) -> CheckoutAction {
        CheckoutAction {
            seller_id: "seller-1".to_string(),
            shipping_address: test_address(),
            lines,
            pickup_address: None,
            customer_name: "Asha".to_string(),
            customer_phone: "900".to_string(),
            pricing: CheckoutPricing::default(),
        }
    }

    #[tokio::test]
    async fn creates_order_and_shipment_with_totals() {
        let storage = DispatchStorage::open_in_memory().unwrap();
        storage.set_stock("p1", &StockRecord::with_available(10)).unwrap();
        storage.set_stock("p2", &StockRecord::with_available(5)).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = action(vec![
            ResolvedLine {
                product: product("p1", "seller-1", 100.0, 10.0),
                quantity: 2,
            },
            ResolvedLine {
                product: product("p2", "seller-1", 50.0, 0.0),
                quantity: 1,
            },
        ]);

        let events = action.execute(&mut ctx, &metadata()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, ShipmentEventType::Created);

        let order = ctx.modified_orders().next().unwrap().clone();
        // subtotal (100-10)*2 + 50 = 230; discount 10*2; tax 11.5; total 230+11.5+40
        assert_eq!(order.subtotal, 230.0);
        assert_eq!(order.discount_amount, 20.0);
        assert_eq!(order.tax_amount, 11.5);
        assert_eq!(order.total_amount, 281.5);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.shipment_id.as_deref(), Some(events[0].shipment_id.as_str()));

        // Reservations applied inside the transaction
        let stock = storage.get_stock_txn(&txn, "p1").unwrap().unwrap();
        assert_eq!(stock.available, 8);
        assert_eq!(stock.reserved, 2);
    }

    #[tokio::test]
    async fn insufficient_stock_aborts_group() {
        let storage = DispatchStorage::open_in_memory().unwrap();
        storage.set_stock("p1", &StockRecord::with_available(10)).unwrap();
        storage.set_stock("p2", &StockRecord::with_available(0)).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = action(vec![
            ResolvedLine {
                product: product("p1", "seller-1", 100.0, 0.0),
                quantity: 1,
            },
            ResolvedLine {
                product: product("p2", "seller-1", 50.0, 0.0),
                quantity: 1,
            },
        ]);

        let err = action.execute(&mut ctx, &metadata()).await.unwrap_err();
        assert!(matches!(err, DispatchError::InsufficientStock { .. }));
        drop(txn);

        // The aborted transaction leaves p1 untouched
        let stock = storage.get_stock("p1").unwrap().unwrap();
        assert_eq!(stock.available, 10);
        assert_eq!(stock.reserved, 0);
    }

    #[tokio::test]
    async fn empty_group_is_rejected() {
        let storage = DispatchStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let err = action(vec![]).execute(&mut ctx, &metadata()).await.unwrap_err();
        assert!(matches!(err, DispatchError::EmptyCart));
    }

    #[tokio::test]
    async fn created_event_carries_codes() {
        let storage = DispatchStorage::open_in_memory().unwrap();
        storage.set_stock("p1", &StockRecord::with_available(3)).unwrap();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = action(vec![ResolvedLine {
            product: product("p1", "seller-1", 10.0, 0.0),
            quantity: 1,
        }]);
        let events = action.execute(&mut ctx, &metadata()).await.unwrap();

        if let EventPayload::Created {
            tracking_number,
            otp_code,
            ..
        } = &events[0].payload
        {
            assert!(tracking_number.starts_with("DLG"));
            let otp: u32 = otp_code.parse().unwrap();
            assert!((100_000..=999_999).contains(&otp));
        } else {
            panic!("Expected Created payload");
        }
    }
}
