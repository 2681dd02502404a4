//! Shipment lookup endpoints
//!
//! Responses use [`ShipmentView`], which omits the one-time delivery
//! code: the OTP reaches the customer through the checkout response and
//! must never travel to the courier.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::auth::{CallerIdentity, Operation};
use crate::core::{Result, ServerError, ServerState};
use shared::{Address, DeliveryProof, GeoPoint, ShipmentEvent, ShipmentSnapshot, ShipmentStatus};

/// Externally visible shipment projection (no OTP)
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentView {
    pub shipment_id: String,
    pub order_id: String,
    pub tracking_number: String,
    pub status: ShipmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<Address>,
    pub delivery_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<DeliveryProof>,
    pub customer_name: String,
    pub customer_phone: String,
    /// Completion always requires presenting the one-time code
    pub requires_otp: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<ShipmentSnapshot> for ShipmentView {
    fn from(s: ShipmentSnapshot) -> Self {
        Self {
            shipment_id: s.shipment_id,
            order_id: s.order_id,
            tracking_number: s.tracking_number,
            status: s.status,
            delivery_agent_id: s.delivery_agent_id,
            pickup_address: s.pickup_address,
            delivery_address: s.delivery_address,
            current_location: s.current_location,
            pickup_time: s.pickup_time,
            delivered_time: s.delivered_time,
            proof: s.proof,
            customer_name: s.customer_name,
            customer_phone: s.customer_phone,
            requires_otp: true,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// GET /api/shipments/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(shipment_id): Path<String>,
) -> Result<Json<ShipmentView>> {
    caller.require(Operation::TrackShipment)?;
    let shipment = state
        .manager
        .get_shipment(&shipment_id)?
        .ok_or_else(|| ServerError::NotFound(format!("Shipment {} not found", shipment_id)))?;
    Ok(Json(shipment.into()))
}

/// GET /api/shipments/track/{tracking}
pub async fn get_by_tracking(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(tracking): Path<String>,
) -> Result<Json<ShipmentView>> {
    caller.require(Operation::TrackShipment)?;
    let shipment = state
        .manager
        .get_shipment_by_tracking(&tracking)?
        .ok_or_else(|| ServerError::NotFound(format!("Tracking number {} not found", tracking)))?;
    Ok(Json(shipment.into()))
}

/// GET /api/shipments/{id}/events - full audit trail, staff only
/// (creation events embed the one-time code)
pub async fn events(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(shipment_id): Path<String>,
) -> Result<Json<Vec<ShipmentEvent>>> {
    if caller.0.role != shared::Role::Admin {
        return Err(ServerError::Forbidden);
    }
    let events = state.manager.get_events_for_shipment(&shipment_id)?;
    if events.is_empty() {
        return Err(ServerError::NotFound(format!(
            "Shipment {} not found",
            shipment_id
        )));
    }
    Ok(Json(events))
}

/// GET /api/delivery/shipments/pending - the unassigned pool
pub async fn pending(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<ShipmentView>>> {
    caller.require(Operation::ViewPendingShipments)?;
    let shipments = state.manager.get_pending_shipments()?;
    Ok(Json(shipments.into_iter().map(ShipmentView::from).collect()))
}
