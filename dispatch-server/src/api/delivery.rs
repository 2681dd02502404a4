//! Delivery agent endpoints - the lifecycle operations

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::into_result;
use crate::auth::{CallerIdentity, Operation};
use crate::core::{Result, ServerError, ServerState};
use crate::fulfillment::{AssignmentStats, EarningsSummary};
use shared::{
    AgentProfile, CommandPayload, CommandResponse, DispatchCommand, GeoPoint, ShipmentStatus,
};

use super::shipments::ShipmentView;

#[derive(Debug, Deserialize)]
pub struct ShipmentRef {
    pub shipment_id: String,
}

/// POST /api/delivery/accept - self-claim a pending shipment
pub async fn accept(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<ShipmentRef>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::AcceptShipment)?.clone();
    let cmd = DispatchCommand::new(
        caller,
        CommandPayload::AcceptShipment {
            shipment_id: payload.shipment_id,
        },
    );
    into_result(state.manager.execute_command(cmd))
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub shipment_id: String,
    /// "accept" or "reject"
    pub action: String,
}

/// PATCH /api/delivery/assignments - accept or reject an assigned shipment
pub async fn decide_assignment(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::AcceptShipment)?.clone();
    let command_payload = match payload.action.as_str() {
        "accept" => CommandPayload::AcceptShipment {
            shipment_id: payload.shipment_id,
        },
        "reject" => CommandPayload::RejectShipment {
            shipment_id: payload.shipment_id,
        },
        other => {
            return Err(ServerError::Validation(format!(
                "invalid action '{}', must be 'accept' or 'reject'",
                other
            )));
        }
    };
    let cmd = DispatchCommand::new(caller, command_payload);
    into_result(state.manager.execute_command(cmd))
}

/// POST /api/delivery/assignments/auto-assign - bind the nearest agent
pub async fn auto_assign(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<ShipmentRef>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::AutoAssign)?.clone();
    let cmd = DispatchCommand::new(
        caller,
        CommandPayload::AutoAssign {
            shipment_id: payload.shipment_id,
        },
    );
    into_result(state.manager.execute_command(cmd))
}

#[derive(Debug, Deserialize)]
pub struct DirectAssignRequest {
    pub agent_id: String,
}

/// PATCH /api/delivery/shipments/{id}/assign - admin binds a specific agent
pub async fn direct_assign(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(shipment_id): Path<String>,
    Json(payload): Json<DirectAssignRequest>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::DirectAssign)?.clone();
    let cmd = DispatchCommand::new(
        caller,
        CommandPayload::AssignAgent {
            shipment_id,
            agent_id: payload.agent_id,
        },
    );
    into_result(state.manager.execute_command(cmd))
}

#[derive(Debug, Deserialize)]
pub struct TransitRequest {
    pub shipment_id: String,
    pub location: Option<GeoPoint>,
}

/// POST /api/delivery/pickup - mark parcel as picked up
pub async fn pickup(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<TransitRequest>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::Pickup)?.clone();
    let cmd = DispatchCommand::new(
        caller,
        CommandPayload::Pickup {
            shipment_id: payload.shipment_id,
            location: payload.location,
        },
    );
    into_result(state.manager.execute_command(cmd))
}

/// PATCH /api/delivery/pickup - depart toward the customer
pub async fn depart(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<TransitRequest>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::Depart)?.clone();
    let cmd = DispatchCommand::new(
        caller,
        CommandPayload::Depart {
            shipment_id: payload.shipment_id,
            location: payload.location,
        },
    );
    into_result(state.manager.execute_command(cmd))
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub shipment_id: String,
    pub otp_code: String,
    pub location: Option<GeoPoint>,
    pub signature: Option<String>,
}

/// POST /api/delivery/complete - OTP-gated delivery completion
pub async fn complete(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::Complete)?.clone();
    if payload.otp_code.trim().is_empty() {
        return Err(ServerError::Validation("OTP code is required".to_string()));
    }
    let cmd = DispatchCommand::new(
        caller,
        CommandPayload::Complete {
            shipment_id: payload.shipment_id,
            otp_code: payload.otp_code,
            location: payload.location,
            signature: payload.signature,
        },
    );
    into_result(state.manager.execute_command(cmd))
}

#[derive(Debug, Deserialize)]
pub struct FailRequest {
    pub shipment_id: String,
    pub reason: String,
}

/// POST /api/delivery/fail - terminal operational failure
pub async fn fail(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<FailRequest>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::FailShipment)?.clone();
    let cmd = DispatchCommand::new(
        caller,
        CommandPayload::FailShipment {
            shipment_id: payload.shipment_id,
            reason: payload.reason,
        },
    );
    into_result(state.manager.execute_command(cmd))
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub shipment_id: String,
    pub location: GeoPoint,
}

/// POST /api/delivery/location - advisory courier position update
pub async fn update_location(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<LocationRequest>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::UpdateLocation)?.clone();
    let cmd = DispatchCommand::new(
        caller,
        CommandPayload::UpdateLocation {
            shipment_id: payload.shipment_id,
            location: payload.location,
        },
    );
    into_result(state.manager.execute_command(cmd))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub is_online: bool,
    pub is_available: bool,
    pub location: Option<GeoPoint>,
}

/// PATCH /api/delivery/availability
pub async fn availability(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<Json<AgentProfile>> {
    let caller = caller.require(Operation::SetAvailability)?;
    let agent = state.manager.set_availability(
        &caller.id,
        payload.is_online,
        payload.is_available,
        payload.location,
    )?;
    Ok(Json(agent))
}

#[derive(Debug, Deserialize)]
pub struct AssignmentsQuery {
    pub status: Option<ShipmentStatus>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentsResponse {
    pub shipments: Vec<ShipmentView>,
    pub stats: AssignmentStats,
}

/// GET /api/delivery/assignments - the agent's shipments plus stats
pub async fn assignments(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Query(query): Query<AssignmentsQuery>,
) -> Result<Json<AssignmentsResponse>> {
    let caller = caller.require(Operation::ViewAssignments)?;
    let (shipments, stats) = state
        .manager
        .get_agent_assignments(&caller.id, query.status)?;
    Ok(Json(AssignmentsResponse {
        shipments: shipments.into_iter().map(ShipmentView::from).collect(),
        stats,
    }))
}

/// GET /api/delivery/earnings
pub async fn earnings(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<EarningsSummary>> {
    let caller = caller.require(Operation::ViewEarnings)?;
    let summary = state.manager.get_agent_earnings(&caller.id)?;
    Ok(Json(summary))
}
