//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::core::{Result, ServerState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub epoch: String,
    pub shipment_count: u64,
    pub pending_shipment_count: u64,
}

pub async fn health(State(state): State<ServerState>) -> Result<Json<HealthResponse>> {
    let stats = state
        .manager
        .storage()
        .get_stats()
        .map_err(|e| crate::core::ServerError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(Json(HealthResponse {
        status: "ok",
        epoch: state.manager.epoch().to_string(),
        shipment_count: stats.shipment_count,
        pending_shipment_count: stats.pending_shipment_count,
    }))
}
