//! Stored cart endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{CallerIdentity, Operation};
use crate::core::{Result, ServerState};
use shared::PurchaseItem;

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<PurchaseItem>,
}

#[derive(Debug, Deserialize)]
pub struct PutCartRequest {
    pub items: Vec<PurchaseItem>,
}

/// GET /api/cart
pub async fn get_cart(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<CartResponse>> {
    let caller = caller.require(Operation::ManageCart)?;
    let items = state.manager.get_cart(&caller.id)?;
    Ok(Json(CartResponse { items }))
}

/// POST /api/cart - replace the stored cart
pub async fn put_cart(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<PutCartRequest>,
) -> Result<Json<CartResponse>> {
    let caller = caller.require(Operation::ManageCart)?;
    let items: Vec<PurchaseItem> = payload
        .items
        .into_iter()
        .filter(|item| item.quantity > 0)
        .collect();
    state.manager.put_cart(&caller.id, &items)?;
    Ok(Json(CartResponse { items }))
}

/// DELETE /api/cart
pub async fn clear_cart(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<CartResponse>> {
    let caller = caller.require(Operation::ManageCart)?;
    state.manager.clear_cart(&caller.id)?;
    Ok(Json(CartResponse { items: Vec::new() }))
}
