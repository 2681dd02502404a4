//! Customer order endpoints

use axum::extract::{Path, State};
use axum::Json;

use crate::auth::{CallerIdentity, Operation};
use crate::core::{Result, ServerError, ServerState};
use shared::{Order, Role};

/// GET /api/orders - the calling customer's orders, newest first
pub async fn list_mine(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<Order>>> {
    let caller = caller.require(Operation::ViewOwnOrders)?;
    let orders = state.manager.get_orders_for_customer(&caller.id)?;
    Ok(Json(orders))
}

/// GET /api/orders/{id} - owner or admin only
pub async fn get_by_id(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(order_id): Path<String>,
) -> Result<Json<Order>> {
    let order = state
        .manager
        .get_order(&order_id)?
        .ok_or_else(|| ServerError::NotFound(format!("Order {} not found", order_id)))?;

    let allowed = match caller.0.role {
        Role::Admin => true,
        Role::Customer => order.customer_id == caller.0.id,
        Role::Seller => order.seller_id == caller.0.id,
        Role::DeliveryAgent => false,
    };
    if !allowed {
        return Err(ServerError::Forbidden);
    }
    Ok(Json(order))
}
