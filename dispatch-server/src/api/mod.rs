//! API route modules
//!
//! # Structure
//!
//! - [`health`] - liveness and storage stats
//! - [`checkout`] - order placement
//! - [`cart`] - stored cart management
//! - [`delivery`] - agent lifecycle operations (accept, pickup, complete…)
//! - [`shipments`] - shipment lookup and tracking
//! - [`orders`] - customer order queries

pub mod cart;
pub mod checkout;
pub mod delivery;
pub mod health;
pub mod orders;
pub mod shipments;

use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::core::{Result, ServerState};
use shared::{CommandError, CommandErrorCode, CommandResponse};

/// Build the full API router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/checkout", post(checkout::checkout))
        .route(
            "/api/cart",
            get(cart::get_cart).post(cart::put_cart).delete(cart::clear_cart),
        )
        .route("/api/delivery/accept", post(delivery::accept))
        .route(
            "/api/delivery/assignments",
            get(delivery::assignments).patch(delivery::decide_assignment),
        )
        .route(
            "/api/delivery/assignments/auto-assign",
            post(delivery::auto_assign),
        )
        .route(
            "/api/delivery/shipments/pending",
            get(shipments::pending),
        )
        .route(
            "/api/delivery/shipments/{id}/assign",
            patch(delivery::direct_assign),
        )
        .route(
            "/api/delivery/pickup",
            post(delivery::pickup).patch(delivery::depart),
        )
        .route("/api/delivery/complete", post(delivery::complete))
        .route("/api/delivery/fail", post(delivery::fail))
        .route("/api/delivery/location", post(delivery::update_location))
        .route("/api/delivery/availability", patch(delivery::availability))
        .route("/api/delivery/earnings", get(delivery::earnings))
        .route("/api/shipments/{id}", get(shipments::get_by_id))
        .route(
            "/api/shipments/track/{tracking}",
            get(shipments::get_by_tracking),
        )
        .route("/api/shipments/{id}/events", get(shipments::events))
        .route("/api/orders", get(orders::list_mine))
        .route("/api/orders/{id}", get(orders::get_by_id))
        .with_state(state)
}

/// Turn a command response into an HTTP result: failures surface with the
/// status matching their error code, partial checkout successes pass
/// through with both orders and error in the body.
pub(crate) fn into_result(response: CommandResponse) -> Result<Json<CommandResponse>> {
    if response.success {
        Ok(Json(response))
    } else {
        let error = response.error.unwrap_or_else(|| {
            CommandError::new(CommandErrorCode::InternalError, "command failed")
        });
        Err(error.into())
    }
}
