//! Checkout endpoint

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::api::into_result;
use crate::auth::{CallerIdentity, Operation};
use crate::core::{Result, ServerError, ServerState};
use shared::{Address, CommandPayload, CommandResponse, DispatchCommand, GeoPoint, PurchaseItem};

#[derive(Debug, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "zip code is required"))]
    pub zip_code: String,
    pub phone: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

impl From<AddressInput> for Address {
    fn from(input: AddressInput) -> Self {
        Address {
            street: input.street,
            city: input.city,
            state: input.state,
            zip_code: input.zip_code,
            phone: input.phone,
            coordinates: input.coordinates,
        }
    }
}

/// How the checkout is paid
///
/// Prepaid checkouts are gated on the upstream payment-verification
/// signal; cash-on-delivery goes straight through.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Prepaid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(nested)]
    pub shipping_address: AddressInput,
    /// Explicit purchase lines; omit to check out the stored cart
    pub items: Option<Vec<PurchaseItem>>,
    pub contact_name: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Set by the upstream payment-verification step
    #[serde(default)]
    pub payment_verified: bool,
}

/// Paid checkouts may only reach the aggregator once the upstream
/// verification signal is present
fn check_payment_gate(method: PaymentMethod, verified: bool) -> Result<()> {
    if method == PaymentMethod::Prepaid && !verified {
        return Err(ServerError::Validation(
            "payment has not been verified".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/checkout
pub async fn checkout(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CommandResponse>> {
    let caller = caller.require(Operation::Checkout)?.clone();
    payload
        .validate()
        .map_err(|e| ServerError::Validation(e.to_string()))?;
    check_payment_gate(payload.payment_method, payload.payment_verified)?;

    let cmd = DispatchCommand::new(
        caller,
        CommandPayload::Checkout {
            shipping_address: payload.shipping_address.into(),
            items: payload.items,
            contact_name: payload.contact_name,
        },
    );
    into_result(state.manager.execute_command(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_checkout_passes_the_gate() {
        assert!(check_payment_gate(PaymentMethod::Cash, false).is_ok());
        assert!(check_payment_gate(PaymentMethod::Cash, true).is_ok());
    }

    #[test]
    fn prepaid_checkout_requires_verification() {
        assert!(check_payment_gate(PaymentMethod::Prepaid, true).is_ok());
        assert!(check_payment_gate(PaymentMethod::Prepaid, false).is_err());
    }
}
