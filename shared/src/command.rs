//! Dispatch commands - requests for state mutation
//!
//! Every externally triggered operation is wrapped in a [`DispatchCommand`]
//! envelope carrying a unique command id (for idempotent resubmission),
//! the trusted caller identity and a client timestamp.

use crate::geo::{Address, GeoPoint};
use crate::types::Caller;
use serde::{Deserialize, Serialize};

/// One requested purchase line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseItem {
    pub product_id: String,
    pub quantity: i64,
}

/// Command payload variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandPayload {
    /// Turn a cart or an explicit item list into seller-scoped orders.
    /// `items: None` means "use the caller's stored cart".
    Checkout {
        shipping_address: Address,
        #[serde(skip_serializing_if = "Option::is_none")]
        items: Option<Vec<PurchaseItem>>,
        /// Recipient name for the shipment label; the session provider
        /// only hands us an opaque caller id
        #[serde(skip_serializing_if = "Option::is_none")]
        contact_name: Option<String>,
    },

    /// Self-claim a pending shipment, or confirm an assigned one
    AcceptShipment { shipment_id: String },

    /// Bound agent declines an assigned shipment
    RejectShipment { shipment_id: String },

    /// Bind the nearest eligible agent to a pending shipment
    AutoAssign { shipment_id: String },

    /// Admin-directed binding of a specific agent
    AssignAgent {
        shipment_id: String,
        agent_id: String,
    },

    /// Bound agent picked the parcel up at the seller
    Pickup {
        shipment_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<GeoPoint>,
    },

    /// Bound agent departed toward the customer
    Depart {
        shipment_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<GeoPoint>,
    },

    /// OTP-gated delivery completion
    Complete {
        shipment_id: String,
        otp_code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<GeoPoint>,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },

    /// Operational failure - terminal
    FailShipment {
        shipment_id: String,
        reason: String,
    },

    /// Advisory courier position update
    UpdateLocation {
        shipment_id: String,
        location: GeoPoint,
    },
}

/// Command envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchCommand {
    /// Unique per submission; duplicates are answered benignly
    pub command_id: String,
    pub caller: Caller,
    /// Client timestamp (Unix milliseconds), audit only
    pub timestamp: i64,
    pub payload: CommandPayload,
}

impl DispatchCommand {
    pub fn new(caller: Caller, payload: CommandPayload) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            caller,
            timestamp: crate::util::now_millis(),
            payload,
        }
    }
}

/// Wire error codes, stable across client versions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    InsufficientStock,
    EmptyCart,
    InvalidAddress,
    NotAssignedToYou,
    AlreadyAssigned,
    InvalidOtp,
    NoAgentsAvailable,
    InvalidTransition,
    ShipmentNotFound,
    OrderNotFound,
    AgentNotFound,
    ProductNotFound,
    AgentNotEligible,
    InternalError,
}

/// Structured command error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Summary of one order created at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacedOrder {
    pub order_id: String,
    pub shipment_id: String,
    pub seller_id: String,
    pub tracking_number: String,
    pub otp_code: String,
    pub total_amount: f64,
}

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandResponse {
    pub command_id: String,
    pub success: bool,
    /// True when the command id was already processed (benign resubmission)
    #[serde(default)]
    pub duplicate: bool,
    /// Shipment affected by a lifecycle command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
    /// Orders created by a checkout, one per seller
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orders: Vec<PlacedOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String) -> Self {
        Self {
            command_id,
            success: true,
            duplicate: false,
            shipment_id: None,
            orders: Vec::new(),
            error: None,
        }
    }

    pub fn with_shipment(command_id: String, shipment_id: String) -> Self {
        let mut resp = Self::success(command_id);
        resp.shipment_id = Some(shipment_id);
        resp
    }

    pub fn with_orders(command_id: String, orders: Vec<PlacedOrder>) -> Self {
        let mut resp = Self::success(command_id);
        resp.orders = orders;
        resp
    }

    pub fn duplicate(command_id: String) -> Self {
        let mut resp = Self::success(command_id);
        resp.duplicate = true;
        resp
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            duplicate: false,
            shipment_id: None,
            orders: Vec::new(),
            error: Some(error),
        }
    }
}
