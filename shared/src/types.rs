//! Caller identity types
//!
//! The engine never issues credentials. Every operation arrives with a
//! `{caller_id, role}` pair supplied by the upstream identity provider
//! and trusts it as-is.

use serde::{Deserialize, Serialize};

/// Marketplace role of the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Seller,
    DeliveryAgent,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "seller" => Ok(Role::Seller),
            "delivery" | "delivery_agent" => Ok(Role::DeliveryAgent),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Authenticated caller, as handed to us by the session provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}
