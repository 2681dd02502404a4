//! Caller identity and authorization
//!
//! The engine never issues credentials. An upstream session provider
//! terminates authentication and forwards the trusted caller pair in
//! `x-caller-id` / `x-caller-role` headers; [`CallerIdentity`] extracts
//! it, [`policy`] decides what the role may do.

pub mod policy;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::str::FromStr;

use crate::core::ServerError;
use shared::{Caller, Role};

pub use policy::{authorize, Operation};

/// Extractor for the trusted caller identity headers
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Caller);

impl CallerIdentity {
    /// Reject the request unless the policy allows this operation
    pub fn require(&self, operation: Operation) -> Result<&Caller, ServerError> {
        if policy::authorize(self.0.role, operation) {
            Ok(&self.0)
        } else {
            Err(ServerError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller_id = parts
            .headers
            .get("x-caller-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(ServerError::Unauthorized)?;
        let role = parts
            .headers
            .get("x-caller-role")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Role::from_str(v).ok())
            .ok_or(ServerError::Unauthorized)?;

        Ok(CallerIdentity(Caller::new(caller_id, role)))
    }
}
