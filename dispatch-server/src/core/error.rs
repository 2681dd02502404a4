//! HTTP-facing error type

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::fulfillment::DispatchError;
use shared::{CommandError, CommandErrorCode};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ServerError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            ServerError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            ServerError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            ServerError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ServerError::Internal(err) => {
                // Log internal details without exposing them
                tracing::error!(error = ?err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DispatchError> for ServerError {
    fn from(err: DispatchError) -> Self {
        match &err {
            DispatchError::ShipmentNotFound(_)
            | DispatchError::OrderNotFound(_)
            | DispatchError::AgentNotFound(_)
            | DispatchError::ProductNotFound(_) => ServerError::NotFound(err.to_string()),
            DispatchError::NotAssignedToYou(_) => ServerError::Forbidden,
            DispatchError::AlreadyAssigned(_) | DispatchError::InsufficientStock { .. } => {
                ServerError::Conflict(err.to_string())
            }
            DispatchError::NoAgentsAvailable => ServerError::NotFound(err.to_string()),
            DispatchError::EmptyCart
            | DispatchError::InvalidAddress(_)
            | DispatchError::InvalidOtp
            | DispatchError::AgentNotEligible(_)
            | DispatchError::InvalidTransition { .. } => ServerError::Validation(err.to_string()),
            DispatchError::Storage(_) => ServerError::Internal(anyhow::anyhow!(err.to_string())),
        }
    }
}

/// Failed command responses surface with the matching HTTP status
impl From<CommandError> for ServerError {
    fn from(err: CommandError) -> Self {
        match err.code {
            CommandErrorCode::ShipmentNotFound
            | CommandErrorCode::OrderNotFound
            | CommandErrorCode::AgentNotFound
            | CommandErrorCode::ProductNotFound
            | CommandErrorCode::NoAgentsAvailable => ServerError::NotFound(err.message),
            CommandErrorCode::NotAssignedToYou => ServerError::Forbidden,
            CommandErrorCode::AlreadyAssigned | CommandErrorCode::InsufficientStock => {
                ServerError::Conflict(err.message)
            }
            CommandErrorCode::EmptyCart
            | CommandErrorCode::InvalidAddress
            | CommandErrorCode::InvalidOtp
            | CommandErrorCode::AgentNotEligible
            | CommandErrorCode::InvalidTransition => ServerError::Validation(err.message),
            CommandErrorCode::InternalError => {
                ServerError::Internal(anyhow::anyhow!(err.message))
            }
        }
    }
}

/// Result alias for HTTP handlers
pub type Result<T> = std::result::Result<T, ServerError>;
