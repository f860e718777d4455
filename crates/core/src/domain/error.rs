// Domain Error Types

use thiserror::Error;

/// Errors raised by pure domain logic (state machines, validation).
///
/// Each variant maps onto one of the handful of error kinds the RPC
/// surface exposes to callers (see `crate::error::AppError`): callers
/// never see `DomainError` directly.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid state transition for {entity} {id}: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
