// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type.
///
/// The first five variants are the error kinds the RPC surface
/// distinguishes for callers; the rest are ambient infrastructure
/// failures that never originate in domain logic.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("coordination store error: {0}")]
    Coordination(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<crate::domain::DomainError> for AppError {
    fn from(err: crate::domain::DomainError) -> Self {
        use crate::domain::DomainError as D;
        match err {
            D::InvalidTransition { .. } => AppError::FailedPrecondition(err.to_string()),
            D::NotFound { .. } => AppError::NotFound(err.to_string()),
            D::AlreadyExists { .. } => AppError::AlreadyExists(err.to_string()),
            D::FailedPrecondition(msg) => AppError::FailedPrecondition(msg),
            D::InvalidArgument(msg) => AppError::InvalidArgument(msg),
            D::Internal(msg) => AppError::Internal(msg),
        }
    }
}

// From implementations for infra crates (to avoid circular dependency)
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Database(err)
    }
}

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
