//! RPC Error Types
//!
//! Maps `AppError` to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use testorch_core::error::AppError;

/// RPC error codes, grouped the way the error kinds in section 7 are:
/// 4xxx client-caused, 5xxx server-caused.
pub mod code {
    pub const INVALID_ARGUMENT: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const ALREADY_EXISTS: i32 = 4002;
    pub const FAILED_PRECONDITION: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const COORDINATION_ERROR: i32 = 5002;
}

/// Convert `AppError` to a JSON-RPC `ErrorObject`.
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::InvalidArgument(msg) => {
            ErrorObjectOwned::owned(code::INVALID_ARGUMENT, msg, None::<()>)
        }
        AppError::NotFound(msg) => ErrorObjectOwned::owned(code::NOT_FOUND, msg, None::<()>),
        AppError::AlreadyExists(msg) => {
            ErrorObjectOwned::owned(code::ALREADY_EXISTS, msg, None::<()>)
        }
        AppError::FailedPrecondition(msg) => {
            ErrorObjectOwned::owned(code::FAILED_PRECONDITION, msg, None::<()>)
        }
        AppError::Database(msg) => ErrorObjectOwned::owned(code::DB_ERROR, msg, None::<()>),
        AppError::Coordination(msg) => {
            ErrorObjectOwned::owned(code::COORDINATION_ERROR, msg, None::<()>)
        }
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Io(e) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, e.to_string(), None::<()>),
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::INVALID_ARGUMENT, e.to_string(), None::<()>)
        }
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}
