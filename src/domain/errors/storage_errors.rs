use thiserror::Error;

use super::ValidationError;

/// Errors that can occur during bucket operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found
    #[error("Object not found: {key}")]
    ObjectNotFound { key: String },

    /// Object already exists (conditional create)
    #[error("Object already exists: {key}")]
    ObjectAlreadyExists { key: String },

    /// Append attempted on an object that was not created by appends
    #[error("Object '{key}' is not appendable")]
    NotAppendable { key: String },

    /// Append position does not match the object's next append offset
    #[error("Append position mismatch for '{key}': next position is {expected}, got {actual}")]
    PositionMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Object changed between read and conditional write
    #[error("Concurrent modification of object: {key}")]
    Conflict { key: String },

    /// Object exceeds the size a single operation accepts
    #[error("Object '{key}' is too large: {size} bytes (limit: {limit})")]
    ObjectTooLarge { key: String, size: u64, limit: u64 },

    /// Access denied by the provider
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// Caller supplied an argument the provider would reject
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// Key or bucket name failed validation
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    /// Operation not supported by the configured backend
    #[error("Unsupported operation '{operation}': {reason}")]
    UnsupportedOperation { operation: String, reason: String },

    /// Client could not be constructed from configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Local file I/O failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error reported by the storage provider
    #[error("Storage provider error: {message}")]
    Provider { message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
