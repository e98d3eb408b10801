//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur when building domain values from operator input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Connection id is not a positive integer
    #[error("Invalid connection id: {value}")]
    InvalidConnectionId { value: String },

    /// IP address failed to parse
    #[error("Invalid IP address: {value}")]
    InvalidAddress { value: String },

    /// Port is not in 1-65535
    #[error("Invalid port: {value} (expected 1-65535)")]
    InvalidPort { value: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
