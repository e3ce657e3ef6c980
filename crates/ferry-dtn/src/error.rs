//! DTN-specific error types

use thiserror::Error;

/// Errors that can occur in the DTN subsystem
#[derive(Debug, Error)]
pub enum DtnError {
    /// Copy-count bookkeeping errors
    #[error("Copy error: {0}")]
    Copy(#[from] CopyError),

    /// Routing errors
    #[error("Routing error: {0}")]
    Routing(#[from] ferry_core::RoutingError),

    /// Settings errors
    #[error("Config error: {0}")]
    Config(#[from] ferry_core::ConfigError),
}

/// Copy-count errors
#[derive(Debug, Error)]
pub enum CopyError {
    /// A received message carried no copy count, so it was not created
    /// by a router of this strategy
    #[error("Message {message} carries no copy count")]
    MissingCopyCount { message: String },
}

/// Result type for DTN operations
pub type DtnResult<T> = Result<T, DtnError>;
