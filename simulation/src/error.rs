//! Simulation error types

use thiserror::Error;

use ferry_core::{ConfigError, HostId};
use ferry_dtn::DtnError;

/// Errors raised while setting up or running a simulation
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid or missing settings
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A router rejected an event
    #[error("Routing error: {0}")]
    Dtn(#[from] DtnError),

    /// Malformed contact trace line
    #[error("Contact trace line {line}: {reason}")]
    Trace { line: usize, reason: String },

    /// An event names a node outside the configured population
    #[error("Unknown node {0}")]
    UnknownNode(HostId),

    /// Reading or writing a trace file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;
