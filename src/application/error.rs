//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::TopologyError;

/// Application errors wrap topology errors and add service-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Topology(#[from] TopologyError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("not enough nodes: requested {requested}, available {available}")]
    NotEnoughNodes { requested: usize, available: usize },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
