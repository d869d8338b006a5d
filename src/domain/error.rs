//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Topology errors represent malformed node descriptors and structural violations.
/// None of them is retried internally; the caller decides what to do.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("invalid network location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("network location name contains '/': {0}")]
    InvalidName(String),

    #[error("invalid bookie id '{id}': {reason}")]
    InvalidBookieId { id: String, reason: String },

    /// A rack and a non-rack node would end up at the same level of the tree.
    #[error("invalid network topology: cannot add {path}: {reason}")]
    InvalidTopology { path: String, reason: String },

    #[error("leaf {path} declares level {level} but sits at level {expected}")]
    LevelMismatch {
        path: String,
        level: usize,
        expected: usize,
    },

    #[error("unexpected data node {node} at an illegal network location {location}")]
    IllegalNetworkLocation { node: String, location: String },

    #[error("not allowed to add an inner node: {0}")]
    InnerNodeAddition(String),

    #[error("not allowed to remove an inner node: {0}")]
    InvalidRemoval(String),

    #[error("failed to find a leaf (scope={scope})")]
    NoMatchingNode { scope: String },
}

impl TopologyError {
    /// True for errors caused by a malformed request rather than by the state of the tree.
    pub fn is_argument_error(&self) -> bool {
        !matches!(
            self,
            TopologyError::InvalidTopology { .. } | TopologyError::NoMatchingNode { .. }
        )
    }

    pub(crate) fn invalid_location(location: &str, reason: impl Into<String>) -> Self {
        TopologyError::InvalidLocation {
            location: location.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;
