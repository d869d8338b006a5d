//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::TopologyError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Application(e) => match e {
                ApplicationError::Topology(t) if t.is_argument_error() => crate::exitcode::DATAERR,
                ApplicationError::Topology(TopologyError::NoMatchingNode { .. }) => {
                    crate::exitcode::UNAVAILABLE
                }
                ApplicationError::Topology(_) => crate::exitcode::SOFTWARE,
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::UnknownNode(_) => crate::exitcode::DATAERR,
                ApplicationError::NotEnoughNodes { .. } => crate::exitcode::UNAVAILABLE,
            },
        }
    }
}
