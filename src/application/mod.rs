//! Application layer: cluster membership and placement on top of the topology

pub mod error;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
