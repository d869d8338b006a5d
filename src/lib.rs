//! racktopo: rack-aware cluster topology tracking
//!
//! Layers, innermost first:
//! - `domain`: the topology tree, node descriptors and errors
//! - `application`: membership and placement services
//! - `config`: layered settings
//! - `cli`: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod util;
