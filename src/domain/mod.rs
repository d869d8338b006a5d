//! Domain layer: the topology tree and its node model
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod bookie;
pub mod error;
pub mod location;
pub mod lookup;
pub mod node;
pub mod topology;
pub mod tree_view;

pub use arena::{ClusterMap, NodeKind, TreeNode};
pub use bookie::BookieId;
pub use error::{TopologyError, TopologyResult};
pub use location::{NetworkLocation, Scope, PATH_SEPARATOR, PATH_SEPARATOR_STR, ROOT, SCOPE_NOT_INDICATOR};
pub use lookup::{NodeLookup, TreeLookup};
pub use node::{InnerNode, Leaf, Node};
pub use topology::NetworkTopology;
pub use tree_view::TreeNodeConvert;
