//! Node resolution seam.
//!
//! The topology never walks the cluster map directly when it needs "the node
//! at this location"; it asks a [`NodeLookup`]. Tests swap in stub lookups to
//! force the rack-resolution branches of `add` and `remove`.

use crate::domain::arena::ClusterMap;
use crate::domain::node::{Leaf, Node};

pub trait NodeLookup: Send + Sync {
    /// Snapshot of the node at the full `path`, if any.
    fn node(&self, map: &ClusterMap, path: &str) -> Option<Node>;

    /// The rack a leaf would be attached to.
    fn node_for_location(&self, map: &ClusterMap, leaf: &Leaf) -> Option<Node> {
        self.node(map, leaf.location().as_str())
    }
}

/// Resolves paths by walking the cluster map from the root.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeLookup;

impl NodeLookup for TreeLookup {
    fn node(&self, map: &ClusterMap, path: &str) -> Option<Node> {
        map.locate(path)
            .and_then(|idx| map.get_node(idx))
            .map(|n| n.to_node())
    }
}
