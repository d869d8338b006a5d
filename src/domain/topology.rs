//! The concurrent rack-aware topology tracker.
//!
//! One readers-writer lock guards the whole cluster map: `add` and `remove`
//! take it exclusively, every query shares it. Guards are scoped, so the lock
//! is released on every exit path including errors.

use std::fmt;

use generational_arena::Index;
use itertools::Itertools;
use parking_lot::RwLock;
use rand::Rng;
use termtree::Tree;
use tracing::{debug, error, info, instrument};

use crate::domain::arena::{check_level, ClusterMap};
use crate::domain::error::{TopologyError, TopologyResult};
use crate::domain::location::Scope;
use crate::domain::lookup::{NodeLookup, TreeLookup};
use crate::domain::node::{Leaf, Node};
use crate::domain::tree_view::TreeNodeConvert;

#[derive(Debug, Default)]
struct TopologyState {
    cluster: ClusterMap,
    num_of_racks: usize,
    /// Fixed by the first attached leaf, cleared when the map empties again
    depth_of_all_leaves: Option<usize>,
}

impl TopologyState {
    /// Root (or scope root) and excluded subtree for a scope expression.
    fn resolve_scope(&self, scope: &str) -> (Option<Index>, Option<Index>) {
        match Scope::parse(scope) {
            Scope::Within(path) => (self.cluster.locate(path), None),
            Scope::Excluding(path) => (Some(self.cluster.root()), self.cluster.locate(path)),
        }
    }
}

impl fmt::Display for TopologyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of racks: {}", self.num_of_racks)?;
        writeln!(f, "Expected number of leaves:{}", self.cluster.num_of_leaves())?;
        for leaf in self.cluster.leaves_under(self.cluster.root(), None) {
            writeln!(f, "{}", leaf.path())?;
        }
        Ok(())
    }
}

/// Tree-shaped index of storage nodes keyed by their network location.
///
/// Only leaves are attached by callers; inner nodes (racks, data centers) are
/// created on demand along a leaf's location and pruned when they empty.
#[derive(Debug)]
pub struct NetworkTopology<L: NodeLookup = TreeLookup> {
    state: RwLock<TopologyState>,
    lookup: L,
}

impl Default for NetworkTopology<TreeLookup> {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkTopology<TreeLookup> {
    pub fn new() -> Self {
        Self::with_lookup(TreeLookup)
    }
}

impl<L: NodeLookup> NetworkTopology<L> {
    /// Topology resolving racks through a custom lookup.
    pub fn with_lookup(lookup: L) -> Self {
        Self {
            state: RwLock::new(TopologyState::default()),
            lookup,
        }
    }

    /// Attach a leaf. `None` is a no-op; re-adding an attached leaf is a no-op.
    ///
    /// # Errors
    /// - `InnerNodeAddition` for an inner-node descriptor
    /// - `InvalidTopology` if the leaf would sit at a different depth than the
    ///   leaves already attached, or its slot is taken by a node of the other kind
    /// - `IllegalNetworkLocation` if the rack resolved for the leaf is itself a leaf
    /// - `LevelMismatch` if the leaf declares a level other than its location's depth
    #[instrument(level = "debug", skip_all)]
    pub fn add<'a>(&self, node: impl Into<Option<&'a Node>>) -> TopologyResult<()> {
        let Some(node) = node.into() else {
            return Ok(());
        };
        let leaf = match node {
            Node::Inner(inner) => return Err(TopologyError::InnerNodeAddition(inner.path())),
            Node::Leaf(leaf) => leaf,
        };
        let new_depth = leaf.location().depth() + 1;
        check_level(leaf, new_depth)?;

        let mut state = self.state.write();
        if let Some(expected) = state.depth_of_all_leaves {
            if expected != new_depth {
                error!(
                    "can't add leaf node {} at depth {} to topology:\n{}",
                    leaf.path(),
                    new_depth,
                    *state
                );
                return Err(TopologyError::InvalidTopology {
                    path: leaf.path(),
                    reason: format!(
                        "you cannot have a rack and a non-rack node at the same level of the network topology (depth {new_depth}, expected {expected})"
                    ),
                });
            }
        }

        let rack = self.lookup.node_for_location(&state.cluster, leaf);
        if let Some(Node::Leaf(_)) = rack {
            return Err(TopologyError::IllegalNetworkLocation {
                node: leaf.path(),
                location: leaf.location().to_string(),
            });
        }

        let added = state.cluster.add_leaf(leaf).inspect_err(|e| {
            error!("can't add leaf node {} to topology: {}", leaf.path(), e);
        })?;
        if added {
            info!("Adding a new node: {}", leaf.path());
            if rack.is_none() {
                state.num_of_racks += 1;
            }
            if state.depth_of_all_leaves.is_none() {
                state.depth_of_all_leaves = Some(new_depth);
            }
        } else {
            debug!("node {} already in topology", leaf.path());
        }
        Ok(())
    }

    /// Detach a leaf, pruning racks left empty. `None` and unattached leaves are no-ops.
    ///
    /// # Errors
    /// `InvalidRemoval` for an inner-node descriptor.
    #[instrument(level = "debug", skip_all)]
    pub fn remove<'a>(&self, node: impl Into<Option<&'a Node>>) -> TopologyResult<()> {
        let Some(node) = node.into() else {
            return Ok(());
        };
        let leaf = match node {
            Node::Inner(inner) => return Err(TopologyError::InvalidRemoval(inner.path())),
            Node::Leaf(leaf) => leaf,
        };
        info!("Removing a node: {}", leaf.path());

        let mut state = self.state.write();
        if !state.cluster.remove_leaf(leaf) {
            debug!("node {} not in topology", leaf.path());
            return Ok(());
        }
        // The rack only disappears once its last leaf is gone.
        if self
            .lookup
            .node(&state.cluster, leaf.location().as_str())
            .is_none()
        {
            state.num_of_racks = state.num_of_racks.saturating_sub(1);
        }
        if state.cluster.is_empty() {
            state.depth_of_all_leaves = None;
        }
        Ok(())
    }

    /// True iff the exact leaf is attached at its declared location.
    pub fn contains<'a>(&self, node: impl Into<Option<&'a Node>>) -> bool {
        let Some(Node::Leaf(leaf)) = node.into() else {
            return false;
        };
        self.state.read().cluster.find_leaf(leaf).is_some()
    }

    /// Leaves within `scope`.
    ///
    /// `""` is the whole tree, `/rack0` the leaves under that path (matched by
    /// segment, so `/rack00` is not included), `~/rack0` everything else.
    /// Unknown scopes yield nothing, their negation everything.
    #[instrument(level = "debug", skip(self))]
    pub fn get_leaves(&self, scope: &str) -> Vec<Leaf> {
        let state = self.state.read();
        match state.resolve_scope(scope) {
            (Some(within), excluded) => state.cluster.leaves_under(within, excluded),
            (None, _) => Vec::new(),
        }
    }

    /// One leaf chosen uniformly at random within `scope` (same syntax as [`Self::get_leaves`]).
    ///
    /// # Errors
    /// `NoMatchingNode` if the scope holds no leaf.
    #[instrument(level = "debug", skip(self))]
    pub fn choose_random(&self, scope: &str) -> TopologyResult<Leaf> {
        let no_match = || TopologyError::NoMatchingNode {
            scope: scope.to_string(),
        };
        let state = self.state.read();
        let (within, excluded) = state.resolve_scope(scope);
        let within = within.ok_or_else(no_match)?;

        let available = state.cluster.count_leaves_excluding(within, excluded);
        if available == 0 {
            return Err(no_match());
        }
        let n = rand::thread_rng().gen_range(0..available);
        state
            .cluster
            .nth_leaf(within, n, excluded)
            .and_then(|idx| state.cluster.get_node(idx))
            .and_then(|node| node.as_leaf().cloned())
            .ok_or_else(no_match)
    }

    /// Leaves within `scope` that are not in `excluded`.
    pub fn count_available(&self, scope: &str, excluded: &[Leaf]) -> usize {
        let state = self.state.read();
        let (Some(within), excluded_scope) = state.resolve_scope(scope) else {
            return 0;
        };
        let available = state.cluster.count_leaves_excluding(within, excluded_scope);
        let taken = excluded
            .iter()
            .filter_map(|leaf| state.cluster.find_leaf(leaf))
            .unique()
            .filter(|&idx| state.cluster.count_leaves_excluding(idx, excluded_scope) == 1)
            .filter(|&idx| state.cluster.is_ancestor_or_self(within, idx))
            .count();
        available.saturating_sub(taken)
    }

    pub fn num_of_racks(&self) -> usize {
        self.state.read().num_of_racks
    }

    pub fn num_of_leaves(&self) -> usize {
        self.state.read().cluster.num_of_leaves()
    }

    pub fn depth_of_all_leaves(&self) -> Option<usize> {
        self.state.read().depth_of_all_leaves
    }

    /// Snapshot of the node at a full path, resolved through the lookup.
    pub fn node(&self, path: &str) -> Option<Node> {
        let state = self.state.read();
        self.lookup.node(&state.cluster, path)
    }

    /// Paths of all racks, sorted.
    pub fn racks(&self) -> Vec<String> {
        self.state.read().cluster.rack_paths()
    }

    /// Both leaves attached and sharing the same parent.
    pub fn is_on_same_rack(&self, a: &Leaf, b: &Leaf) -> bool {
        let state = self.state.read();
        let parent = |leaf: &Leaf| {
            state
                .cluster
                .find_leaf(leaf)
                .and_then(|idx| state.cluster.get_node(idx))
                .and_then(|n| n.parent)
        };
        match (parent(a), parent(b)) {
            (Some(pa), Some(pb)) => pa == pb,
            _ => false,
        }
    }

    /// Hop count between two attached leaves; `None` if either is not attached.
    pub fn distance(&self, a: &Leaf, b: &Leaf) -> Option<usize> {
        let state = self.state.read();
        let ia = state.cluster.find_leaf(a)?;
        let ib = state.cluster.find_leaf(b)?;
        state.cluster.distance(ia, ib)
    }

    /// Rendering of the whole tree.
    pub fn to_tree(&self) -> Tree<String> {
        self.state.read().cluster.to_tree_string()
    }

    /// Whether any guard on the topology lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// Whether the topology lock is currently held exclusively.
    pub fn is_write_locked(&self) -> bool {
        self.state.is_locked_exclusive()
    }
}

impl<L: NodeLookup> fmt::Display for NetworkTopology<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self.state.read())
    }
}
