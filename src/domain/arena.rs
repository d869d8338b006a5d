//! Arena-backed cluster map: the tree of inner nodes and leaves behind the topology lock.

use generational_arena::{Arena, Index};
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::error::{TopologyError, TopologyResult};
use crate::domain::location::{is_root_path, join, PATH_SEPARATOR, ROOT};
use crate::domain::node::{InnerNode, Leaf, Node};

const RACK_MISMATCH: &str =
    "you cannot have a rack and a non-rack node at the same level of the network topology";

/// Payload of a tree node: either an aggregation level or an attached leaf.
#[derive(Debug)]
pub enum NodeKind {
    Inner {
        /// Children in insertion order
        children: Vec<Index>,
        /// Leaves anywhere below this node
        num_of_leaves: usize,
    },
    Leaf(Leaf),
}

/// Tree node in the arena-based cluster map.
#[derive(Debug)]
pub struct TreeNode {
    /// Name relative to the parent; only leaves may be unnamed
    pub name: Option<String>,
    /// Path of the parent
    pub location: String,
    /// Distance from the root
    pub level: usize,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    pub kind: NodeKind,
}

impl TreeNode {
    fn inner(name: &str, location: String, level: usize, parent: Index) -> Self {
        Self {
            name: Some(name.to_string()),
            location,
            level,
            parent: Some(parent),
            kind: NodeKind::Inner {
                children: Vec::new(),
                num_of_leaves: 0,
            },
        }
    }

    pub fn path(&self) -> String {
        match self.parent {
            None => PATH_SEPARATOR.to_string(),
            Some(_) => join(&self.location, self.name.as_deref().unwrap_or_default()),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn children(&self) -> &[Index] {
        match &self.kind {
            NodeKind::Inner { children, .. } => children,
            NodeKind::Leaf(_) => &[],
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Inner { .. } => None,
        }
    }

    pub fn num_of_leaves(&self) -> usize {
        match &self.kind {
            NodeKind::Inner { num_of_leaves, .. } => *num_of_leaves,
            NodeKind::Leaf(_) => 1,
        }
    }

    /// Detached copy of this node as a descriptor.
    pub fn to_node(&self) -> Node {
        match &self.kind {
            NodeKind::Leaf(leaf) => Node::Leaf(leaf.clone()),
            NodeKind::Inner { .. } if self.parent.is_none() => Node::root(),
            NodeKind::Inner { .. } => Node::Inner(InnerNode::from_parts(
                self.name.clone().unwrap_or_default(),
                self.location.clone(),
            )),
        }
    }
}

/// Arena-backed tree of inner nodes and leaves rooted at an unnamed inner node.
///
/// Parent links are plain arena indices, so walking upwards never creates an
/// ownership cycle. Every inner node keeps the number of leaves below it,
/// which makes indexed leaf selection possible without materialising sets.
#[derive(Debug)]
pub struct ClusterMap {
    arena: Arena<TreeNode>,
    root: Index,
}

impl Default for ClusterMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterMap {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(TreeNode {
            name: Some(String::new()),
            location: ROOT.to_string(),
            level: 0,
            parent: None,
            kind: NodeKind::Inner {
                children: Vec::new(),
                num_of_leaves: 0,
            },
        });
        Self { arena, root }
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn num_of_leaves(&self) -> usize {
        self.get_node(self.root).map_or(0, TreeNode::num_of_leaves)
    }

    pub fn is_empty(&self) -> bool {
        self.num_of_leaves() == 0
    }

    fn child_named(&self, parent: Index, name: Option<&str>) -> Option<Index> {
        self.get_node(parent)?
            .children()
            .iter()
            .copied()
            .find(|&c| self.get_node(c).is_some_and(|n| n.name.as_deref() == name))
    }

    /// Resolve a full path from the root. `""` and `"/"` resolve to the root;
    /// paths without the leading separator resolve to nothing.
    #[instrument(level = "trace", skip(self))]
    pub fn locate(&self, path: &str) -> Option<Index> {
        if is_root_path(path) {
            return Some(self.root);
        }
        if !path.starts_with(PATH_SEPARATOR) {
            return None;
        }
        path[1..]
            .split(PATH_SEPARATOR)
            .try_fold(self.root, |current, segment| {
                self.child_named(current, Some(segment))
            })
    }

    /// Index of the attached leaf equal to `leaf` (name, location and level).
    pub fn find_leaf(&self, leaf: &Leaf) -> Option<Index> {
        let parent = self.locate(leaf.location().as_str())?;
        let idx = self.child_named(parent, leaf.name())?;
        (self.get_node(idx)?.as_leaf()? == leaf).then_some(idx)
    }

    /// Attach `leaf`, creating the missing inner nodes along its location.
    ///
    /// Returns `Ok(false)` if a leaf with the same name is already attached
    /// there. The whole path is checked before anything is inserted, so an
    /// error leaves the map untouched.
    #[instrument(level = "debug", skip(self), fields(path = %leaf.path()))]
    pub fn add_leaf(&mut self, leaf: &Leaf) -> TopologyResult<bool> {
        let segments: Vec<&str> = leaf.location().segments().collect();
        check_level(leaf, segments.len() + 1)?;

        let mut current = self.root;
        let mut existing = 0;
        for &segment in &segments {
            match self.child_named(current, Some(segment)) {
                None => break,
                Some(child) => {
                    if self.get_node(child).is_some_and(TreeNode::is_leaf) {
                        return Err(rack_mismatch(leaf, "a leaf occupies an inner position"));
                    }
                    current = child;
                    existing += 1;
                }
            }
        }
        if existing == segments.len() {
            if let Some(slot) = self.child_named(current, leaf.name()) {
                return match self.get_node(slot).map(|n| n.is_leaf()) {
                    Some(true) => {
                        debug!("leaf already attached");
                        Ok(false)
                    }
                    _ => Err(rack_mismatch(leaf, "an inner node occupies the leaf slot")),
                };
            }
        }

        for &segment in &segments[existing..] {
            current = self.insert_inner(current, segment)?;
        }
        let leaf_node = TreeNode {
            name: leaf.name().map(str::to_string),
            location: leaf.location().as_str().to_string(),
            level: segments.len() + 1,
            parent: Some(current),
            kind: NodeKind::Leaf(leaf.clone()),
        };
        let leaf_idx = self.arena.insert(leaf_node);
        if let Some(NodeKind::Inner { children, .. }) =
            self.arena.get_mut(current).map(|n| &mut n.kind)
        {
            children.push(leaf_idx);
        }

        let mut cursor = Some(current);
        while let Some(idx) = cursor {
            let Some(node) = self.arena.get_mut(idx) else {
                break;
            };
            if let NodeKind::Inner { num_of_leaves, .. } = &mut node.kind {
                *num_of_leaves += 1;
            }
            cursor = node.parent;
        }
        Ok(true)
    }

    fn insert_inner(&mut self, parent: Index, name: &str) -> TopologyResult<Index> {
        let (location, level) = {
            let p = self.get_node(parent).ok_or_else(|| TopologyError::InvalidTopology {
                path: name.to_string(),
                reason: "parent vanished while attaching".to_string(),
            })?;
            let location = if p.parent.is_none() {
                ROOT.to_string()
            } else {
                p.path()
            };
            (location, p.level + 1)
        };
        let idx = self
            .arena
            .insert(TreeNode::inner(name, location, level, parent));
        if let Some(NodeKind::Inner { children, .. }) =
            self.arena.get_mut(parent).map(|n| &mut n.kind)
        {
            children.push(idx);
        }
        Ok(idx)
    }

    /// Detach `leaf` and prune inner nodes left without children (never the root).
    ///
    /// Returns false if the leaf is not attached.
    #[instrument(level = "debug", skip(self), fields(path = %leaf.path()))]
    pub fn remove_leaf(&mut self, leaf: &Leaf) -> bool {
        let Some(idx) = self.find_leaf(leaf) else {
            return false;
        };
        let Some(removed) = self.arena.remove(idx) else {
            return false;
        };

        let mut detached = Some(idx);
        let mut cursor = removed.parent;
        while let Some(parent_idx) = cursor {
            let (prune, next) = {
                let Some(parent) = self.arena.get_mut(parent_idx) else {
                    break;
                };
                let next = parent.parent;
                let mut prune = false;
                if let NodeKind::Inner {
                    children,
                    num_of_leaves,
                } = &mut parent.kind
                {
                    if let Some(d) = detached {
                        children.retain(|&c| c != d);
                    }
                    *num_of_leaves = num_of_leaves.saturating_sub(1);
                    prune = children.is_empty() && next.is_some();
                }
                (prune, next)
            };
            detached = None;
            if prune {
                debug!("pruning empty inner node");
                self.arena.remove(parent_idx);
                detached = Some(parent_idx);
            }
            cursor = next;
        }
        true
    }

    /// All leaves below `idx` (or `idx` itself if it is a leaf) in tree order,
    /// skipping the `excluded` subtree.
    pub fn leaves_under(&self, idx: Index, excluded: Option<Index>) -> Vec<Leaf> {
        let mut leaves = Vec::new();
        self.collect_leaves(idx, excluded, &mut leaves);
        leaves
    }

    fn collect_leaves(&self, idx: Index, excluded: Option<Index>, leaves: &mut Vec<Leaf>) {
        if excluded == Some(idx) {
            return;
        }
        if let Some(node) = self.get_node(idx) {
            match &node.kind {
                NodeKind::Leaf(leaf) => leaves.push(leaf.clone()),
                NodeKind::Inner { children, .. } => {
                    for &child in children {
                        self.collect_leaves(child, excluded, leaves);
                    }
                }
            }
        }
    }

    pub fn is_ancestor_or_self(&self, ancestor: Index, idx: Index) -> bool {
        let mut cursor = Some(idx);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.get_node(current).and_then(|n| n.parent);
        }
        false
    }

    /// Leaves below `idx` that are not below `excluded`.
    pub fn count_leaves_excluding(&self, idx: Index, excluded: Option<Index>) -> usize {
        let total = self.get_node(idx).map_or(0, TreeNode::num_of_leaves);
        match excluded {
            Some(ex) if self.is_ancestor_or_self(ex, idx) => 0,
            Some(ex) if self.is_ancestor_or_self(idx, ex) => {
                total - self.get_node(ex).map_or(0, TreeNode::num_of_leaves)
            }
            _ => total,
        }
    }

    /// The `n`-th leaf below `idx` in tree order, skipping the `excluded` subtree.
    pub fn nth_leaf(&self, idx: Index, mut n: usize, excluded: Option<Index>) -> Option<Index> {
        let mut current = idx;
        loop {
            let node = self.get_node(current)?;
            if node.is_leaf() {
                return (n == 0 && excluded != Some(current)).then_some(current);
            }
            let mut next = None;
            for &child in node.children() {
                let count = self.count_leaves_excluding(child, excluded);
                if n < count {
                    next = Some(child);
                    break;
                }
                n -= count;
            }
            current = next?;
        }
    }

    /// Number of edges between two attached nodes via their lowest common ancestor.
    pub fn distance(&self, a: Index, b: Index) -> Option<usize> {
        let level = |i: Index| self.get_node(i).map(|n| n.level);
        let parent = |i: Index| self.get_node(i).and_then(|n| n.parent);

        let (mut a, mut b) = (a, b);
        let mut dis = 0;
        while level(a)? > level(b)? {
            a = parent(a)?;
            dis += 1;
        }
        while level(b)? > level(a)? {
            b = parent(b)?;
            dis += 1;
        }
        while a != b {
            a = parent(a)?;
            b = parent(b)?;
            dis += 2;
        }
        Some(dis)
    }

    /// Paths of the inner nodes that directly hold leaves, sorted.
    pub fn rack_paths(&self) -> Vec<String> {
        self.arena
            .iter()
            .filter(|(_, n)| {
                n.children()
                    .iter()
                    .any(|&c| self.get_node(c).is_some_and(TreeNode::is_leaf))
            })
            .map(|(_, n)| n.path())
            .sorted()
            .collect()
    }
}

/// A leaf's declared level must be the level the tree places it at.
pub(crate) fn check_level(leaf: &Leaf, expected: usize) -> TopologyResult<()> {
    if leaf.level() == expected {
        Ok(())
    } else {
        Err(TopologyError::LevelMismatch {
            path: leaf.path(),
            level: leaf.level(),
            expected,
        })
    }
}

fn rack_mismatch(leaf: &Leaf, detail: &str) -> TopologyError {
    TopologyError::InvalidTopology {
        path: leaf.path(),
        reason: format!("{RACK_MISMATCH} ({detail})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, location: &str) -> Leaf {
        Leaf::new(name, location).unwrap()
    }

    #[test]
    fn given_new_map_when_inspecting_then_only_root_exists() {
        let map = ClusterMap::new();
        assert!(map.is_empty());
        assert_eq!(map.locate(""), Some(map.root()));
        assert_eq!(map.locate("/"), Some(map.root()));
        assert_eq!(map.locate("/rack0"), None);
    }

    #[test]
    fn given_leaf_when_adding_then_creates_inner_nodes_and_counts_leaves() {
        let mut map = ClusterMap::new();
        assert!(map.add_leaf(&leaf("n1", "/dc1/rack0")).unwrap());
        assert!(map.add_leaf(&leaf("n2", "/dc1/rack1")).unwrap());

        let dc = map.locate("/dc1").unwrap();
        assert_eq!(map.get_node(dc).unwrap().num_of_leaves(), 2);
        assert_eq!(map.get_node(dc).unwrap().path(), "/dc1");
        let rack = map.locate("/dc1/rack0").unwrap();
        assert_eq!(map.get_node(rack).unwrap().level, 2);
        assert_eq!(map.num_of_leaves(), 2);
    }

    #[test]
    fn given_same_leaf_twice_when_adding_then_second_is_noop() {
        let mut map = ClusterMap::new();
        let n = leaf("n1", "/rack0");
        assert!(map.add_leaf(&n).unwrap());
        assert!(!map.add_leaf(&n).unwrap());
        assert_eq!(map.num_of_leaves(), 1);
    }

    #[test]
    fn given_relabelled_leaf_when_adding_or_removing_then_identity_includes_level() {
        let mut map = ClusterMap::new();
        let n = leaf("n1", "/rack0");
        map.add_leaf(&n).unwrap();
        let relabelled = n.clone().with_level(5);

        assert!(matches!(
            map.add_leaf(&relabelled),
            Err(TopologyError::LevelMismatch { level: 5, expected: 2, .. })
        ));
        assert_eq!(map.find_leaf(&relabelled), None);
        assert!(!map.remove_leaf(&relabelled));
        assert!(map.find_leaf(&n).is_some());
    }

    #[test]
    fn given_leaf_in_inner_position_when_adding_deeper_then_rejects_without_mutation() {
        let mut map = ClusterMap::new();
        map.add_leaf(&leaf("sec1", "/rack0")).unwrap();
        let result = map.add_leaf(&leaf("n2", "/rack0/sec1/deep"));
        assert!(matches!(result, Err(TopologyError::InvalidTopology { .. })));
        assert_eq!(map.num_of_leaves(), 1);
        assert_eq!(map.locate("/rack0/sec1/deep"), None);
    }

    #[test]
    fn given_inner_node_in_leaf_slot_when_adding_then_rejects() {
        let mut map = ClusterMap::new();
        map.add_leaf(&leaf("n1", "/rack0/sec1")).unwrap();
        let result = map.add_leaf(&leaf("sec1", "/rack0"));
        assert!(matches!(result, Err(TopologyError::InvalidTopology { .. })));
    }

    #[test]
    fn given_last_leaf_of_branch_when_removing_then_prunes_up_to_root() {
        let mut map = ClusterMap::new();
        let n1 = leaf("n1", "/dc1/rack0");
        let n2 = leaf("n2", "/dc2/rack0");
        map.add_leaf(&n1).unwrap();
        map.add_leaf(&n2).unwrap();

        assert!(map.remove_leaf(&n1));
        assert_eq!(map.locate("/dc1/rack0"), None);
        assert_eq!(map.locate("/dc1"), None);
        assert!(map.locate("/dc2/rack0").is_some());
        assert_eq!(map.num_of_leaves(), 1);

        assert!(map.remove_leaf(&n2));
        assert!(map.is_empty());
        assert_eq!(map.get_node(map.root()).unwrap().children().len(), 0);
        assert!(!map.remove_leaf(&n2));
    }

    #[test]
    fn given_excluded_subtree_when_counting_and_indexing_then_skips_it() {
        let mut map = ClusterMap::new();
        for (name, rack) in [("a", "/r0"), ("b", "/r0"), ("c", "/r1"), ("d", "/r2")] {
            map.add_leaf(&leaf(name, rack)).unwrap();
        }
        let root = map.root();
        let r0 = map.locate("/r0");
        assert_eq!(map.count_leaves_excluding(root, r0), 2);
        assert_eq!(map.count_leaves_excluding(r0.unwrap(), r0), 0);

        let picked: Vec<String> = (0..2)
            .filter_map(|i| map.nth_leaf(root, i, r0))
            .filter_map(|i| map.get_node(i).and_then(|n| n.name.clone()))
            .collect();
        assert_eq!(picked, vec!["c", "d"]);
        assert_eq!(map.nth_leaf(root, 2, r0), None);
    }

    #[test]
    fn given_leaves_when_measuring_distance_then_counts_hops_via_common_ancestor() {
        let mut map = ClusterMap::new();
        let a = leaf("a", "/r0");
        let b = leaf("b", "/r0");
        let c = leaf("c", "/r1");
        for l in [&a, &b, &c] {
            map.add_leaf(l).unwrap();
        }
        let (ia, ib, ic) = (
            map.find_leaf(&a).unwrap(),
            map.find_leaf(&b).unwrap(),
            map.find_leaf(&c).unwrap(),
        );
        assert_eq!(map.distance(ia, ia), Some(0));
        assert_eq!(map.distance(ia, ib), Some(2));
        assert_eq!(map.distance(ia, ic), Some(4));
    }

    #[test]
    fn given_leaves_when_listing_racks_then_returns_sorted_parent_paths() {
        let mut map = ClusterMap::new();
        map.add_leaf(&leaf("a", "/r1")).unwrap();
        map.add_leaf(&leaf("b", "/r0")).unwrap();
        map.add_leaf(&leaf("c", "/r0")).unwrap();
        assert_eq!(map.rack_paths(), vec!["/r0", "/r1"]);
    }

    #[test]
    fn given_excluded_rack_when_collecting_leaves_then_omits_its_subtree() {
        let mut map = ClusterMap::new();
        map.add_leaf(&leaf("a", "/r0")).unwrap();
        map.add_leaf(&leaf("b", "/r00")).unwrap();
        let names: Vec<_> = map
            .leaves_under(map.root(), map.locate("/r0"))
            .into_iter()
            .map(|l| l.path())
            .collect();
        assert_eq!(names, vec!["/r00/b"]);
    }
}
