//! Renders the cluster map as a `termtree` tree with per-node leaf counts.

use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::{ClusterMap, NodeKind};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for ClusterMap {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn label(map: &ClusterMap, idx: Index) -> String {
            match map.get_node(idx) {
                Some(node) => match &node.kind {
                    NodeKind::Leaf(leaf) => leaf.name().unwrap_or("<unnamed>").to_string(),
                    NodeKind::Inner { num_of_leaves, .. } if node.parent.is_none() => {
                        format!("/ ({num_of_leaves} leaves)")
                    }
                    NodeKind::Inner { num_of_leaves, .. } => format!(
                        "{} ({} leaves)",
                        node.name.as_deref().unwrap_or_default(),
                        num_of_leaves
                    ),
                },
                None => String::new(),
            }
        }

        fn build_tree(map: &ClusterMap, node_idx: Index, parent_tree: &mut Tree<String>) {
            if let Some(node) = map.get_node(node_idx) {
                for &child_idx in node.children() {
                    let mut child_tree = Tree::new(label(map, child_idx));
                    build_tree(map, child_idx, &mut child_tree);
                    parent_tree.push(child_tree);
                }
            }
        }

        let mut tree = Tree::new(label(self, self.root()));
        build_tree(self, self.root(), &mut tree);
        tree
    }
}
