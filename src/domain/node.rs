//! Node descriptors handed to and returned from the topology.

use std::fmt;

use crate::domain::bookie::BookieId;
use crate::domain::error::{TopologyError, TopologyResult};
use crate::domain::location::{
    is_root_path, join, path_depth, NetworkLocation, PATH_SEPARATOR, PATH_SEPARATOR_STR, ROOT,
};

/// Terminal topology entry: one physical storage node.
///
/// The name is optional; an absent name is a degenerate but valid identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Leaf {
    name: Option<String>,
    location: NetworkLocation,
    /// Distance to the root; derived from the location unless set explicitly.
    level: usize,
}

impl Leaf {
    pub fn new(name: &str, location: &str) -> TopologyResult<Self> {
        Self::try_new(Some(name), Some(location))
    }

    /// Build a leaf from possibly-absent parts.
    ///
    /// # Errors
    /// - `InvalidName` if the name contains `/`
    /// - `InvalidLocation` if the location is absent, empty, the root, or lacks the leading `/`
    pub fn try_new(name: Option<&str>, location: Option<&str>) -> TopologyResult<Self> {
        let name = name.map(validate_name).transpose()?;
        let location = NetworkLocation::parse(location)?;
        let level = location.depth() + 1;
        Ok(Self {
            name,
            location,
            level,
        })
    }

    /// Leaf named after a bookie identity.
    pub fn bookie(id: &BookieId, location: &str) -> TopologyResult<Self> {
        Self::new(id.as_str(), location)
    }

    /// Override the distance-to-root marker.
    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn location(&self) -> &NetworkLocation {
        &self.location
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Full path: location plus name.
    pub fn path(&self) -> String {
        join(self.location.as_str(), self.name().unwrap_or_default())
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Aggregation level (data center, rack, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InnerNode {
    name: String,
    location: String,
}

impl InnerNode {
    /// # Errors
    /// `InvalidName` for a name containing `/`, `InvalidLocation` for a
    /// non-root location without the leading `/`.
    pub fn new(name: &str, location: &str) -> TopologyResult<Self> {
        let name = validate_name(name)?;
        if !is_root_path(location) && !location.starts_with(PATH_SEPARATOR) {
            return Err(TopologyError::invalid_location(
                location,
                "location must start with '/'",
            ));
        }
        Ok(Self {
            name,
            location: location.to_string(),
        })
    }

    pub fn root() -> Self {
        Self {
            name: String::new(),
            location: ROOT.to_string(),
        }
    }

    pub(crate) fn from_parts(name: String, location: String) -> Self {
        Self { name, location }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty() && self.location == ROOT
    }

    pub fn path(&self) -> String {
        if self.is_root() {
            PATH_SEPARATOR_STR.to_string()
        } else {
            join(&self.location, &self.name)
        }
    }

    pub fn level(&self) -> usize {
        if self.is_root() {
            0
        } else {
            path_depth(&self.location) + 1
        }
    }
}

impl fmt::Display for InnerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Either kind of topology entry. Both have a name and a location; only
/// leaves can be attached or detached by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Leaf(Leaf),
    Inner(InnerNode),
}

impl Node {
    pub fn leaf(name: &str, location: &str) -> TopologyResult<Self> {
        Leaf::new(name, location).map(Node::Leaf)
    }

    pub fn inner(name: &str, location: &str) -> TopologyResult<Self> {
        InnerNode::new(name, location).map(Node::Inner)
    }

    pub fn root() -> Self {
        Node::Inner(InnerNode::root())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Leaf(leaf) => leaf.name(),
            Node::Inner(inner) => Some(inner.name()),
        }
    }

    pub fn location(&self) -> &str {
        match self {
            Node::Leaf(leaf) => leaf.location().as_str(),
            Node::Inner(inner) => inner.location(),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Node::Leaf(leaf) => leaf.path(),
            Node::Inner(inner) => inner.path(),
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Inner(_) => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Node::Leaf(leaf)
    }
}

impl From<InnerNode> for Node {
    fn from(inner: InnerNode) -> Self {
        Node::Inner(inner)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn validate_name(name: &str) -> TopologyResult<String> {
    if name.contains(PATH_SEPARATOR) {
        return Err(TopologyError::InvalidName(name.to_string()));
    }
    Ok(name.to_string())
}
