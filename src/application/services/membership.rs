//! Cluster membership service
//!
//! Maps bookie ids to racks and keeps the topology in step with the set of
//! joined nodes.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{BookieId, Leaf, NetworkTopology, Node};

/// Service tracking which bookies are part of the cluster.
pub struct MembershipService {
    topology: Arc<NetworkTopology>,
    settings: Settings,
    members: Mutex<BTreeMap<String, Leaf>>,
}

impl MembershipService {
    /// Create a membership service with the rack mapping from `settings`.
    ///
    /// No node is joined yet; see [`Self::bootstrap`].
    pub fn new(topology: Arc<NetworkTopology>, settings: &Settings) -> Self {
        Self {
            topology,
            settings: settings.clone(),
            members: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create the service and join every node listed in `settings`.
    pub fn bootstrap(
        topology: Arc<NetworkTopology>,
        settings: &Settings,
    ) -> ApplicationResult<Self> {
        let service = Self::new(topology, settings);
        for entry in &settings.nodes {
            service.join(&entry.id)?;
        }
        debug!("bootstrap: {} members", service.members.lock().len());
        Ok(service)
    }

    pub fn topology(&self) -> &Arc<NetworkTopology> {
        &self.topology
    }

    /// Rack a node is mapped to, joined or not.
    pub fn rack_of(&self, id: &str) -> &str {
        self.settings.rack_for(id)
    }

    /// Add a bookie to the cluster. Joining twice returns the existing leaf.
    ///
    /// # Errors
    /// - `InvalidBookieId` for malformed ids
    /// - Any topology error raised while attaching the leaf
    #[instrument(level = "debug", skip(self))]
    pub fn join(&self, id: &str) -> ApplicationResult<Leaf> {
        let bookie = BookieId::parse(id)?;
        let mut members = self.members.lock();
        if let Some(existing) = members.get(bookie.as_str()) {
            debug!("join: {} already a member", bookie);
            return Ok(existing.clone());
        }

        let leaf = Leaf::bookie(&bookie, self.rack_of(bookie.as_str()))?;
        self.topology.add(&Node::from(leaf.clone()))?;
        info!("Joined {} at {}", bookie, leaf.location());
        members.insert(bookie.to_string(), leaf.clone());
        Ok(leaf)
    }

    /// Remove a joined bookie from the cluster.
    ///
    /// # Errors
    /// `UnknownNode` if the bookie never joined.
    #[instrument(level = "debug", skip(self))]
    pub fn leave(&self, id: &str) -> ApplicationResult<Leaf> {
        let mut members = self.members.lock();
        let leaf = members
            .remove(id)
            .ok_or_else(|| ApplicationError::UnknownNode(id.to_string()))?;
        self.topology.remove(&Node::from(leaf.clone()))?;
        info!("Left {} from {}", id, leaf.location());
        Ok(leaf)
    }

    /// Leaf of a joined bookie.
    pub fn member(&self, id: &str) -> Option<Leaf> {
        self.members.lock().get(id).cloned()
    }

    /// Joined bookies, ordered by id.
    pub fn members(&self) -> Vec<Leaf> {
        self.members.lock().values().cloned().collect()
    }
}
