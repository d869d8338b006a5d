//! Rack-aware ensemble placement
//!
//! Spreads an ensemble across as many racks as the topology offers before
//! placing two members on the same rack.

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Leaf, NetworkTopology, ROOT};

/// Service choosing storage nodes for new and repaired ensembles.
pub struct PlacementService {
    topology: Arc<NetworkTopology>,
}

impl PlacementService {
    pub fn new(topology: Arc<NetworkTopology>) -> Self {
        Self { topology }
    }

    /// Pick `size` distinct leaves not in `excluded`.
    ///
    /// Every round takes at most one leaf per rack, so racks are reused only
    /// once each rack already holds a member.
    ///
    /// # Errors
    /// `NotEnoughNodes` if fewer than `size` candidates remain.
    #[instrument(level = "debug", skip(self, excluded))]
    pub fn new_ensemble(&self, size: usize, excluded: &[Leaf]) -> ApplicationResult<Vec<Leaf>> {
        let available = self.topology.count_available(ROOT, excluded);
        if available < size {
            return Err(ApplicationError::NotEnoughNodes {
                requested: size,
                available,
            });
        }
        let excluded: HashSet<&Leaf> = excluded.iter().collect();
        let mut pool: Vec<Leaf> = self
            .topology
            .get_leaves(ROOT)
            .into_iter()
            .filter(|leaf| !excluded.contains(leaf))
            .collect();
        pool.shuffle(&mut rand::thread_rng());

        let mut ensemble = Vec::with_capacity(size);
        while ensemble.len() < size {
            // a concurrent remove can shrink the pool after the count
            if pool.is_empty() {
                return Err(ApplicationError::NotEnoughNodes {
                    requested: size,
                    available: ensemble.len(),
                });
            }
            let mut round_racks = HashSet::new();
            let mut rest = Vec::with_capacity(pool.len());
            for leaf in pool {
                if ensemble.len() < size && round_racks.insert(leaf.location().clone()) {
                    ensemble.push(leaf);
                } else {
                    rest.push(leaf);
                }
            }
            pool = rest;
        }
        debug!(
            "new_ensemble: {:?}",
            ensemble.iter().map(Leaf::path).collect::<Vec<_>>()
        );
        Ok(ensemble)
    }

    /// Pick a replacement for `failed`, preferring racks the rest of the
    /// ensemble does not use.
    ///
    /// # Errors
    /// - `UnknownNode` if `failed` is not part of `ensemble`
    /// - `NotEnoughNodes` if every leaf is already in the ensemble
    #[instrument(level = "debug", skip(self, ensemble))]
    pub fn replace_node(&self, ensemble: &[Leaf], failed: &Leaf) -> ApplicationResult<Leaf> {
        if !ensemble.contains(failed) {
            return Err(ApplicationError::UnknownNode(failed.path()));
        }
        let used_racks: HashSet<_> = ensemble
            .iter()
            .filter(|leaf| *leaf != failed)
            .map(Leaf::location)
            .collect();
        let candidates: Vec<Leaf> = self
            .topology
            .get_leaves(ROOT)
            .into_iter()
            .filter(|leaf| !ensemble.contains(leaf))
            .collect();

        let fresh: Vec<&Leaf> = candidates
            .iter()
            .filter(|leaf| !used_racks.contains(leaf.location()))
            .collect();
        let mut rng = rand::thread_rng();
        let chosen = match fresh.choose(&mut rng) {
            Some(leaf) => Some(*leaf),
            None => candidates.choose(&mut rng),
        };
        chosen.cloned().ok_or(ApplicationError::NotEnoughNodes {
            requested: 1,
            available: 0,
        })
    }
}
