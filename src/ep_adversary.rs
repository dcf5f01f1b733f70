use crate::ep_error::{SimError, SimResult};
use crate::ep_interface::NodeId;
use crate::ep_network::Network;
use crate::ep_protocol::{Arrival, PropagationTrace};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Adversary
// ============================================================================

/// How compromised nodes are picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdversarySelection {
    /// Uniformly at random, without replacement
    #[default]
    Random,

    /// Highest degree centrality first, ties broken by smaller node id
    Degree,
}

/// Entity that controls a fraction of the network's nodes and tries to
/// deanonymize message sources from what those nodes see
///
/// A passive adversary only records arrivals. An active adversary also
/// refuses to relay: once a message reaches one of its nodes, the
/// propagation stops there.
#[derive(Debug, Clone)]
pub struct Adversary {
    network: Arc<Network>,
    ratio: f64,
    selection: AdversarySelection,
    active: bool,
    nodes: BTreeSet<NodeId>,
}

impl Adversary {
    /// Compromise `⌊ratio · n⌋` nodes of the network
    pub fn new(
        network: Arc<Network>,
        ratio: f64,
        selection: AdversarySelection,
        active: bool,
        rng: &mut StdRng,
    ) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(SimError::config(
                "adversary_ratio",
                format!("must be in [0, 1], got {}", ratio),
            ));
        }

        let count = (network.num_nodes() as f64 * ratio) as usize;
        let nodes: BTreeSet<NodeId> = match selection {
            AdversarySelection::Random => {
                let candidates: Vec<NodeId> = network.nodes().collect();
                candidates.choose_multiple(rng, count).copied().collect()
            }
            AdversarySelection::Degree => network.central_nodes(count).into_iter().collect(),
        };

        log::debug!(
            "adversary controls {} of {} nodes ({:?}, active: {})",
            nodes.len(),
            network.num_nodes(),
            selection,
            active
        );

        Ok(Self {
            network,
            ratio,
            selection,
            active,
            nodes,
        })
    }

    /// An adversary that controls the given nodes
    pub fn with_nodes(network: Arc<Network>, nodes: &[NodeId], active: bool) -> SimResult<Self> {
        if let Some(unknown) = nodes.iter().find(|n| !network.contains(**n)) {
            return Err(SimError::UnknownNode(*unknown));
        }

        let nodes: BTreeSet<NodeId> = nodes.iter().copied().collect();
        let ratio = nodes.len() as f64 / network.num_nodes() as f64;

        Ok(Self {
            network,
            ratio,
            selection: AdversarySelection::Random,
            active,
            nodes,
        })
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn selection(&self) -> AdversarySelection {
        self.selection
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Compromised nodes in ascending order
    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    pub fn is_compromised(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// True if `node` swallows messages instead of relaying them
    pub fn blocks_relay(&self, node: NodeId) -> bool {
        self.active && self.is_compromised(node)
    }

    /// Restrict a propagation trace to what the compromised nodes saw
    pub fn observe(&self, trace: &PropagationTrace) -> AdversaryObservation {
        let contacts = trace
            .iter()
            .filter(|(node, _)| self.is_compromised(*node))
            .map(|(node, arrival)| (node, *arrival))
            .collect();

        AdversaryObservation { contacts }
    }
}

impl fmt::Display for Adversary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Adversary(ratio={:.2}, selection={:?}, active={})",
            self.ratio, self.selection, self.active
        )
    }
}

// ============================================================================
// Observation
// ============================================================================

/// Arrivals recorded at compromised nodes, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdversaryObservation {
    contacts: IndexMap<NodeId, Arrival>,
}

impl AdversaryObservation {
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, node: NodeId) -> Option<&Arrival> {
        self.contacts.get(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Arrival)> + '_ {
        self.contacts.iter().map(|(node, arrival)| (*node, arrival))
    }

    /// The compromised node that heard the message first
    ///
    /// Earliest time wins, then fewer hops, then smaller node id.
    pub fn first_contact(&self) -> Option<(NodeId, Arrival)> {
        self.contacts
            .iter()
            .min_by(|(a_node, a), (b_node, b)| {
                a.time
                    .total_cmp(&b.time)
                    .then(a.hops.cmp(&b.hops))
                    .then(a_node.cmp(b_node))
            })
            .map(|(node, arrival)| (*node, *arrival))
    }
}
