//! Message propagation protocols
//!
//! Every protocol floods a single message through the network in simulated
//! time and returns a [`PropagationTrace`]. The flood is event driven: message
//! copies in flight sit in a min-heap ordered by `(time, hops, node, sender)`
//! and are delivered earliest first, so each node's recorded arrival is its
//! latency-shortest delivery and ties always resolve the same way.
//!
//! - **Broadcast**: the originator and every node that hears the message
//!   relay it once, to all neighbours or to `⌈√degree⌉` of them.
//! - **Dandelion**: a stem phase forwards the message along the anonymity
//!   graph, then the last stem node starts a regular broadcast (fluff).
//! - **Dandelion++**: the same two phases over a quasi-4-regular anonymity
//!   graph with two lines per node.

use crate::ep_adversary::Adversary;
use crate::ep_anonymity_graph::{AnonymityGraph, AnonymityGraphKind};
use crate::ep_error::{SimError, SimResult};
use crate::ep_interface::{NodeId, SimTime, DEFAULT_MAX_STEM_HOPS};
use crate::ep_network::{Delivery, Network};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;
use std::sync::Arc;

// ============================================================================
// Trace
// ============================================================================

/// First receipt of a message at one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    pub time: SimTime,

    /// Relays between the originator and this node along the arrival path
    pub hops: u32,

    /// Neighbour that delivered the message first (None for the originator)
    pub sender: Option<NodeId>,
}

impl Arrival {
    pub fn origin(time: SimTime) -> Self {
        Self {
            time,
            hops: 0,
            sender: None,
        }
    }
}

fn arrival_of(delivery: &Delivery) -> Arrival {
    Arrival {
        time: delivery.time,
        hops: delivery.hops,
        sender: delivery.sender,
    }
}

/// Nodes reached by one message, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationTrace {
    source: NodeId,
    arrivals: IndexMap<NodeId, Arrival>,
}

impl PropagationTrace {
    pub fn new(source: NodeId) -> Self {
        Self {
            source,
            arrivals: IndexMap::new(),
        }
    }

    /// The true originator of the message
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Record a first receipt; later receipts at the same node are ignored
    pub fn record(&mut self, node: NodeId, arrival: Arrival) -> bool {
        if self.arrivals.contains_key(&node) {
            return false;
        }
        self.arrivals.insert(node, arrival);
        true
    }

    pub fn get(&self, node: NodeId) -> Option<&Arrival> {
        self.arrivals.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.arrivals.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Arrival)> + '_ {
        self.arrivals.iter().map(|(node, arrival)| (*node, arrival))
    }

    /// Fraction of the network's `node_count` nodes that got the message
    pub fn reached_ratio(&self, node_count: usize) -> f64 {
        if node_count == 0 {
            return 0.0;
        }
        self.arrivals.len() as f64 / node_count as f64
    }

    pub fn arrival_times(&self) -> Vec<SimTime> {
        self.arrivals.values().map(|a| a.time).collect()
    }
}

// ============================================================================
// Protocol trait
// ============================================================================

/// Fan-out used by the broadcast (fluff) phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastMode {
    /// Relay to every neighbour
    #[default]
    All,

    /// Relay to `⌈√degree⌉` random neighbours, never back to the sender
    Sqrt,
}

/// Protocol families that can be built from an experiment config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    #[default]
    Broadcast,
    Dandelion,
    DandelionPlusPlus,
}

pub trait Protocol: Send + Sync {
    fn name(&self) -> &'static str;

    fn network(&self) -> &Arc<Network>;

    fn broadcast_mode(&self) -> BroadcastMode;

    /// Propagate one message from `source` until at least
    /// `coverage_threshold` of the nodes have received it, or until no copy
    /// is left in flight
    fn propagate_until(
        &self,
        source: NodeId,
        adversary: &Adversary,
        coverage_threshold: f64,
        rng: &mut StdRng,
    ) -> SimResult<PropagationTrace>;

    /// Propagate one message as far as it goes
    fn propagate(
        &self,
        source: NodeId,
        adversary: &Adversary,
        rng: &mut StdRng,
    ) -> SimResult<PropagationTrace> {
        self.propagate_until(source, adversary, 1.0, rng)
    }
}

fn check_source(network: &Network, source: NodeId) -> SimResult<()> {
    if network.contains(source) {
        Ok(())
    } else {
        Err(SimError::UnknownNode(source))
    }
}

fn coverage_reached(trace: &PropagationTrace, node_count: usize, coverage_threshold: f64) -> bool {
    trace.reached_ratio(node_count) >= coverage_threshold
}

/// Broadcast phase shared by every protocol
///
/// Nodes already in `trace` (the originator and any stem nodes) keep their
/// recorded arrival but still relay when the wave reaches them.
fn fluff(
    network: &Network,
    mode: BroadcastMode,
    adversary: &Adversary,
    start: Delivery,
    coverage_threshold: f64,
    trace: &mut PropagationTrace,
    rng: &mut StdRng,
) {
    let node_count = network.num_nodes();
    let mut relayed = hashbrown::HashSet::with_capacity(node_count);
    let mut in_flight = BinaryHeap::new();
    in_flight.push(start);

    while let Some(delivery) = in_flight.pop() {
        if coverage_reached(trace, node_count, coverage_threshold) {
            break;
        }
        if !relayed.insert(delivery.node) {
            continue;
        }

        trace.record(delivery.node, arrival_of(&delivery));

        // active adversaries swallow everything except their own messages
        if delivery.node != trace.source() && adversary.blocks_relay(delivery.node) {
            continue;
        }

        let targets: Vec<NodeId> = match mode {
            BroadcastMode::All => network.neighbors(delivery.node).to_vec(),
            BroadcastMode::Sqrt => {
                let fanout = (network.degree(delivery.node) as f64).sqrt().ceil() as usize;
                let candidates: Vec<NodeId> = network
                    .neighbors(delivery.node)
                    .iter()
                    .copied()
                    .filter(|n| Some(*n) != delivery.sender)
                    .collect();
                candidates.choose_multiple(rng, fanout).copied().collect()
            }
        };

        for (target, latency) in network.links(delivery.node) {
            if targets.contains(&target) && !relayed.contains(&target) {
                in_flight.push(delivery.relay_to(target, latency));
            }
        }
    }
}

// ============================================================================
// Broadcast
// ============================================================================

/// Plain flooding from the originator
#[derive(Debug, Clone)]
pub struct BroadcastProtocol {
    network: Arc<Network>,
    mode: BroadcastMode,
}

impl BroadcastProtocol {
    pub fn new(network: Arc<Network>, mode: BroadcastMode) -> Self {
        Self { network, mode }
    }
}

impl Protocol for BroadcastProtocol {
    fn name(&self) -> &'static str {
        "Broadcast"
    }

    fn network(&self) -> &Arc<Network> {
        &self.network
    }

    fn broadcast_mode(&self) -> BroadcastMode {
        self.mode
    }

    fn propagate_until(
        &self,
        source: NodeId,
        adversary: &Adversary,
        coverage_threshold: f64,
        rng: &mut StdRng,
    ) -> SimResult<PropagationTrace> {
        check_source(&self.network, source)?;

        let mut trace = PropagationTrace::new(source);
        fluff(
            &self.network,
            self.mode,
            adversary,
            Delivery::originate(source, 0.0),
            coverage_threshold,
            &mut trace,
            rng,
        );
        Ok(trace)
    }
}

// ============================================================================
// Dandelion
// ============================================================================

/// Stem-then-fluff propagation over a single-line anonymity graph
#[derive(Debug, Clone)]
pub struct DandelionProtocol {
    network: Arc<Network>,
    mode: BroadcastMode,
    stem_probability: f64,
    max_stem_hops: u32,
    graph: AnonymityGraph,
}

impl DandelionProtocol {
    pub fn new(
        network: Arc<Network>,
        stem_probability: f64,
        mode: BroadcastMode,
        rng: &mut StdRng,
    ) -> SimResult<Self> {
        Self::with_graph_kind(AnonymityGraphKind::Dandelion, network, stem_probability, mode, rng)
    }

    fn with_graph_kind(
        kind: AnonymityGraphKind,
        network: Arc<Network>,
        stem_probability: f64,
        mode: BroadcastMode,
        rng: &mut StdRng,
    ) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&stem_probability) {
            return Err(SimError::config(
                "stem_probability",
                format!("must be in [0, 1], got {}", stem_probability),
            ));
        }

        let graph = AnonymityGraph::build(kind, &network, rng);
        Ok(Self {
            network,
            mode,
            stem_probability,
            max_stem_hops: DEFAULT_MAX_STEM_HOPS,
            graph,
        })
    }

    /// Cap on stem length before the message is forced to fluff
    pub fn with_max_stem_hops(mut self, max_stem_hops: u32) -> Self {
        self.max_stem_hops = max_stem_hops;
        self
    }

    pub fn stem_probability(&self) -> f64 {
        self.stem_probability
    }

    pub fn max_stem_hops(&self) -> u32 {
        self.max_stem_hops
    }

    pub fn anonymity_graph(&self) -> &AnonymityGraph {
        &self.graph
    }

    /// Draw a fresh anonymity graph of the same kind
    pub fn reset_anonymity_graph(&mut self, rng: &mut StdRng) {
        self.graph = AnonymityGraph::build(self.graph.kind(), &self.network, rng);
    }

    /// Forward along the anonymity graph; returns the delivery that starts
    /// the fluff phase, or None if an active adversary swallowed the stem or
    /// the stem alone already met the coverage threshold
    fn stem(
        &self,
        source: NodeId,
        adversary: &Adversary,
        coverage_threshold: f64,
        trace: &mut PropagationTrace,
        rng: &mut StdRng,
    ) -> SimResult<Option<Delivery>> {
        let node_count = self.network.num_nodes();
        let mut current = Delivery::originate(source, 0.0);
        trace.record(source, arrival_of(&current));

        let mut stem_path = hashbrown::HashSet::new();
        stem_path.insert(source);

        while current.hops < self.max_stem_hops {
            if coverage_reached(trace, node_count, coverage_threshold) {
                return Ok(None);
            }
            if self.stem_probability <= 0.0 || !rng.gen_bool(self.stem_probability) {
                break;
            }
            let Some(next) = self.graph.successor(current.node, rng) else {
                break;
            };
            // loop in the anonymity graph: fluff from here
            if !stem_path.insert(next) {
                break;
            }

            let latency = self.network.edge_latency(current.node, next)?;
            current = current.relay_to(next, latency);
            trace.record(next, arrival_of(&current));

            if adversary.blocks_relay(next) {
                log::trace!("stem of message from {} swallowed at {}", source, next);
                return Ok(None);
            }
        }

        Ok(Some(current))
    }

    fn run(
        &self,
        source: NodeId,
        adversary: &Adversary,
        coverage_threshold: f64,
        rng: &mut StdRng,
    ) -> SimResult<PropagationTrace> {
        check_source(&self.network, source)?;

        let mut trace = PropagationTrace::new(source);
        if let Some(start) = self.stem(source, adversary, coverage_threshold, &mut trace, rng)? {
            fluff(
                &self.network,
                self.mode,
                adversary,
                start,
                coverage_threshold,
                &mut trace,
                rng,
            );
        }
        Ok(trace)
    }
}

impl Protocol for DandelionProtocol {
    fn name(&self) -> &'static str {
        "Dandelion"
    }

    fn network(&self) -> &Arc<Network> {
        &self.network
    }

    fn broadcast_mode(&self) -> BroadcastMode {
        self.mode
    }

    fn propagate_until(
        &self,
        source: NodeId,
        adversary: &Adversary,
        coverage_threshold: f64,
        rng: &mut StdRng,
    ) -> SimResult<PropagationTrace> {
        self.run(source, adversary, coverage_threshold, rng)
    }
}

// ============================================================================
// Dandelion++
// ============================================================================

/// Dandelion over a quasi-4-regular anonymity graph
#[derive(Debug, Clone)]
pub struct DandelionPlusPlusProtocol {
    inner: DandelionProtocol,
}

impl DandelionPlusPlusProtocol {
    pub fn new(
        network: Arc<Network>,
        stem_probability: f64,
        mode: BroadcastMode,
        rng: &mut StdRng,
    ) -> SimResult<Self> {
        let inner = DandelionProtocol::with_graph_kind(
            AnonymityGraphKind::DandelionPlusPlus,
            network,
            stem_probability,
            mode,
            rng,
        )?;
        Ok(Self { inner })
    }

    pub fn with_max_stem_hops(self, max_stem_hops: u32) -> Self {
        Self {
            inner: self.inner.with_max_stem_hops(max_stem_hops),
        }
    }

    pub fn stem_probability(&self) -> f64 {
        self.inner.stem_probability()
    }

    pub fn anonymity_graph(&self) -> &AnonymityGraph {
        self.inner.anonymity_graph()
    }

    pub fn reset_anonymity_graph(&mut self, rng: &mut StdRng) {
        self.inner.reset_anonymity_graph(rng);
    }
}

impl Protocol for DandelionPlusPlusProtocol {
    fn name(&self) -> &'static str {
        "Dandelion++"
    }

    fn network(&self) -> &Arc<Network> {
        self.inner.network()
    }

    fn broadcast_mode(&self) -> BroadcastMode {
        self.inner.broadcast_mode()
    }

    fn propagate_until(
        &self,
        source: NodeId,
        adversary: &Adversary,
        coverage_threshold: f64,
        rng: &mut StdRng,
    ) -> SimResult<PropagationTrace> {
        self.inner.run(source, adversary, coverage_threshold, rng)
    }
}
