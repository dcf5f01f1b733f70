use crate::ep_error::{SimError, SimResult};
use crate::ep_interface::{Latency, NodeId, SimTime, MAX_TOPOLOGY_ATTEMPTS};
use crate::ep_weights::{EdgeWeightGenerator, EdgeWeightKind, NodeWeightGenerator, NodeWeightKind};
use indexmap::IndexMap;
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};
use std::fmt;

// ============================================================================
// Topology
// ============================================================================

/// Synthetic topology families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    /// Uniformly sampled `degree`-regular graph (pairing model)
    #[default]
    RandomRegular,

    /// Circulant ring: each node linked to `degree / 2` nodes on each side
    Ring,
}

/// Per-node adjacency and weight
#[derive(Debug, Clone)]
struct NodeInfo {
    weight: f64,
    // sorted by id, `latencies[i]` belongs to `neighbors[i]`
    neighbors: Vec<NodeId>,
    latencies: Vec<Latency>,
}

// ============================================================================
// Network
// ============================================================================

/// Peer-to-peer network: a connected simple graph with edge latencies and
/// node weights. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: IndexMap<NodeId, NodeInfo>,
    num_edges: usize,

    /// Regularity parameter for generated topologies (None for edge lists)
    degree: Option<usize>,
    topology: Option<TopologyKind>,
    edge_weight_kind: EdgeWeightKind,
    node_weight_kind: NodeWeightKind,
}

impl Network {
    /// Generate a synthetic topology and assign weights
    ///
    /// Nodes are numbered `0..node_count`. Fails with a configuration error if
    /// the topology cannot be realised as a simple connected graph.
    pub fn generate(
        node_count: usize,
        degree: usize,
        topology: TopologyKind,
        edge_gen: &EdgeWeightGenerator,
        node_gen: &NodeWeightGenerator,
        seed: u64,
    ) -> SimResult<Self> {
        if node_count < 3 {
            return Err(SimError::config(
                "node_count",
                format!("must be at least 3, got {}", node_count),
            ));
        }
        if degree >= node_count {
            return Err(SimError::config(
                "degree",
                format!("must be smaller than node_count ({}), got {}", node_count, degree),
            ));
        }
        edge_gen.validate()?;
        node_gen.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);

        let edges = match topology {
            TopologyKind::RandomRegular => random_regular_edges(node_count, degree, &mut rng)?,
            TopologyKind::Ring => ring_edges(node_count, degree)?,
        };

        let latencies = edge_gen.generate(edges.len(), &mut rng)?;
        let weights = node_gen.generate(node_count, &mut rng)?;

        let node_ids: Vec<NodeId> = (0..node_count as NodeId).collect();
        let links: Vec<(NodeId, NodeId, Latency)> = edges
            .into_iter()
            .zip(latencies)
            .map(|((u, v), latency)| (u, v, latency))
            .collect();

        let mut network = Self::assemble(&node_ids, &links, &weights, edge_gen.kind, node_gen.kind);
        network.degree = Some(degree);
        network.topology = Some(topology);

        log::debug!("generated {}", network);
        Ok(network)
    }

    /// Build a network from an externally supplied edge list
    ///
    /// Edges may carry their own latency; missing latencies are drawn from
    /// `edge_gen`. Node weights are always drawn from `node_gen`.
    pub fn from_edges(
        edges: &[(NodeId, NodeId, Option<Latency>)],
        edge_gen: &EdgeWeightGenerator,
        node_gen: &NodeWeightGenerator,
        seed: u64,
    ) -> SimResult<Self> {
        edge_gen.validate()?;
        node_gen.validate()?;

        let mut seen = hashbrown::HashSet::new();
        let mut node_set = BTreeSet::new();
        for &(u, v, latency) in edges {
            if u == v {
                return Err(SimError::config("edges", format!("self loop on node {}", u)));
            }
            if !seen.insert(edge_key(u, v)) {
                return Err(SimError::config("edges", format!("duplicate edge {}-{}", u, v)));
            }
            if let Some(latency) = latency {
                if !latency.is_finite() || latency < 0.0 {
                    return Err(SimError::config(
                        "edges",
                        format!("latency of {}-{} must be finite and >= 0, got {}", u, v, latency),
                    ));
                }
            }
            node_set.insert(u);
            node_set.insert(v);
        }

        if node_set.len() < 3 {
            return Err(SimError::config(
                "node_count",
                format!("must be at least 3, got {}", node_set.len()),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let drawn = edge_gen.generate(edges.len(), &mut rng)?;
        let node_ids: Vec<NodeId> = node_set.into_iter().collect();
        let weights = node_gen.generate(node_ids.len(), &mut rng)?;

        let links: Vec<(NodeId, NodeId, Latency)> = edges
            .iter()
            .zip(drawn)
            .map(|(&(u, v, given), generated)| (u, v, given.unwrap_or(generated)))
            .collect();

        let network = Self::assemble(&node_ids, &links, &weights, edge_gen.kind, node_gen.kind);
        if !network.is_connected() {
            return Err(SimError::config("edges", "graph is not connected"));
        }

        log::debug!("loaded {}", network);
        Ok(network)
    }

    fn assemble(
        node_ids: &[NodeId],
        links: &[(NodeId, NodeId, Latency)],
        weights: &[f64],
        edge_weight_kind: EdgeWeightKind,
        node_weight_kind: NodeWeightKind,
    ) -> Self {
        let mut adjacency: BTreeMap<NodeId, Vec<(NodeId, Latency)>> =
            node_ids.iter().map(|id| (*id, Vec::new())).collect();

        for &(u, v, latency) in links {
            adjacency.entry(u).or_default().push((v, latency));
            adjacency.entry(v).or_default().push((u, latency));
        }

        let mut nodes = IndexMap::with_capacity(node_ids.len());
        for (idx, id) in node_ids.iter().enumerate() {
            let mut node_links = adjacency.remove(id).unwrap_or_default();
            node_links.sort_by_key(|(neighbor, _)| *neighbor);
            let (neighbors, latencies) = node_links.into_iter().unzip();
            nodes.insert(
                *id,
                NodeInfo {
                    weight: weights.get(idx).copied().unwrap_or(0.0),
                    neighbors,
                    latencies,
                },
            );
        }

        Self {
            nodes,
            num_edges: links.len(),
            degree: None,
            topology: None,
            edge_weight_kind,
            node_weight_kind,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Node ids in construction order (ascending)
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Regularity parameter of a generated topology
    pub fn regularity(&self) -> Option<usize> {
        self.degree
    }

    pub fn topology(&self) -> Option<TopologyKind> {
        self.topology
    }

    /// Neighbours of `node`, sorted by id (empty for unknown nodes)
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|info| info.neighbors.as_slice())
            .unwrap_or(&[])
    }

    /// Neighbours of `node` together with the latency of each connection
    pub fn links(&self, node: NodeId) -> impl Iterator<Item = (NodeId, Latency)> + '_ {
        self.nodes
            .get(&node)
            .into_iter()
            .flat_map(|info| info.neighbors.iter().copied().zip(info.latencies.iter().copied()))
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    pub fn node_weight(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(&node).map(|info| info.weight)
    }

    /// Latency of the edge between `u` and `v` (symmetric)
    pub fn edge_latency(&self, u: NodeId, v: NodeId) -> SimResult<Latency> {
        let info = self.nodes.get(&u).ok_or(SimError::UnknownNode(u))?;
        match info.neighbors.binary_search(&v) {
            Ok(idx) => Ok(info.latencies[idx]),
            Err(_) => Err(SimError::NotAdjacent(u, v)),
        }
    }

    /// All edges as `(u, v, latency)` with `u < v`
    #[cfg(test)]
    pub(crate) fn edges(&self) -> Vec<(NodeId, NodeId, Latency)> {
        let mut edges = Vec::with_capacity(self.num_edges);
        for (u, info) in &self.nodes {
            for (v, latency) in info.neighbors.iter().zip(&info.latencies) {
                if u < v {
                    edges.push((*u, *v, *latency));
                }
            }
        }
        edges
    }

    // ========================================================================
    // Sampling
    // ========================================================================

    /// Sample a message source with probability proportional to node weight
    pub fn sample_source(&self, rng: &mut StdRng) -> NodeId {
        self.sample_source_excluding(rng, |_| false)
    }

    /// Weighted source sampling restricted to nodes not matched by `excluded`
    ///
    /// Falls back to all nodes when every node is excluded, and to uniform
    /// sampling when the remaining weights are all zero.
    pub fn sample_source_excluding<F>(&self, rng: &mut StdRng, excluded: F) -> NodeId
    where
        F: Fn(NodeId) -> bool,
    {
        let mut candidates: Vec<(NodeId, f64)> = self
            .nodes
            .iter()
            .filter(|(id, _)| !excluded(**id))
            .map(|(id, info)| (*id, info.weight))
            .collect();

        if candidates.is_empty() {
            log::warn!("every node excluded from source sampling, using all nodes");
            candidates = self.nodes.iter().map(|(id, info)| (*id, info.weight)).collect();
        }

        match WeightedIndex::new(candidates.iter().map(|(_, w)| *w)) {
            Ok(index) => candidates[rng.sample(&index)].0,
            Err(_) => candidates[rng.gen_range(0..candidates.len())].0,
        }
    }

    /// Top `k` nodes by degree centrality, ties broken by smaller id
    pub fn central_nodes(&self, k: usize) -> Vec<NodeId> {
        let mut ranked: Vec<(NodeId, usize)> = self
            .nodes
            .iter()
            .map(|(id, info)| (*id, info.neighbors.len()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(k).map(|(id, _)| id).collect()
    }

    // ========================================================================
    // Paths
    // ========================================================================

    /// Latency-shortest paths from `from` to every reachable node
    ///
    /// Returns `(latency, hops)` per node in settle order; among equal
    /// latencies the path with fewer hops wins.
    pub fn shortest_paths(&self, from: NodeId) -> SimResult<IndexMap<NodeId, (Latency, u32)>> {
        if !self.contains(from) {
            return Err(SimError::UnknownNode(from));
        }

        let mut settled = IndexMap::with_capacity(self.num_nodes());
        let mut queue = BinaryHeap::new();
        queue.push(Delivery::originate(from, 0.0));

        while let Some(next) = queue.pop() {
            if settled.contains_key(&next.node) {
                continue;
            }
            settled.insert(next.node, (next.time, next.hops));

            for (neighbor, latency) in self.links(next.node) {
                if !settled.contains_key(&neighbor) {
                    queue.push(next.relay_to(neighbor, latency));
                }
            }
        }

        Ok(settled)
    }

    pub fn is_connected(&self) -> bool {
        let Some(start) = self.nodes.keys().next().copied() else {
            return false;
        };

        let mut visited = hashbrown::HashSet::with_capacity(self.num_nodes());
        let mut queue = VecDeque::from([start]);
        visited.insert(start);

        while let Some(node) = queue.pop_front() {
            for neighbor in self.neighbors(node) {
                if visited.insert(*neighbor) {
                    queue.push_back(*neighbor);
                }
            }
        }

        visited.len() == self.num_nodes()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Network(nodes={}, edges={}, topology={:?}, degree={:?}, edge_weight={:?}, node_weight={:?})",
            self.num_nodes(),
            self.num_edges,
            self.topology,
            self.degree,
            self.edge_weight_kind,
            self.node_weight_kind
        )
    }
}

// ============================================================================
// Delivery Queue Entry
// ============================================================================

/// A message copy in flight, ordered for a min-heap on
/// `(time, hops, node, sender)` so ties resolve deterministically
#[derive(Debug, Clone, Copy)]
pub(crate) struct Delivery {
    pub time: SimTime,
    pub hops: u32,
    pub node: NodeId,
    pub sender: Option<NodeId>,
}

impl Delivery {
    pub fn originate(node: NodeId, time: SimTime) -> Self {
        Self {
            time,
            hops: 0,
            node,
            sender: None,
        }
    }

    /// The copy `self.node` sends on to `target`
    pub fn relay_to(&self, target: NodeId, latency: Latency) -> Self {
        Self {
            time: self.time + latency,
            hops: self.hops + 1,
            node: target,
            sender: Some(self.node),
        }
    }
}

impl Ord for Delivery {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap pops the earliest delivery first
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.hops.cmp(&self.hops))
            .then_with(|| other.node.cmp(&self.node))
            .then_with(|| other.sender.cmp(&self.sender))
    }
}

impl PartialOrd for Delivery {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Delivery {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Delivery {}

// ============================================================================
// Topology Generators
// ============================================================================

fn edge_key(u: NodeId, v: NodeId) -> (NodeId, NodeId) {
    if u < v {
        (u, v)
    } else {
        (v, u)
    }
}

/// Sample a connected `degree`-regular simple graph on `node_count` nodes
fn random_regular_edges(
    node_count: usize,
    degree: usize,
    rng: &mut StdRng,
) -> SimResult<Vec<(NodeId, NodeId)>> {
    if degree < 2 {
        return Err(SimError::config(
            "degree",
            format!("a connected regular graph on {} nodes needs degree >= 2, got {}", node_count, degree),
        ));
    }
    if (node_count * degree) % 2 != 0 {
        return Err(SimError::config(
            "degree",
            format!("node_count * degree must be even, got {} * {}", node_count, degree),
        ));
    }

    for attempt in 0..MAX_TOPOLOGY_ATTEMPTS {
        let Some(edges) = try_pairing(node_count, degree, rng) else {
            continue;
        };
        if edges_connected(node_count, &edges) {
            if attempt > 0 {
                log::debug!("random regular graph found after {} attempts", attempt + 1);
            }
            return Ok(edges.into_iter().collect());
        }
    }

    Err(SimError::config(
        "topology_kind",
        format!(
            "no connected {}-regular graph on {} nodes after {} attempts",
            degree, node_count, MAX_TOPOLOGY_ATTEMPTS
        ),
    ))
}

/// One round of the stub-pairing model; None if pairing got stuck
fn try_pairing(
    node_count: usize,
    degree: usize,
    rng: &mut StdRng,
) -> Option<BTreeSet<(NodeId, NodeId)>> {
    let mut edges = BTreeSet::new();
    let mut stubs: Vec<NodeId> = (0..node_count as NodeId)
        .flat_map(|node| std::iter::repeat(node).take(degree))
        .collect();

    while !stubs.is_empty() {
        let mut leftover: BTreeMap<NodeId, usize> = BTreeMap::new();
        stubs.shuffle(rng);

        for pair in stubs.chunks_exact(2) {
            let (a, b) = edge_key(pair[0], pair[1]);
            if a == b || !edges.insert((a, b)) {
                *leftover.entry(a).or_default() += 1;
                *leftover.entry(b).or_default() += 1;
            }
        }

        if !pairing_can_continue(&edges, &leftover) {
            return None;
        }

        stubs = leftover
            .iter()
            .flat_map(|(node, count)| std::iter::repeat(*node).take(*count))
            .collect();
    }

    Some(edges)
}

/// True if some pair of leftover stubs could still form a new edge
fn pairing_can_continue(edges: &BTreeSet<(NodeId, NodeId)>, leftover: &BTreeMap<NodeId, usize>) -> bool {
    if leftover.is_empty() {
        return true;
    }
    let nodes: Vec<NodeId> = leftover.keys().copied().collect();
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[..i] {
            if !edges.contains(&edge_key(*a, *b)) {
                return true;
            }
        }
    }
    false
}

fn edges_connected(node_count: usize, edges: &BTreeSet<(NodeId, NodeId)>) -> bool {
    let mut adjacency = vec![Vec::new(); node_count];
    for &(u, v) in edges {
        adjacency[u as usize].push(v as usize);
        adjacency[v as usize].push(u as usize);
    }

    let mut visited = vec![false; node_count];
    let mut stack = vec![0usize];
    visited[0] = true;
    let mut count = 1;
    while let Some(node) = stack.pop() {
        for &next in &adjacency[node] {
            if !visited[next] {
                visited[next] = true;
                count += 1;
                stack.push(next);
            }
        }
    }
    count == node_count
}

/// Circulant ring with `degree / 2` neighbours on each side
fn ring_edges(node_count: usize, degree: usize) -> SimResult<Vec<(NodeId, NodeId)>> {
    if degree < 2 || degree % 2 != 0 {
        return Err(SimError::config(
            "degree",
            format!("ring topology needs an even degree >= 2, got {}", degree),
        ));
    }

    let n = node_count as NodeId;
    let mut edges = BTreeSet::new();
    for node in 0..n {
        for offset in 1..=(degree / 2) as NodeId {
            edges.insert(edge_key(node, (node + offset) % n));
        }
    }
    Ok(edges.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(node_count: usize, degree: usize, seed: u64) -> Network {
        Network::generate(
            node_count,
            degree,
            TopologyKind::RandomRegular,
            &EdgeWeightGenerator::new(EdgeWeightKind::default()),
            &NodeWeightGenerator::new(NodeWeightKind::Uniform),
            seed,
        )
        .unwrap()
    }

    fn unweighted() -> EdgeWeightGenerator {
        EdgeWeightGenerator::new(EdgeWeightKind::unweighted())
    }

    fn uniform_nodes() -> NodeWeightGenerator {
        NodeWeightGenerator::new(NodeWeightKind::Uniform)
    }

    #[test]
    fn test_random_regular_graph() {
        let network = regular(20, 4, 42);

        assert_eq!(network.num_nodes(), 20);
        assert_eq!(network.num_edges(), 40);
        assert!(network.is_connected());
        for node in network.nodes() {
            assert_eq!(network.degree(node), 4);
            assert!(!network.neighbors(node).contains(&node));
        }
    }

    #[test]
    fn test_generation_deterministic_for_seed() {
        let a = regular(50, 3, 9);
        let b = regular(50, 3, 9);
        assert_eq!(a.edges(), b.edges());
    }

    #[test]
    fn test_invalid_parameters() {
        let edge_gen = unweighted();
        let node_gen = uniform_nodes();

        let too_small = Network::generate(2, 1, TopologyKind::RandomRegular, &edge_gen, &node_gen, 0);
        assert!(matches!(too_small, Err(SimError::Configuration { field: "node_count", .. })));

        let too_dense = Network::generate(10, 10, TopologyKind::RandomRegular, &edge_gen, &node_gen, 0);
        assert!(matches!(too_dense, Err(SimError::Configuration { field: "degree", .. })));

        let odd = Network::generate(11, 3, TopologyKind::RandomRegular, &edge_gen, &node_gen, 0);
        assert!(matches!(odd, Err(SimError::Configuration { field: "degree", .. })));

        // a perfect matching can never be connected
        let matching = Network::generate(10, 1, TopologyKind::RandomRegular, &edge_gen, &node_gen, 0);
        assert!(matching.is_err());

        let odd_ring = Network::generate(10, 3, TopologyKind::Ring, &edge_gen, &node_gen, 0);
        assert!(odd_ring.is_err());
    }

    #[test]
    fn test_ring_topology() {
        let network =
            Network::generate(10, 4, TopologyKind::Ring, &unweighted(), &uniform_nodes(), 0).unwrap();

        assert_eq!(network.num_edges(), 20);
        assert_eq!(network.neighbors(0), &[1, 2, 8, 9]);
        assert!(network.is_connected());
    }

    #[test]
    fn test_edge_latency_symmetric() {
        let network = regular(20, 4, 1);

        for (u, v, latency) in network.edges() {
            assert_eq!(network.edge_latency(u, v).unwrap(), latency);
            assert_eq!(network.edge_latency(v, u).unwrap(), latency);
            assert!(latency >= 0.0);
        }

        let node = 0;
        let stranger = network
            .nodes()
            .find(|other| *other != node && !network.neighbors(node).contains(other))
            .unwrap();
        assert!(matches!(
            network.edge_latency(node, stranger),
            Err(SimError::NotAdjacent(0, _))
        ));
        assert!(matches!(network.edge_latency(999, 0), Err(SimError::UnknownNode(999))));
    }

    #[test]
    fn test_from_edges_with_custom_latency() {
        let edges = [(0, 1, Some(0.1)), (1, 2, Some(0.2)), (2, 0, Some(0.3))];
        let network = Network::from_edges(&edges, &unweighted(), &uniform_nodes(), 0).unwrap();

        assert_eq!(network.num_nodes(), 3);
        assert_eq!(network.edge_latency(0, 2).unwrap(), 0.3);
        assert_eq!(network.edge_latency(2, 1).unwrap(), 0.2);
        assert_eq!(network.regularity(), None);

        // missing latency falls back to the generator
        let edges = [(10, 20, None), (20, 30, Some(5.0)), (30, 10, None)];
        let network = Network::from_edges(&edges, &unweighted(), &uniform_nodes(), 0).unwrap();
        assert_eq!(network.edge_latency(10, 20).unwrap(), 1.0);
        assert_eq!(network.edge_latency(30, 20).unwrap(), 5.0);
    }

    #[test]
    fn test_from_edges_rejects_bad_graphs() {
        let edge_gen = unweighted();
        let node_gen = uniform_nodes();

        let self_loop = [(0, 0, None), (0, 1, None), (1, 2, None)];
        assert!(Network::from_edges(&self_loop, &edge_gen, &node_gen, 0).is_err());

        let duplicate = [(0, 1, None), (1, 0, None), (1, 2, None)];
        assert!(Network::from_edges(&duplicate, &edge_gen, &node_gen, 0).is_err());

        let disconnected = [(0, 1, None), (2, 3, None)];
        assert!(Network::from_edges(&disconnected, &edge_gen, &node_gen, 0).is_err());

        let too_small = [(0, 1, None)];
        assert!(Network::from_edges(&too_small, &edge_gen, &node_gen, 0).is_err());
    }

    #[test]
    fn test_sample_source_follows_weights() {
        let network = Network::generate(
            30,
            4,
            TopologyKind::RandomRegular,
            &unweighted(),
            &NodeWeightGenerator::new(NodeWeightKind::stake()),
            5,
        )
        .unwrap();

        let heaviest = network
            .nodes()
            .max_by(|a, b| {
                network
                    .node_weight(*a)
                    .unwrap()
                    .total_cmp(&network.node_weight(*b).unwrap())
            })
            .unwrap();

        let mut rng = StdRng::from_seed([0u8; 32]);
        let mut counts: BTreeMap<NodeId, usize> = BTreeMap::new();
        for _ in 0..20_000 {
            *counts.entry(network.sample_source(&mut rng)).or_default() += 1;
        }

        let expected = network.node_weight(heaviest).unwrap();
        let observed = counts[&heaviest] as f64 / 20_000.0;
        assert!((observed - expected).abs() < 0.02, "{} vs {}", observed, expected);
    }

    #[test]
    fn test_sample_source_excluding() {
        let network = regular(20, 4, 3);
        let mut rng = StdRng::from_seed([4u8; 32]);

        for _ in 0..500 {
            let source = network.sample_source_excluding(&mut rng, |node| node < 15);
            assert!(source >= 15);
        }

        // everything excluded: falls back to all nodes
        let source = network.sample_source_excluding(&mut rng, |_| true);
        assert!(network.contains(source));
    }

    #[test]
    fn test_central_nodes_ties_by_id() {
        let edges = [
            (0, 1, None),
            (0, 2, None),
            (0, 3, None),
            (1, 2, None),
            (3, 4, None),
        ];
        let network = Network::from_edges(&edges, &unweighted(), &uniform_nodes(), 0).unwrap();

        // degrees: 0->3, 1->2, 2->2, 3->2, 4->1
        assert_eq!(network.central_nodes(3), vec![0, 1, 2]);
        assert_eq!(network.central_nodes(10).len(), 5);
    }

    #[test]
    fn test_shortest_paths() {
        // 0 -(1)- 1 -(1)- 2 and a slow direct edge 0 -(5)- 2
        let edges = [(0, 1, Some(1.0)), (1, 2, Some(1.0)), (0, 2, Some(5.0)), (2, 3, Some(0.0))];
        let network = Network::from_edges(&edges, &unweighted(), &uniform_nodes(), 0).unwrap();

        let paths = network.shortest_paths(0).unwrap();
        assert_eq!(paths[&0], (0.0, 0));
        assert_eq!(paths[&1], (1.0, 1));
        assert_eq!(paths[&2], (2.0, 2));
        assert_eq!(paths[&3], (2.0, 3));
        assert!(network.shortest_paths(42).is_err());
    }

    #[test]
    fn test_delivery_heap_order() {
        let mut heap = BinaryHeap::new();
        heap.push(Delivery { time: 2.0, hops: 1, node: 5, sender: Some(0) });
        heap.push(Delivery { time: 1.0, hops: 3, node: 7, sender: Some(1) });
        heap.push(Delivery { time: 1.0, hops: 2, node: 9, sender: Some(2) });

        assert_eq!(heap.pop().unwrap().node, 9);
        assert_eq!(heap.pop().unwrap().node, 7);
        assert_eq!(heap.pop().unwrap().node, 5);
    }
}
