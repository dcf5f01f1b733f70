//! Anonymity graphs for the Dandelion protocol family
//!
//! An anonymity graph assigns every node its outbound stem line(s). Lines
//! always follow edges of the underlying network, so a stem hop costs the
//! latency of that edge. The graph may contain cycles (including 2-cycles
//! between adjacent nodes); stem traversal has to guard against them.
//!
//! - **Dandelion**: one line per node, chosen uniformly among its neighbours.
//! - **Dandelion++**: two lines per node. Nodes pick their lines in random
//!   order and prefer the neighbours with the fewest inbound lines so far,
//!   giving an approximately 4-regular (2 in, 2 out) graph. One of the two
//!   lines is made active per message.

use crate::ep_interface::{NodeId, DANDELION_PP_LINES};
use crate::ep_network::Network;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Which anonymity graph construction to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymityGraphKind {
    /// One outbound line per node
    Dandelion,

    /// Two outbound lines per node from a quasi-4-regular construction
    DandelionPlusPlus,
}

impl AnonymityGraphKind {
    pub fn lines_per_node(&self) -> usize {
        match self {
            AnonymityGraphKind::Dandelion => 1,
            AnonymityGraphKind::DandelionPlusPlus => DANDELION_PP_LINES,
        }
    }
}

/// Directed stem-routing structure over the network's node set
#[derive(Debug, Clone)]
pub struct AnonymityGraph {
    kind: AnonymityGraphKind,
    lines: IndexMap<NodeId, Vec<NodeId>>,
}

impl AnonymityGraph {
    pub fn build(kind: AnonymityGraphKind, network: &Network, rng: &mut StdRng) -> Self {
        let lines = match kind {
            AnonymityGraphKind::Dandelion => Self::single_lines(network, rng),
            AnonymityGraphKind::DandelionPlusPlus => {
                Self::quasi_regular_lines(network, DANDELION_PP_LINES, rng)
            }
        };

        log::debug!(
            "built {:?} anonymity graph over {} nodes",
            kind,
            lines.len()
        );

        Self { kind, lines }
    }

    fn single_lines(network: &Network, rng: &mut StdRng) -> IndexMap<NodeId, Vec<NodeId>> {
        let mut lines = IndexMap::with_capacity(network.num_nodes());
        for node in network.nodes() {
            // never route a stem back to the node itself
            let candidates: Vec<NodeId> = network
                .neighbors(node)
                .iter()
                .copied()
                .filter(|n| *n != node)
                .collect();
            let successor = candidates.choose(rng).copied();
            lines.insert(node, successor.into_iter().collect());
        }
        lines
    }

    fn quasi_regular_lines(
        network: &Network,
        per_node: usize,
        rng: &mut StdRng,
    ) -> IndexMap<NodeId, Vec<NodeId>> {
        let mut order: Vec<NodeId> = network.nodes().collect();
        order.shuffle(rng);

        let mut in_degree: hashbrown::HashMap<NodeId, usize> = hashbrown::HashMap::new();
        let mut chosen: hashbrown::HashMap<NodeId, Vec<NodeId>> = hashbrown::HashMap::new();

        for node in order {
            let mut candidates: Vec<NodeId> = network
                .neighbors(node)
                .iter()
                .copied()
                .filter(|n| *n != node)
                .collect();
            let mut node_lines = Vec::with_capacity(per_node);

            while node_lines.len() < per_node && !candidates.is_empty() {
                let least = candidates
                    .iter()
                    .map(|c| in_degree.get(c).copied().unwrap_or(0))
                    .min()
                    .unwrap_or(0);
                let balanced: Vec<NodeId> = candidates
                    .iter()
                    .copied()
                    .filter(|c| in_degree.get(c).copied().unwrap_or(0) == least)
                    .collect();

                let Some(&pick) = balanced.choose(rng) else {
                    break;
                };
                candidates.retain(|c| *c != pick);
                *in_degree.entry(pick).or_default() += 1;
                node_lines.push(pick);
            }

            // low-degree nodes reuse their only line
            while !node_lines.is_empty() && node_lines.len() < per_node {
                let again = node_lines[0];
                *in_degree.entry(again).or_default() += 1;
                node_lines.push(again);
            }

            chosen.insert(node, node_lines);
        }

        // keep the network's node order so lookups iterate deterministically
        network
            .nodes()
            .map(|node| (node, chosen.remove(&node).unwrap_or_default()))
            .collect()
    }

    pub fn kind(&self) -> AnonymityGraphKind {
        self.kind
    }

    pub fn num_nodes(&self) -> usize {
        self.lines.len()
    }

    /// Outbound lines of `node` (empty for unknown nodes)
    pub fn lines(&self, node: NodeId) -> &[NodeId] {
        self.lines.get(&node).map(|l| l.as_slice()).unwrap_or(&[])
    }

    pub fn out_degree(&self, node: NodeId) -> usize {
        self.lines(node).len()
    }

    /// Number of lines pointing at `node`
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.lines
            .values()
            .map(|l| l.iter().filter(|target| **target == node).count())
            .sum()
    }

    /// Next stem hop from `node` for the current message
    ///
    /// With several lines the active one is drawn per message; a single line
    /// is followed without consuming randomness.
    pub fn successor(&self, node: NodeId, rng: &mut StdRng) -> Option<NodeId> {
        match self.lines(node) {
            [] => None,
            [only] => Some(*only),
            lines => Some(lines[rng.gen_range(0..lines.len())]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ep_network::TopologyKind;
    use crate::ep_weights::{EdgeWeightGenerator, EdgeWeightKind, NodeWeightGenerator, NodeWeightKind};
    use rand::SeedableRng;

    fn network(node_count: usize, degree: usize, seed: u64) -> Network {
        Network::generate(
            node_count,
            degree,
            TopologyKind::RandomRegular,
            &EdgeWeightGenerator::new(EdgeWeightKind::unweighted()),
            &NodeWeightGenerator::new(NodeWeightKind::Uniform),
            seed,
        )
        .unwrap()
    }

    #[test]
    fn test_dandelion_graph_one_line_per_node() {
        let net = network(50, 4, 1);
        let mut rng = StdRng::from_seed([0u8; 32]);
        let graph = AnonymityGraph::build(AnonymityGraphKind::Dandelion, &net, &mut rng);

        assert_eq!(graph.num_nodes(), 50);
        for node in net.nodes() {
            assert_eq!(graph.out_degree(node), 1);
            let target = graph.lines(node)[0];
            assert_ne!(target, node, "self loop at {}", node);
            assert!(net.neighbors(node).contains(&target));
        }
    }

    #[test]
    fn test_dandelion_pp_graph_two_lines_per_node() {
        let net = network(60, 4, 2);
        let mut rng = StdRng::from_seed([1u8; 32]);
        let graph = AnonymityGraph::build(AnonymityGraphKind::DandelionPlusPlus, &net, &mut rng);

        let mut total_in = 0;
        for node in net.nodes() {
            let lines = graph.lines(node);
            assert_eq!(lines.len(), 2);
            assert_ne!(lines[0], lines[1]);
            for target in lines {
                assert_ne!(*target, node);
                assert!(net.neighbors(node).contains(target));
            }
            total_in += graph.in_degree(node);
        }
        assert_eq!(total_in, 2 * 60);
    }

    #[test]
    fn test_dandelion_pp_low_degree_reuses_line() {
        // triangle with a pendant node 3
        let edges = [(0, 1, None), (1, 2, None), (2, 0, None), (2, 3, None)];
        let net = Network::from_edges(
            &edges,
            &EdgeWeightGenerator::new(EdgeWeightKind::unweighted()),
            &NodeWeightGenerator::new(NodeWeightKind::Uniform),
            0,
        )
        .unwrap();
        let mut rng = StdRng::from_seed([2u8; 32]);
        let graph = AnonymityGraph::build(AnonymityGraphKind::DandelionPlusPlus, &net, &mut rng);

        // node 3 only knows node 2
        assert_eq!(graph.lines(3), &[2, 2]);
        for node in net.nodes() {
            assert_eq!(graph.out_degree(node), 2);
        }
    }

    #[test]
    fn test_successor_single_line_uses_no_randomness() {
        let net = network(20, 4, 3);
        let mut rng = StdRng::from_seed([3u8; 32]);
        let graph = AnonymityGraph::build(AnonymityGraphKind::Dandelion, &net, &mut rng);

        let mut a = StdRng::seed_from_u64(11);
        let mut b = StdRng::seed_from_u64(11);
        for node in net.nodes() {
            assert_eq!(graph.successor(node, &mut a), Some(graph.lines(node)[0]));
        }
        // rng untouched: both streams still agree
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
        assert_eq!(graph.successor(999, &mut a), None);
    }

    #[test]
    fn test_successor_picks_both_lines() {
        let net = network(20, 4, 4);
        let mut rng = StdRng::from_seed([4u8; 32]);
        let graph = AnonymityGraph::build(AnonymityGraphKind::DandelionPlusPlus, &net, &mut rng);

        let lines = graph.lines(0).to_vec();
        let mut seen = hashbrown::HashSet::new();
        for _ in 0..200 {
            seen.insert(graph.successor(0, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 2);
        assert!(lines.iter().all(|l| seen.contains(l)));
    }

    #[test]
    fn test_construction_deterministic_for_seed() {
        let net = network(40, 3, 5);
        let a = AnonymityGraph::build(
            AnonymityGraphKind::DandelionPlusPlus,
            &net,
            &mut StdRng::seed_from_u64(8),
        );
        let b = AnonymityGraph::build(
            AnonymityGraphKind::DandelionPlusPlus,
            &net,
            &mut StdRng::seed_from_u64(8),
        );
        for node in net.nodes() {
            assert_eq!(a.lines(node), b.lines(node));
        }
    }
}
