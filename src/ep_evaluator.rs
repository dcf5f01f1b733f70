//! Source-inference estimators and deanonymization metrics
//!
//! An estimator turns what the adversary observed about one message into a
//! ranking of every network node as the possible originator. Metrics then
//! score where the true source landed in that ranking:
//!
//! | metric | observed message | unobserved message |
//! |---|---|---|
//! | `hit_ratio` | 1 if rank ≤ k | 0 |
//! | `ndcg` | 1 / log2(1 + rank) | 0 |
//! | `inverse_rank` | 1 / rank | 1 / n |
//! | `entropy` | bits of the estimator's probability mass | log2(n) |
//!
//! The dummy estimator needs no observation and ranks every message.

use crate::ep_error::{SimError, SimResult};
use crate::ep_interface::{MessageId, NodeId, SimTime, CONTACT_TIME_QUANTILES};
use crate::ep_simulator::{mean_and_std, quantile, MessageRun, SimulationResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Estimators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    /// Blame the node that relayed the message to the earliest observer
    FirstSent,

    /// Blame the honest nodes closest to the earliest observer
    #[default]
    FirstReach,

    /// Uniform random ranking (baseline)
    Dummy,
}

impl Estimator {
    pub const ALL: [Estimator; 3] = [Estimator::FirstSent, Estimator::FirstReach, Estimator::Dummy];

    pub fn name(&self) -> &'static str {
        match self {
            Estimator::FirstSent => "first_sent",
            Estimator::FirstReach => "first_reach",
            Estimator::Dummy => "dummy",
        }
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Estimator {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_sent" => Ok(Estimator::FirstSent),
            "first_reach" => Ok(Estimator::FirstReach),
            "dummy" => Ok(Estimator::Dummy),
            other => Err(SimError::UnknownEstimator(other.to_string())),
        }
    }
}

/// An estimator's answer for one message
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Every network node, most likely source first
    pub ranking: Vec<NodeId>,

    /// Shannon entropy (bits) of the probability mass behind the ranking
    pub entropy: f64,
}

// ============================================================================
// Reports
// ============================================================================

/// Per-message scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub source: NodeId,

    /// 1-based position of the true source; None if the adversary saw nothing
    pub rank: Option<usize>,
    pub hit_ratio: f64,
    pub ndcg: f64,
    pub inverse_rank: f64,
    pub entropy: f64,
    pub message_spread_ratio: f64,

    /// Arrival-time deciles over the nodes this message reached
    pub contact_times: Vec<SimTime>,
}

/// Aggregated scores of one estimator over a simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub protocol: String,
    pub estimator: Estimator,
    pub top_k: usize,
    pub hit_ratio: f64,
    pub ndcg: f64,
    pub inverse_rank: f64,
    pub entropy: f64,
    pub message_spread_ratio: f64,
    pub contact_time_quantiles: Vec<f64>,
    pub contact_time_mean: Vec<SimTime>,
    pub contact_time_std: Vec<SimTime>,
    pub messages: Vec<MessageRecord>,
}

/// One flat `(estimator, metric, value)` triple, ready for any recorder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub protocol: String,
    pub estimator: Estimator,
    pub metric: String,
    pub value: f64,
}

impl EvaluationReport {
    pub fn rows(&self) -> Vec<MetricRow> {
        let mut metrics: Vec<(String, f64)> = vec![
            ("hit_ratio".to_string(), self.hit_ratio),
            ("ndcg".to_string(), self.ndcg),
            ("inverse_rank".to_string(), self.inverse_rank),
            ("entropy".to_string(), self.entropy),
            ("message_spread_ratio".to_string(), self.message_spread_ratio),
        ];
        for (idx, q) in self.contact_time_quantiles.iter().enumerate() {
            let pct = (q * 100.0).round() as u32;
            metrics.push((format!("contact_time_mean_p{}", pct), self.contact_time_mean[idx]));
            metrics.push((format!("contact_time_std_p{}", pct), self.contact_time_std[idx]));
        }

        metrics
            .into_iter()
            .map(|(metric, value)| MetricRow {
                protocol: self.protocol.clone(),
                estimator: self.estimator,
                metric,
                value,
            })
            .collect()
    }

    pub fn print_summary(&self) {
        println!("═══ {} / {} (top-{}) ═══", self.protocol, self.estimator, self.top_k);
        println!("  Messages: {}", self.messages.len());
        println!("  Hit ratio: {:.4}", self.hit_ratio);
        println!("  NDCG: {:.4}", self.ndcg);
        println!("  Inverse rank: {:.4}", self.inverse_rank);
        println!("  Entropy: {:.4} bits", self.entropy);
        println!("  Spread ratio: {:.4}", self.message_spread_ratio);
        if let (Some(first), Some(last)) = (self.contact_time_mean.first(), self.contact_time_mean.last()) {
            println!("  Contact time: p10={:.1}ms, p90={:.1}ms", first, last);
        }
        println!();
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Scores one estimator against a finished simulation
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    result: &'a SimulationResult,
    estimator: Estimator,
    top_k: usize,
    seed: u64,
}

impl<'a> Evaluator<'a> {
    pub fn new(result: &'a SimulationResult, estimator: Estimator) -> Self {
        Self {
            result,
            estimator,
            top_k: 1,
            seed: 0,
        }
    }

    /// Count a hit when the true source is within the top `k` candidates
    pub fn with_top_k(mut self, top_k: usize) -> SimResult<Self> {
        if top_k == 0 {
            return Err(SimError::config("top_k", "must be at least 1"));
        }
        self.top_k = top_k;
        Ok(self)
    }

    /// Seed for the dummy estimator's per-message shuffles
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn estimator(&self) -> Estimator {
        self.estimator
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Ranking for one message, or None if the estimator has nothing to go on
    pub fn predict(&self, run: &MessageRun) -> SimResult<Option<Prediction>> {
        match self.estimator {
            Estimator::FirstSent => Ok(self.first_sent(run)),
            Estimator::FirstReach => self.first_reach(run),
            Estimator::Dummy => Ok(Some(self.dummy(run))),
        }
    }

    fn first_sent(&self, run: &MessageRun) -> Option<Prediction> {
        let observation = self.result.adversary().observe(&run.trace);
        if observation.is_empty() {
            return None;
        }

        // earliest observation first, ties by smaller sender
        let mut blamed: Vec<(SimTime, NodeId)> = observation
            .iter()
            .map(|(node, arrival)| (arrival.time, arrival.sender.unwrap_or(node)))
            .collect();
        blamed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut seen = hashbrown::HashSet::new();
        let mut ranking: Vec<NodeId> = blamed
            .into_iter()
            .map(|(_, sender)| sender)
            .filter(|sender| seen.insert(*sender))
            .collect();
        ranking.extend(self.result.network().nodes().filter(|n| !seen.contains(n)));

        Some(Prediction {
            ranking,
            entropy: 0.0,
        })
    }

    fn first_reach(&self, run: &MessageRun) -> SimResult<Option<Prediction>> {
        let adversary = self.result.adversary();
        let Some((observer, arrival)) = adversary.observe(&run.trace).first_contact() else {
            return Ok(None);
        };
        let network = self.result.network();

        // an observer with no sender originated the message itself
        if arrival.sender.is_none() {
            let mut ranking = vec![observer];
            ranking.extend(network.nodes().filter(|n| *n != observer));
            return Ok(Some(Prediction {
                ranking,
                entropy: 0.0,
            }));
        }

        let mut candidates: Vec<(NodeId, f64, u32)> = network
            .shortest_paths(observer)?
            .into_iter()
            .filter(|(node, _)| !adversary.is_compromised(*node))
            .map(|(node, (latency, hops))| (node, latency, hops))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)));

        let distances: Vec<f64> = candidates.iter().map(|c| c.1).collect();
        let mut ranking: Vec<NodeId> = candidates.into_iter().map(|c| c.0).collect();
        let ranked: hashbrown::HashSet<NodeId> = ranking.iter().copied().collect();
        ranking.extend(network.nodes().filter(|n| !ranked.contains(n)));

        Ok(Some(Prediction {
            ranking,
            entropy: inverse_distance_entropy(&distances),
        }))
    }

    fn dummy(&self, run: &MessageRun) -> Prediction {
        let network = self.result.network();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(run.id as u64));
        let mut ranking: Vec<NodeId> = network.nodes().collect();
        ranking.shuffle(&mut rng);

        Prediction {
            ranking,
            entropy: (network.num_nodes() as f64).log2(),
        }
    }

    fn score(&self, run: &MessageRun) -> SimResult<MessageRecord> {
        let node_count = self.result.network().num_nodes();
        let prediction = self.predict(run)?;

        let rank = prediction
            .as_ref()
            .and_then(|p| p.ranking.iter().position(|n| *n == run.source))
            .map(|idx| idx + 1);

        let (hit_ratio, ndcg, inverse_rank) = match rank {
            Some(rank) => (
                if rank <= self.top_k { 1.0 } else { 0.0 },
                1.0 / (1.0 + rank as f64).log2(),
                1.0 / rank as f64,
            ),
            None => (0.0, 0.0, 1.0 / node_count as f64),
        };
        let entropy = prediction
            .map(|p| p.entropy)
            .unwrap_or_else(|| (node_count as f64).log2());

        let mut times = run.trace.arrival_times();
        times.sort_by(|a, b| a.total_cmp(b));
        let contact_times = CONTACT_TIME_QUANTILES
            .iter()
            .map(|q| quantile(&times, *q))
            .collect();

        Ok(MessageRecord {
            id: run.id,
            source: run.source,
            rank,
            hit_ratio,
            ndcg,
            inverse_rank,
            entropy,
            message_spread_ratio: run.trace.reached_ratio(node_count),
            contact_times,
        })
    }

    /// Score every message and aggregate
    pub fn report(&self) -> SimResult<EvaluationReport> {
        let messages = self
            .result
            .runs()
            .iter()
            .map(|run| self.score(run))
            .collect::<SimResult<Vec<_>>>()?;

        let mean_of = |f: fn(&MessageRecord) -> f64| {
            mean_and_std(&messages.iter().map(f).collect::<Vec<_>>()).0
        };
        let contact = self.result.node_contact_time_quantiles(&CONTACT_TIME_QUANTILES);

        let report = EvaluationReport {
            protocol: self.result.protocol_name().to_string(),
            estimator: self.estimator,
            top_k: self.top_k,
            hit_ratio: mean_of(|m| m.hit_ratio),
            ndcg: mean_of(|m| m.ndcg),
            inverse_rank: mean_of(|m| m.inverse_rank),
            entropy: mean_of(|m| m.entropy),
            message_spread_ratio: mean_of(|m| m.message_spread_ratio),
            contact_time_quantiles: contact.quantiles,
            contact_time_mean: contact.mean,
            contact_time_std: contact.std,
            messages,
        };

        log::info!(
            "{} / {}: hit_ratio={:.4}, ndcg={:.4}, spread={:.3}",
            report.protocol,
            report.estimator,
            report.hit_ratio,
            report.ndcg,
            report.message_spread_ratio
        );
        Ok(report)
    }

    pub fn get_report(&self) -> SimResult<EvaluationReport> {
        self.report()
    }
}

/// Entropy of candidates weighted by inverse latency distance
///
/// Candidates at distance zero are indistinguishable from the observer and
/// share all of the mass between them.
fn inverse_distance_entropy(distances: &[f64]) -> f64 {
    let zero = distances.iter().filter(|d| **d <= 0.0).count();
    let weights: Vec<f64> = if zero > 0 {
        vec![1.0; zero]
    } else {
        distances.iter().map(|d| 1.0 / d).collect()
    };

    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return 0.0;
    }
    weights
        .iter()
        .map(|w| w / total)
        .filter(|p| *p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ep_adversary::{Adversary, AdversarySelection};
    use crate::ep_network::{Network, TopologyKind};
    use crate::ep_protocol::{BroadcastMode, BroadcastProtocol};
    use crate::ep_simulator::Simulator;
    use crate::ep_weights::{EdgeWeightGenerator, EdgeWeightKind, NodeWeightGenerator, NodeWeightKind};
    use std::sync::Arc;

    fn network(node_count: usize, degree: usize, edge_kind: EdgeWeightKind, seed: u64) -> Arc<Network> {
        Arc::new(
            Network::generate(
                node_count,
                degree,
                TopologyKind::RandomRegular,
                &EdgeWeightGenerator::new(edge_kind),
                &NodeWeightGenerator::new(NodeWeightKind::Uniform),
                seed,
            )
            .unwrap(),
        )
    }

    fn simulate(adversary: &Adversary, sources: &[NodeId], seed: u64) -> SimulationResult {
        let protocol = BroadcastProtocol::new(adversary.network().clone(), BroadcastMode::All);
        Simulator::default()
            .run_sources(&protocol, adversary, sources, 1.0, &mut StdRng::seed_from_u64(seed))
            .unwrap()
    }

    #[test]
    fn test_estimator_names() {
        for estimator in Estimator::ALL {
            assert_eq!(estimator.to_string().parse::<Estimator>().unwrap(), estimator);
        }
        assert!(matches!(
            "oracle".parse::<Estimator>(),
            Err(SimError::UnknownEstimator(name)) if name == "oracle"
        ));
        assert_eq!(Estimator::default(), Estimator::FirstReach);
    }

    #[test]
    fn test_zero_latency_first_reach_beats_dummy() {
        let net = network(20, 4, EdgeWeightKind::Constant { latency: 0.0 }, 42);
        let mut rng = StdRng::seed_from_u64(7);
        let adversary = Adversary::new(net.clone(), 0.1, AdversarySelection::Random, false, &mut rng).unwrap();
        assert_eq!(adversary.nodes().len(), 2);

        // smallest honest neighbour of the smallest compromised node
        let observer = *adversary.nodes().iter().next().unwrap();
        let source = net
            .neighbors(observer)
            .iter()
            .copied()
            .find(|n| !adversary.is_compromised(*n))
            .unwrap();

        let result = simulate(&adversary, &[source], 1);
        assert_eq!(result.message_spread_ratios(), vec![1.0]);

        let first_reach = Evaluator::new(&result, Estimator::FirstReach).report().unwrap();
        let dummy = Evaluator::new(&result, Estimator::Dummy).report().unwrap();

        assert_eq!(first_reach.hit_ratio, 1.0);
        assert!(first_reach.hit_ratio >= dummy.hit_ratio);
        assert_eq!(first_reach.message_spread_ratio, 1.0);
    }

    #[test]
    fn test_first_sent_catches_source_surrounded_by_adversary() {
        let net = network(30, 4, EdgeWeightKind::default(), 5);
        let adversary = Adversary::with_nodes(net.clone(), net.neighbors(0), false).unwrap();

        let result = simulate(&adversary, &[0, 0, 0], 2);
        let report = Evaluator::new(&result, Estimator::FirstSent).report().unwrap();

        assert_eq!(report.hit_ratio, 1.0);
        assert_eq!(report.ndcg, 1.0);
        assert_eq!(report.inverse_rank, 1.0);
        assert_eq!(report.entropy, 0.0);
        assert!(report.messages.iter().all(|m| m.rank == Some(1)));
    }

    #[test]
    fn test_unobserved_messages_score_as_unknown() {
        let net = network(20, 4, EdgeWeightKind::default(), 6);
        let adversary = Adversary::with_nodes(net, &[], false).unwrap();
        let result = simulate(&adversary, &[1, 2, 3], 3);

        for estimator in [Estimator::FirstSent, Estimator::FirstReach] {
            let report = Evaluator::new(&result, estimator).report().unwrap();
            assert_eq!(report.hit_ratio, 0.0);
            assert_eq!(report.ndcg, 0.0);
            assert!((report.inverse_rank - 1.0 / 20.0).abs() < 1e-12);
            assert!((report.entropy - 20f64.log2()).abs() < 1e-12);
            assert!(report.messages.iter().all(|m| m.rank.is_none()));
        }

        // dummy ranks every message regardless of observation
        let dummy = Evaluator::new(&result, Estimator::Dummy).report().unwrap();
        assert!(dummy.messages.iter().all(|m| m.rank.is_some()));
    }

    #[test]
    fn test_dummy_hit_ratio_near_uniform() {
        let net = network(20, 4, EdgeWeightKind::default(), 8);
        let mut rng = StdRng::seed_from_u64(8);
        let adversary = Adversary::new(net.clone(), 0.1, AdversarySelection::Random, false, &mut rng).unwrap();
        let protocol = BroadcastProtocol::new(net, BroadcastMode::All);
        let result = Simulator::new(4)
            .run(&protocol, &adversary, 2000, 0.9, &mut rng)
            .unwrap();

        let report = Evaluator::new(&result, Estimator::Dummy)
            .with_seed(99)
            .report()
            .unwrap();
        assert!((report.hit_ratio - 0.05).abs() < 0.02, "hit ratio {}", report.hit_ratio);
    }

    #[test]
    fn test_metric_ranges_and_top_k() {
        let net = network(40, 4, EdgeWeightKind::default(), 9);
        let mut rng = StdRng::seed_from_u64(9);
        let adversary = Adversary::new(net.clone(), 0.2, AdversarySelection::Random, false, &mut rng).unwrap();
        let protocol = BroadcastProtocol::new(net, BroadcastMode::Sqrt);
        let result = Simulator::default()
            .run(&protocol, &adversary, 50, 1.0, &mut rng)
            .unwrap();

        for estimator in Estimator::ALL {
            let report = Evaluator::new(&result, estimator).report().unwrap();
            for value in [report.hit_ratio, report.ndcg, report.inverse_rank, report.message_spread_ratio] {
                assert!((0.0..=1.0).contains(&value), "{} out of range: {}", estimator, value);
            }
            assert!(report.entropy >= 0.0 && report.entropy <= 40f64.log2() + 1e-9);
            for m in &report.messages {
                assert!(m.hit_ratio == 0.0 || m.hit_ratio == 1.0);
            }

            // top-n always hits observed messages
            let everything = Evaluator::new(&result, estimator).with_top_k(40).unwrap().report().unwrap();
            for m in &everything.messages {
                assert_eq!(m.hit_ratio, if m.rank.is_some() { 1.0 } else { 0.0 });
            }
        }

        assert!(Evaluator::new(&result, Estimator::Dummy).with_top_k(0).is_err());
    }

    #[test]
    fn test_active_adversary_coverage_is_monotone() {
        let net = network(60, 4, EdgeWeightKind::default(), 10);
        let mut rng = StdRng::seed_from_u64(10);
        let few = Adversary::new(net.clone(), 0.1, AdversarySelection::Degree, true, &mut rng).unwrap();
        let many = Adversary::new(net.clone(), 0.5, AdversarySelection::Degree, true, &mut rng).unwrap();
        assert!(few.nodes().is_subset(many.nodes()));

        let sources: Vec<NodeId> = net.nodes().filter(|n| !many.is_compromised(*n)).take(10).collect();
        let spread_few = simulate(&few, &sources, 11).message_spread_ratios();
        let spread_many = simulate(&many, &sources, 11).message_spread_ratios();

        for (a, b) in spread_few.iter().zip(&spread_many) {
            assert!(b <= a, "{} > {}", b, a);
        }
    }

    #[test]
    fn test_report_rows() {
        let net = network(20, 4, EdgeWeightKind::default(), 12);
        let adversary = Adversary::with_nodes(net, &[0, 1], false).unwrap();
        let result = simulate(&adversary, &[5, 6], 4);
        let report = Evaluator::new(&result, Estimator::FirstReach).get_report().unwrap();

        let rows = report.rows();
        assert_eq!(rows.len(), 5 + 2 * 9);
        assert!(rows.iter().all(|r| r.estimator == Estimator::FirstReach && r.protocol == "Broadcast"));
        assert!(rows.iter().any(|r| r.metric == "contact_time_mean_p50"));
        assert_eq!(report.messages[0].contact_times.len(), 9);
    }

    #[test]
    fn test_inverse_distance_entropy() {
        assert_eq!(inverse_distance_entropy(&[]), 0.0);
        assert!((inverse_distance_entropy(&[1.0, 1.0]) - 1.0).abs() < 1e-12);
        assert!((inverse_distance_entropy(&[0.0, 0.0, 0.0, 0.0, 5.0]) - 2.0).abs() < 1e-12);
        assert!(inverse_distance_entropy(&[1.0, 100.0]) < 1.0);
    }
}
