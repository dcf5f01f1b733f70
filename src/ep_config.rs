// Experiment configuration
//
// Every section has a usable default, so an experiment file only needs the
// values it changes:
//
//   name: dandelion-vs-passive
//   seed: 42
//   network:
//     node_count: 500
//     degree: 8
//     edge_weight_kind: { type: normal, mean: 171.0, std_dev: 76.0 }
//   protocol:
//     kind: dandelion
//     stem_probability: 0.5
//   adversary:
//     ratio: 0.1
//   evaluation:
//     estimators: [first_sent, first_reach, dummy]

use crate::ep_adversary::{Adversary, AdversarySelection};
use crate::ep_error::{SimError, SimResult};
use crate::ep_evaluator::Estimator;
use crate::ep_interface::{DEFAULT_COVERAGE_THRESHOLD, DEFAULT_MAX_STEM_HOPS};
use crate::ep_network::{Network, TopologyKind};
use crate::ep_protocol::{
    BroadcastMode, BroadcastProtocol, DandelionPlusPlusProtocol, DandelionProtocol, Protocol,
    ProtocolKind,
};
use crate::ep_weights::{EdgeWeightGenerator, EdgeWeightKind, NodeWeightGenerator, NodeWeightKind};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub node_count: usize,
    pub degree: usize,
    pub topology_kind: TopologyKind,
    pub edge_weight_kind: EdgeWeightKind,
    pub node_weight_kind: NodeWeightKind,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_count: 100,
            degree: 4,
            topology_kind: TopologyKind::RandomRegular,
            edge_weight_kind: EdgeWeightKind::default(),
            node_weight_kind: NodeWeightKind::default(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.node_count < 3 {
            return Err(SimError::config(
                "node_count",
                format!("must be at least 3, got {}", self.node_count),
            ));
        }
        if self.degree >= self.node_count {
            return Err(SimError::config(
                "degree",
                format!("must be smaller than node_count ({}), got {}", self.node_count, self.degree),
            ));
        }
        EdgeWeightGenerator::new(self.edge_weight_kind).validate()?;
        NodeWeightGenerator::new(self.node_weight_kind).validate()
    }

    pub fn build(&self, seed: u64) -> SimResult<Network> {
        Network::generate(
            self.node_count,
            self.degree,
            self.topology_kind,
            &EdgeWeightGenerator::new(self.edge_weight_kind),
            &NodeWeightGenerator::new(self.node_weight_kind),
            seed,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub kind: ProtocolKind,

    /// Chance of forwarding one more stem hop (Dandelion family only)
    pub stem_probability: f64,
    pub broadcast_mode: BroadcastMode,
    pub max_stem_hops: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            kind: ProtocolKind::Broadcast,
            stem_probability: 0.5,
            broadcast_mode: BroadcastMode::All,
            max_stem_hops: DEFAULT_MAX_STEM_HOPS,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=1.0).contains(&self.stem_probability) {
            return Err(SimError::config(
                "stem_probability",
                format!("must be in [0, 1], got {}", self.stem_probability),
            ));
        }
        Ok(())
    }

    /// Build the protocol; anonymity graphs draw from `rng`
    pub fn build(&self, network: Arc<Network>, rng: &mut StdRng) -> SimResult<Box<dyn Protocol>> {
        let protocol: Box<dyn Protocol> = match self.kind {
            ProtocolKind::Broadcast => Box::new(BroadcastProtocol::new(network, self.broadcast_mode)),
            ProtocolKind::Dandelion => Box::new(
                DandelionProtocol::new(network, self.stem_probability, self.broadcast_mode, rng)?
                    .with_max_stem_hops(self.max_stem_hops),
            ),
            ProtocolKind::DandelionPlusPlus => Box::new(
                DandelionPlusPlusProtocol::new(network, self.stem_probability, self.broadcast_mode, rng)?
                    .with_max_stem_hops(self.max_stem_hops),
            ),
        };
        Ok(protocol)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdversaryConfig {
    pub ratio: f64,
    pub selection: AdversarySelection,
    pub active: bool,
}

impl Default for AdversaryConfig {
    fn default() -> Self {
        Self {
            ratio: 0.1,
            selection: AdversarySelection::Random,
            active: false,
        }
    }
}

impl AdversaryConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=1.0).contains(&self.ratio) {
            return Err(SimError::config(
                "adversary_ratio",
                format!("must be in [0, 1], got {}", self.ratio),
            ));
        }
        Ok(())
    }

    pub fn build(&self, network: Arc<Network>, rng: &mut StdRng) -> SimResult<Adversary> {
        Adversary::new(network, self.ratio, self.selection, self.active, rng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub message_count: usize,
    pub coverage_threshold: f64,
    pub workers: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            message_count: 20,
            coverage_threshold: DEFAULT_COVERAGE_THRESHOLD,
            workers: 1,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.message_count == 0 {
            return Err(SimError::config("message_count", "must be at least 1"));
        }
        if !(self.coverage_threshold > 0.0 && self.coverage_threshold <= 1.0) {
            return Err(SimError::config(
                "coverage_threshold",
                format!("must be in (0, 1], got {}", self.coverage_threshold),
            ));
        }
        if self.workers == 0 {
            return Err(SimError::config("workers", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub estimators: Vec<Estimator>,
    pub top_k: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            estimators: Estimator::ALL.to_vec(),
            top_k: 1,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.estimators.is_empty() {
            return Err(SimError::config("estimators", "must name at least one estimator"));
        }
        if self.top_k == 0 {
            return Err(SimError::config("top_k", "must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Experiment
// ============================================================================

/// One complete experiment: network, protocol, adversary, runs and scoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub name: Option<String>,
    pub description: Option<String>,

    /// Master seed; drawn from entropy when absent
    pub seed: Option<u64>,

    pub network: NetworkConfig,
    pub protocol: ProtocolConfig,
    pub adversary: AdversaryConfig,
    pub simulation: SimulationConfig,
    pub evaluation: EvaluationConfig,
}

impl ExperimentConfig {
    /// Parse and validate a YAML experiment description
    pub fn from_yaml_str(yaml: &str) -> SimResult<Self> {
        let config: ExperimentConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check every section; nothing is simulated with an invalid config
    pub fn validate(&self) -> SimResult<()> {
        self.network.validate()?;
        self.protocol.validate()?;
        self.adversary.validate()?;
        self.simulation.validate()?;
        self.evaluation.validate()
    }

    /// The fixed seed, or a fresh one from entropy
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| rand::thread_rng().gen())
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            format!(
                "{:?} n={} d={} adversary={:.2}",
                self.protocol.kind, self.network.node_count, self.network.degree, self.adversary.ratio
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.coverage_threshold, 0.9);
        assert_eq!(config.protocol.max_stem_hops, 10);
        assert_eq!(config.evaluation.estimators.len(), 3);
        assert_eq!(config.evaluation.top_k, 1);
    }

    #[test]
    fn test_partial_yaml_overrides_defaults() {
        let yaml = "
name: dandelion-small
seed: 7
network:
  node_count: 30
  degree: 4
  edge_weight_kind: { type: uniform, max: 500.0 }
protocol:
  kind: dandelion_plus_plus
  stem_probability: 0.8
  broadcast_mode: sqrt
adversary:
  ratio: 0.2
  selection: degree
  active: true
evaluation:
  estimators: [first_reach]
";
        let config = ExperimentConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.name.as_deref(), Some("dandelion-small"));
        assert_eq!(config.resolve_seed(), 7);
        assert_eq!(config.network.node_count, 30);
        assert_eq!(config.network.edge_weight_kind, EdgeWeightKind::Uniform { max: 500.0 });
        assert_eq!(config.network.node_weight_kind, NodeWeightKind::Uniform);
        assert_eq!(config.protocol.kind, ProtocolKind::DandelionPlusPlus);
        assert_eq!(config.protocol.broadcast_mode, BroadcastMode::Sqrt);
        assert_eq!(config.adversary.selection, AdversarySelection::Degree);
        assert!(config.adversary.active);
        assert_eq!(config.evaluation.estimators, vec![Estimator::FirstReach]);
        assert_eq!(config.simulation.message_count, 20);
    }

    #[test]
    fn test_invalid_values_name_their_field() {
        let cases = [
            ("network: { node_count: 2, degree: 1 }", "node_count"),
            ("network: { node_count: 10, degree: 10 }", "degree"),
            ("protocol: { stem_probability: 1.5 }", "stem_probability"),
            ("adversary: { ratio: -0.1 }", "adversary_ratio"),
            ("simulation: { coverage_threshold: 0.0 }", "coverage_threshold"),
            ("simulation: { message_count: 0 }", "message_count"),
            ("evaluation: { top_k: 0 }", "top_k"),
            ("evaluation: { estimators: [] }", "estimators"),
        ];

        for (yaml, expected) in cases {
            match ExperimentConfig::from_yaml_str(yaml) {
                Err(SimError::Configuration { field, .. }) => assert_eq!(field, expected, "{}", yaml),
                other => panic!("{} should fail on {}, got {:?}", yaml, expected, other),
            }
        }
    }

    #[test]
    fn test_unknown_names_fail_to_parse() {
        let result = ExperimentConfig::from_yaml_str("evaluation: { estimators: [oracle] }");
        assert!(matches!(result, Err(SimError::ConfigParse(_))));

        let result = ExperimentConfig::from_yaml_str("protocol: { kind: gossip }");
        assert!(matches!(result, Err(SimError::ConfigParse(_))));
    }

    #[test]
    fn test_yaml_round_trip_keeps_config() {
        let mut config = ExperimentConfig::default();
        config.seed = Some(3);
        config.protocol.kind = ProtocolKind::Dandelion;
        config.network.node_weight_kind = NodeWeightKind::stake();

        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(ExperimentConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_build_sections() {
        let mut config = ExperimentConfig::default();
        config.network.node_count = 30;
        config.protocol.kind = ProtocolKind::DandelionPlusPlus;

        let network = Arc::new(config.network.build(1).unwrap());
        let mut rng = StdRng::seed_from_u64(1);
        let protocol = config.protocol.build(network.clone(), &mut rng).unwrap();
        let adversary = config.adversary.build(network.clone(), &mut rng).unwrap();

        assert_eq!(protocol.name(), "Dandelion++");
        assert_eq!(protocol.network().num_nodes(), 30);
        assert_eq!(adversary.nodes().len(), 3);
    }
}
