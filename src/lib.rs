//! # epRust - Broadcast Privacy Simulator for P2P Networks
//!
//! Simulates how a message spreads from its originator through a
//! peer-to-peer network under different broadcast protocols, lets an
//! adversary that controls part of the network watch (or block) the spread,
//! and scores how well the adversary can point back at the originator.
//!
//! ## Core Components
//!
//! - **Network**: connected weighted graph with edge latencies and node weights
//! - **Protocol**: Broadcast, Dandelion and Dandelion++ propagation engines
//! - **Adversary**: compromised node set, passive (observe) or active (swallow)
//! - **Simulator**: many independent messages, optionally on worker threads
//! - **Evaluator**: first_sent / first_reach / dummy estimators and ranking metrics
//!
//! ## Usage
//!
//! ```no_run
//! use ep_rust::{Adversary, AdversarySelection, BroadcastMode, DandelionProtocol};
//! use ep_rust::{EdgeWeightGenerator, EdgeWeightKind, NodeWeightGenerator, NodeWeightKind};
//! use ep_rust::{Estimator, Evaluator, Network, Simulator, TopologyKind};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use std::sync::Arc;
//!
//! let network = Arc::new(Network::generate(
//!     100,
//!     4,
//!     TopologyKind::RandomRegular,
//!     &EdgeWeightGenerator::new(EdgeWeightKind::default()),
//!     &NodeWeightGenerator::new(NodeWeightKind::stake()),
//!     42,
//! )?);
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let protocol = DandelionProtocol::new(network.clone(), 0.5, BroadcastMode::All, &mut rng)?;
//! let adversary = Adversary::new(network, 0.1, AdversarySelection::Random, false, &mut rng)?;
//!
//! let result = Simulator::default().run(&protocol, &adversary, 100, 0.9, &mut rng)?;
//! let report = Evaluator::new(&result, Estimator::FirstReach).report()?;
//! println!("hit ratio: {:.3}", report.hit_ratio);
//! # Ok::<(), ep_rust::SimError>(())
//! ```
//!
//! For config-driven runs see [`Experiment`] and the `scenario_runner` binary
//! in `simulator/`.

// Shared definitions
pub mod ep_error;
pub mod ep_interface;

// Graph model
pub mod ep_anonymity_graph;
pub mod ep_network;
pub mod ep_weights;

// Propagation and observation
pub mod ep_adversary;
pub mod ep_protocol;
pub mod ep_simulator;

// Scoring and orchestration
pub mod ep_config;
pub mod ep_evaluator;
pub mod ep_experiment;

pub use ep_adversary::{Adversary, AdversaryObservation, AdversarySelection};
pub use ep_anonymity_graph::{AnonymityGraph, AnonymityGraphKind};
pub use ep_config::ExperimentConfig;
pub use ep_error::{SimError, SimResult};
pub use ep_evaluator::{EvaluationReport, Estimator, Evaluator, MessageRecord, MetricRow};
pub use ep_experiment::{Experiment, ExperimentOutcome};
pub use ep_interface::{Latency, MessageId, NodeId, SimTime};
pub use ep_network::{Network, TopologyKind};
pub use ep_protocol::{
    Arrival, BroadcastMode, BroadcastProtocol, DandelionPlusPlusProtocol, DandelionProtocol,
    PropagationTrace, Protocol, ProtocolKind,
};
pub use ep_simulator::{MessageRun, SimulationResult, Simulator};
pub use ep_weights::{EdgeWeightGenerator, EdgeWeightKind, NodeWeightGenerator, NodeWeightKind};
