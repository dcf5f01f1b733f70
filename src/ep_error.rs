//! Error types shared by every stage of an experiment.
//!
//! All errors are raised synchronously by the call that detects them. The
//! simulation is deterministic for a given seed, so nothing here is retried.

use crate::ep_interface::NodeId;

/// Errors raised while building or running an experiment
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A parameter is outside its valid range (fails fast at construction)
    #[error("invalid configuration: `{field}` {constraint}")]
    Configuration {
        field: &'static str,
        constraint: String,
    },

    /// Latency lookup for a pair of nodes without an edge
    #[error("nodes {0} and {1} are not adjacent")]
    NotAdjacent(NodeId, NodeId),

    /// Estimator name outside {first_sent, first_reach, dummy}
    #[error("unknown estimator `{0}` (expected one of: first_sent, first_reach, dummy)")]
    UnknownEstimator(String),

    /// Node id not present in the network
    #[error("node {0} is not part of the network")]
    UnknownNode(NodeId),

    /// Experiment file could not be parsed
    #[error("failed to parse experiment config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn config(field: &'static str, constraint: impl Into<String>) -> Self {
        SimError::Configuration {
            field,
            constraint: constraint.into(),
        }
    }
}
