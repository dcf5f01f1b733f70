// Edge latency and node weight generators

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal, Pareto};
use serde::{Deserialize, Serialize};

use crate::ep_error::{SimError, SimResult};
use crate::ep_interface::{
    Latency, NORMAL_LATENCY_MEAN, NORMAL_LATENCY_STD_DEV, STAKE_PARETO_SHAPE, UNIFORM_LATENCY_MAX,
};

// ============================================================================
// Weight Kinds
// ============================================================================

/// How connection latencies are drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeWeightKind {
    /// Every edge has the same latency
    Constant { latency: Latency },

    /// Latency drawn uniformly from [0, max)
    Uniform { max: Latency },

    /// Latency drawn from N(mean, std_dev), negative draws clipped to zero
    Normal { mean: Latency, std_dev: Latency },
}

/// How node weights (message-source likelihood) are drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeWeightKind {
    /// Weight drawn uniformly from [0, 1)
    Uniform,

    /// Heavy-tailed (Pareto) stake, normalised so all weights sum to 1
    Stake { shape: f64 },
}

impl Default for EdgeWeightKind {
    fn default() -> Self {
        Self::Normal {
            mean: NORMAL_LATENCY_MEAN,
            std_dev: NORMAL_LATENCY_STD_DEV,
        }
    }
}

impl Default for NodeWeightKind {
    fn default() -> Self {
        Self::Uniform
    }
}

impl EdgeWeightKind {
    /// Unit latency on every edge (hop-count timing)
    pub fn unweighted() -> Self {
        Self::Constant { latency: 1.0 }
    }

    pub fn uniform() -> Self {
        Self::Uniform {
            max: UNIFORM_LATENCY_MAX,
        }
    }
}

impl NodeWeightKind {
    pub fn stake() -> Self {
        Self::Stake {
            shape: STAKE_PARETO_SHAPE,
        }
    }
}

// ============================================================================
// Generators
// ============================================================================

/// Stateless sampler for edge latencies
///
/// All randomness comes from the caller's rng, so a network built from the
/// same seed always gets the same latencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeWeightGenerator {
    pub kind: EdgeWeightKind,
}

impl EdgeWeightGenerator {
    pub fn new(kind: EdgeWeightKind) -> Self {
        Self { kind }
    }

    /// Reject parameters that could produce negative or undefined latencies
    pub fn validate(&self) -> SimResult<()> {
        match self.kind {
            EdgeWeightKind::Constant { latency } => {
                if !latency.is_finite() || latency < 0.0 {
                    return Err(SimError::config(
                        "edge_weight_kind",
                        format!("constant latency must be finite and >= 0, got {}", latency),
                    ));
                }
            }
            EdgeWeightKind::Uniform { max } => {
                if !max.is_finite() || max < 0.0 {
                    return Err(SimError::config(
                        "edge_weight_kind",
                        format!("uniform max must be finite and >= 0, got {}", max),
                    ));
                }
            }
            EdgeWeightKind::Normal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
                    return Err(SimError::config(
                        "edge_weight_kind",
                        format!("normal needs finite mean and std_dev >= 0, got ({}, {})", mean, std_dev),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Draw `count` latencies
    pub fn generate(&self, count: usize, rng: &mut StdRng) -> SimResult<Vec<Latency>> {
        self.validate()?;

        let latencies = match self.kind {
            EdgeWeightKind::Constant { latency } => vec![latency; count],
            EdgeWeightKind::Uniform { max } => (0..count).map(|_| rng.gen::<f64>() * max).collect(),
            EdgeWeightKind::Normal { mean, std_dev } => {
                let normal = Normal::new(mean, std_dev)
                    .map_err(|e| SimError::config("edge_weight_kind", e.to_string()))?;
                // negative latencies are clipped, not rejected
                (0..count).map(|_| normal.sample(rng).max(0.0)).collect()
            }
        };

        Ok(latencies)
    }
}

/// Stateless sampler for node weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeWeightGenerator {
    pub kind: NodeWeightKind,
}

impl NodeWeightGenerator {
    pub fn new(kind: NodeWeightKind) -> Self {
        Self { kind }
    }

    pub fn validate(&self) -> SimResult<()> {
        if let NodeWeightKind::Stake { shape } = self.kind {
            if !shape.is_finite() || shape <= 0.0 {
                return Err(SimError::config(
                    "node_weight_kind",
                    format!("stake shape must be > 0, got {}", shape),
                ));
            }
        }
        Ok(())
    }

    /// Draw `count` non-negative node weights
    pub fn generate(&self, count: usize, rng: &mut StdRng) -> SimResult<Vec<f64>> {
        self.validate()?;

        let weights = match self.kind {
            NodeWeightKind::Uniform => (0..count).map(|_| rng.gen::<f64>()).collect(),
            NodeWeightKind::Stake { shape } => {
                let pareto = Pareto::new(1.0, shape)
                    .map_err(|e| SimError::config("node_weight_kind", e.to_string()))?;
                let stakes: Vec<f64> = (0..count).map(|_| pareto.sample(rng)).collect();
                let total: f64 = stakes.iter().sum();
                if total > 0.0 && total.is_finite() {
                    stakes.iter().map(|s| s / total).collect()
                } else {
                    vec![1.0 / count.max(1) as f64; count]
                }
            }
        };

        Ok(weights)
    }
}
