use crate::ep_adversary::Adversary;
use crate::ep_error::{SimError, SimResult};
use crate::ep_interface::{MessageId, NodeId, SimTime};
use crate::ep_network::Network;
use crate::ep_protocol::{PropagationTrace, Protocol};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

// ============================================================================
// Results
// ============================================================================

/// One simulated message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRun {
    pub id: MessageId,
    pub source: NodeId,
    pub trace: PropagationTrace,
}

/// Mean and standard deviation (over messages) of per-message contact-time quantiles
#[derive(Debug, Clone, PartialEq)]
pub struct ContactTimeQuantiles {
    pub quantiles: Vec<f64>,
    pub mean: Vec<SimTime>,
    pub std: Vec<SimTime>,
}

/// Everything a simulation produced, ready for evaluation
#[derive(Debug, Clone)]
pub struct SimulationResult {
    protocol_name: &'static str,
    adversary: Adversary,
    coverage_threshold: f64,
    runs: Vec<MessageRun>,
}

impl SimulationResult {
    pub fn protocol_name(&self) -> &'static str {
        self.protocol_name
    }

    pub fn network(&self) -> &Arc<Network> {
        self.adversary.network()
    }

    pub fn adversary(&self) -> &Adversary {
        &self.adversary
    }

    pub fn coverage_threshold(&self) -> f64 {
        self.coverage_threshold
    }

    pub fn runs(&self) -> &[MessageRun] {
        &self.runs
    }

    pub fn num_messages(&self) -> usize {
        self.runs.len()
    }

    pub fn message_sources(&self) -> Vec<NodeId> {
        self.runs.iter().map(|run| run.source).collect()
    }

    /// Fraction of the network reached by each message
    pub fn message_spread_ratios(&self) -> Vec<f64> {
        let node_count = self.network().num_nodes();
        self.runs
            .iter()
            .map(|run| run.trace.reached_ratio(node_count))
            .collect()
    }

    /// Arrival-time quantiles of every message, averaged across messages
    pub fn node_contact_time_quantiles(&self, quantiles: &[f64]) -> ContactTimeQuantiles {
        let per_message: Vec<Vec<SimTime>> = self
            .runs
            .iter()
            .map(|run| {
                let mut times = run.trace.arrival_times();
                times.sort_by(|a, b| a.total_cmp(b));
                quantiles.iter().map(|q| quantile(&times, *q)).collect()
            })
            .collect();

        let mut mean = Vec::with_capacity(quantiles.len());
        let mut std = Vec::with_capacity(quantiles.len());
        for idx in 0..quantiles.len() {
            let column: Vec<SimTime> = per_message.iter().map(|row| row[idx]).collect();
            let (m, s) = mean_and_std(&column);
            mean.push(m);
            std.push(s);
        }

        ContactTimeQuantiles {
            quantiles: quantiles.to_vec(),
            mean,
            std,
        }
    }
}

/// Linearly interpolated quantile of ascending `sorted` values
///
/// Uses position `q · (n - 1)`, so `q = 0` is the minimum and `q = 1` the
/// maximum. Empty input gives 0.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let position = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Mean and population standard deviation (0 for empty input)
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

// ============================================================================
// Simulator
// ============================================================================

/// Runs many independent messages through a protocol
///
/// Each message gets a private `StdRng` seeded from a value drawn up front
/// from the caller's rng, so the result does not depend on `workers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Simulator {
    workers: usize,
}

impl Default for Simulator {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

impl Simulator {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Simulate `message_count` messages from weighted-random sources
    ///
    /// Compromised nodes only observe, so they are never picked as sources
    /// (unless the adversary controls every node).
    pub fn run(
        &self,
        protocol: &dyn Protocol,
        adversary: &Adversary,
        message_count: usize,
        coverage_threshold: f64,
        rng: &mut StdRng,
    ) -> SimResult<SimulationResult> {
        if message_count == 0 {
            return Err(SimError::config("message_count", "must be at least 1"));
        }
        validate_coverage(coverage_threshold)?;

        let network = protocol.network();
        let sources: Vec<NodeId> = (0..message_count)
            .map(|_| network.sample_source_excluding(rng, |node| adversary.is_compromised(node)))
            .collect();

        self.run_sources(protocol, adversary, &sources, coverage_threshold, rng)
    }

    /// Simulate one message per entry of `sources`
    pub fn run_sources(
        &self,
        protocol: &dyn Protocol,
        adversary: &Adversary,
        sources: &[NodeId],
        coverage_threshold: f64,
        rng: &mut StdRng,
    ) -> SimResult<SimulationResult> {
        if sources.is_empty() {
            return Err(SimError::config("message_count", "must be at least 1"));
        }
        validate_coverage(coverage_threshold)?;
        if let Some(unknown) = sources.iter().find(|s| !protocol.network().contains(**s)) {
            return Err(SimError::UnknownNode(*unknown));
        }

        let jobs: Vec<(MessageId, NodeId, u64)> = sources
            .iter()
            .enumerate()
            .map(|(id, source)| (id, *source, rng.gen::<u64>()))
            .collect();

        log::info!(
            "simulating {} messages with {} ({} worker(s), coverage {:.2})",
            jobs.len(),
            protocol.name(),
            self.workers,
            coverage_threshold
        );

        let runs = if self.workers <= 1 || jobs.len() < 2 {
            run_jobs(protocol, adversary, &jobs, coverage_threshold)?
        } else {
            let chunk_size = (jobs.len() + self.workers - 1) / self.workers;
            std::thread::scope(|s| {
                let handles: Vec<_> = jobs
                    .chunks(chunk_size)
                    .map(|chunk| s.spawn(move || run_jobs(protocol, adversary, chunk, coverage_threshold)))
                    .collect();

                let mut runs = Vec::with_capacity(jobs.len());
                for handle in handles {
                    match handle.join() {
                        Ok(chunk_runs) => runs.extend(chunk_runs?),
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                }
                Ok::<_, SimError>(runs)
            })?
        };

        let reached: usize = runs.iter().map(|run| run.trace.len()).sum();
        log::debug!(
            "{} messages reached {:.1} nodes on average",
            runs.len(),
            reached as f64 / runs.len() as f64
        );

        Ok(SimulationResult {
            protocol_name: protocol.name(),
            adversary: adversary.clone(),
            coverage_threshold,
            runs,
        })
    }
}

fn validate_coverage(coverage_threshold: f64) -> SimResult<()> {
    if coverage_threshold > 0.0 && coverage_threshold <= 1.0 {
        Ok(())
    } else {
        Err(SimError::config(
            "coverage_threshold",
            format!("must be in (0, 1], got {}", coverage_threshold),
        ))
    }
}

fn run_jobs(
    protocol: &dyn Protocol,
    adversary: &Adversary,
    jobs: &[(MessageId, NodeId, u64)],
    coverage_threshold: f64,
) -> SimResult<Vec<MessageRun>> {
    jobs.iter()
        .map(|&(id, source, seed)| {
            let mut rng = StdRng::seed_from_u64(seed);
            let trace = protocol.propagate_until(source, adversary, coverage_threshold, &mut rng)?;
            Ok(MessageRun { id, source, trace })
        })
        .collect()
}
