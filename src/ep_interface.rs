// all node identifiers share one numeric type, as in an edge list
pub type NodeId = u64;

/// Connection delay between two adjacent nodes (milliseconds)
pub type Latency = f64;

/// Simulated clock value (milliseconds since the message was created)
pub type SimTime = f64;

/// Messages are numbered by their run index within a simulation
pub type MessageId = usize;

// ============================================================================
// Simulation Constants
// ============================================================================

/// Fraction of nodes that must hold a message before its run stops
pub const DEFAULT_COVERAGE_THRESHOLD: f64 = 0.9;

/// Hard cap on consecutive stem hops before a forced fluff
pub const DEFAULT_MAX_STEM_HOPS: u32 = 10;

/// Outbound anonymity lines per node in Dandelion++ (quasi-4-regular graph)
pub const DANDELION_PP_LINES: usize = 2;

/// Number of attempts at sampling a connected topology before giving up
pub const MAX_TOPOLOGY_ATTEMPTS: usize = 100;

/// Node contact-time quantiles reported by the evaluator (deciles)
pub const CONTACT_TIME_QUANTILES: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

// p2p latency statistics (mean / std-dev in ms) measured on the Bitcoin network
pub const NORMAL_LATENCY_MEAN: Latency = 171.0;
pub const NORMAL_LATENCY_STD_DEV: Latency = 76.0;

/// Upper bound for uniformly drawn latencies (ms)
pub const UNIFORM_LATENCY_MAX: Latency = 1000.0;

/// Pareto shape giving the 80/20 stake concentration
pub const STAKE_PARETO_SHAPE: f64 = 1.16;
