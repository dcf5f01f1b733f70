use crate::ep_config::ExperimentConfig;
use crate::ep_error::SimResult;
use crate::ep_evaluator::{EvaluationReport, Evaluator, MetricRow};
use crate::ep_simulator::{SimulationResult, Simulator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Wires network, protocol, adversary, simulator and evaluator together
///
/// Each stage draws from its own rng derived from the master seed, so
/// changing one stage (say, the estimator list) leaves the others untouched.
#[derive(Debug, Clone)]
pub struct Experiment {
    config: ExperimentConfig,
    seed: u64,
}

/// Everything one experiment produced
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub name: String,
    pub seed: u64,
    pub result: SimulationResult,
    pub reports: Vec<EvaluationReport>,
}

impl ExperimentOutcome {
    pub fn rows(&self) -> Vec<MetricRow> {
        self.reports.iter().flat_map(|report| report.rows()).collect()
    }

    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║    PRIVACY EXPERIMENT RESULTS                          ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        let network = self.result.network();
        println!("Experiment: {}", self.name);
        println!("Seed: {}", self.seed);
        println!("Network: {} nodes, {} edges", network.num_nodes(), network.num_edges());
        println!("Protocol: {}", self.result.protocol_name());
        println!("{}", self.result.adversary());
        println!("Messages: {}", self.result.num_messages());
        println!();

        for report in &self.reports {
            report.print_summary();
        }
    }
}

impl Experiment {
    /// Validate the config and fix the master seed
    pub fn new(config: ExperimentConfig) -> SimResult<Self> {
        config.validate()?;
        let seed = config.resolve_seed();
        Ok(Self { config, seed })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn run(&self) -> SimResult<ExperimentOutcome> {
        let name = self.config.display_name();
        log::info!("running experiment `{}` (seed {})", name, self.seed);

        let network = Arc::new(self.config.network.build(self.seed)?);

        let mut protocol_rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        let protocol = self.config.protocol.build(network.clone(), &mut protocol_rng)?;

        let mut adversary_rng = StdRng::seed_from_u64(self.seed.wrapping_add(2));
        let adversary = self.config.adversary.build(network, &mut adversary_rng)?;

        let simulation = &self.config.simulation;
        let mut simulation_rng = StdRng::seed_from_u64(self.seed.wrapping_add(3));
        let result = Simulator::new(simulation.workers).run(
            protocol.as_ref(),
            &adversary,
            simulation.message_count,
            simulation.coverage_threshold,
            &mut simulation_rng,
        )?;

        let reports = self
            .config
            .evaluation
            .estimators
            .iter()
            .map(|estimator| {
                Evaluator::new(&result, *estimator)
                    .with_top_k(self.config.evaluation.top_k)?
                    .with_seed(self.seed.wrapping_add(4))
                    .report()
            })
            .collect::<SimResult<Vec<_>>>()?;

        Ok(ExperimentOutcome {
            name,
            seed: self.seed,
            result,
            reports,
        })
    }
}
