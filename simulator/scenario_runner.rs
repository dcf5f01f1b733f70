// Scenario Runner - Load and execute experiment YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/dandelion_baseline.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/active_adversary.yaml --seed 1234
//   cargo run --bin scenario_runner scenarios/ --rows   (also dump flat metric rows as YAML)

use ep_rust::{Experiment, ExperimentConfig};
use simple_logger::SimpleLogger;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

struct RunnerArgs {
    path: PathBuf,
    seed: Option<u64>,
    rows: bool,
}

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .env()
        .init()
        .unwrap();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <experiment.yaml | directory/> [--seed SEED] [--rows]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/dandelion_baseline.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/active_adversary.yaml --seed 1234", args[0]);
        std::process::exit(1);
    }

    let runner_args = parse_args(&args);
    let path = runner_args.path.as_path();

    if path.is_file() {
        run_scenario_file(path, &runner_args);
    } else if path.is_dir() {
        run_scenario_directory(path, &runner_args);
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    }
}

fn parse_args(args: &[String]) -> RunnerArgs {
    let mut runner_args = RunnerArgs {
        path: PathBuf::from(&args[1]),
        seed: None,
        rows: false,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                runner_args.seed = Some(args[i + 1].parse().unwrap_or_else(|e| {
                    eprintln!("Invalid seed {}: {}", args[i + 1], e);
                    std::process::exit(1);
                }));
                i += 2;
            }
            "--rows" => {
                runner_args.rows = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    runner_args
}

fn run_scenario_directory(dir: &Path, runner_args: &RunnerArgs) {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let extension = path.extension().and_then(|s| s.to_str());
            if extension == Some("yaml") || extension == Some("yml") {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        std::process::exit(1);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  SCENARIO RUNNER - Multiple Experiments                ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} experiment(s) to run\n", scenarios.len());

    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        run_scenario_file(scenario_path, runner_args);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All experiments complete!                             ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
}

fn run_scenario_file(path: &Path, runner_args: &RunnerArgs) {
    println!("Loading experiment from: {}", path.display());

    let yaml_content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let mut config = ExperimentConfig::from_yaml_str(&yaml_content).unwrap_or_else(|e| {
        eprintln!("Failed to load {}: {}", path.display(), e);
        std::process::exit(1);
    });

    // command line seed wins over the file
    if runner_args.seed.is_some() {
        config.seed = runner_args.seed;
    }

    if let Some(ref desc) = config.description {
        println!("{}\n", desc);
    }

    println!("Configuration:");
    println!(
        "  Network: {} nodes, degree {}, {:?}",
        config.network.node_count, config.network.degree, config.network.topology_kind
    );
    println!(
        "  Protocol: {:?} (stem p={}, {:?})",
        config.protocol.kind, config.protocol.stem_probability, config.protocol.broadcast_mode
    );
    println!(
        "  Adversary: {:.0}% {:?}, active={}",
        config.adversary.ratio * 100.0,
        config.adversary.selection,
        config.adversary.active
    );
    println!(
        "  Messages: {} (coverage {:.0}%)",
        config.simulation.message_count,
        config.simulation.coverage_threshold * 100.0
    );
    println!("\nStarting simulation...\n");

    let outcome = Experiment::new(config)
        .and_then(|experiment| experiment.run())
        .unwrap_or_else(|e| {
            eprintln!("Experiment {} failed: {}", path.display(), e);
            std::process::exit(1);
        });

    outcome.print_summary();

    if runner_args.rows {
        match serde_yaml::to_string(&outcome.rows()) {
            Ok(rows) => println!("{}", rows),
            Err(e) => eprintln!("Failed to serialise metric rows: {}", e),
        }
    }

    println!("\n✓ Experiment complete (seed {})\n", outcome.seed);
}
