use log::info;
use rand::Rng;
use simple_logger::SimpleLogger;

use ep_rust::{BroadcastMode, Experiment, ExperimentConfig, ProtocolKind};

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    info!("starting");

    let seed: u64 = rand::thread_rng().gen();

    // same network and adversary for every protocol, only the spread differs
    let protocols = [
        (ProtocolKind::Broadcast, BroadcastMode::All),
        (ProtocolKind::Broadcast, BroadcastMode::Sqrt),
        (ProtocolKind::Dandelion, BroadcastMode::All),
        (ProtocolKind::DandelionPlusPlus, BroadcastMode::All),
    ];

    for (kind, mode) in protocols {
        let mut config = ExperimentConfig::default();
        config.seed = Some(seed);
        config.network.node_count = 500;
        config.network.degree = 8;
        config.protocol.kind = kind;
        config.protocol.broadcast_mode = mode;
        config.simulation.message_count = 200;
        config.simulation.workers = 4;

        let outcome = match Experiment::new(config).and_then(|experiment| experiment.run()) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("experiment failed: {}", e);
                std::process::exit(1);
            }
        };

        for report in &outcome.reports {
            info!(
                "{:<12} {:?}  {:<11} hit={:.3} ndcg={:.3} entropy={:.2}",
                report.protocol,
                mode,
                report.estimator.to_string(),
                report.hit_ratio,
                report.ndcg,
                report.entropy
            );
        }
    }

    info!("done (seed {})", seed);
}
