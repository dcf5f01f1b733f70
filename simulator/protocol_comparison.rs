// Protocol Comparison: how much does stemming hide the originator?
//
// Runs Broadcast, Dandelion and Dandelion++ over the SAME network, adversary
// and message sources, sweeping the stem probability. A passive adversary
// controlling 10% of the nodes tries all three estimators on every run.
//
// Expectation: Broadcast gives the adversary its best hit ratio; longer stems
// (higher stem probability) push first_sent and first_reach towards the
// dummy baseline at the cost of slower propagation.

use ep_rust::ep_interface::NodeId;
use ep_rust::{
    Adversary, AdversarySelection, AnonymityGraph, BroadcastMode, BroadcastProtocol,
    DandelionPlusPlusProtocol, DandelionProtocol, EdgeWeightGenerator, EdgeWeightKind, Estimator,
    Evaluator, Network, NodeWeightGenerator, NodeWeightKind, Protocol, Simulator, TopologyKind,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

const NODE_COUNT: usize = 1000;
const DEGREE: usize = 8;
const MESSAGES: usize = 500;
const SEED: u64 = 0x5eed;

fn evaluate(protocol: &dyn Protocol, adversary: &Adversary, sources: &[NodeId], label: &str) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let result = match Simulator::new(4).run_sources(protocol, adversary, sources, 1.0, &mut rng) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}: simulation failed: {}", label, e);
            return;
        }
    };

    let mut line = format!("{:<28}", label);
    for estimator in Estimator::ALL {
        match Evaluator::new(&result, estimator).report() {
            Ok(report) => line.push_str(&format!(" {:>8.3} {:>8.3}", report.hit_ratio, report.ndcg)),
            Err(e) => line.push_str(&format!(" error: {}", e)),
        }
    }

    let p50 = result.node_contact_time_quantiles(&[0.5]).mean[0];
    line.push_str(&format!(" {:>10.1}", p50));
    println!("{}", line);
}

fn print_in_degree(label: &str, graph: &AnonymityGraph, network: &Network) {
    let degrees: Vec<usize> = network.nodes().map(|node| graph.in_degree(node)).collect();
    let min = degrees.iter().copied().min().unwrap_or(0);
    let max = degrees.iter().copied().max().unwrap_or(0);
    let mean = degrees.iter().sum::<usize>() as f64 / degrees.len().max(1) as f64;
    println!("  {:<14} {:>4} / {:>5.2} / {:>4}", label, min, mean, max);
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .init()
        .unwrap();

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  PROTOCOL COMPARISON - Broadcast vs Dandelion(++)      ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let network = Network::generate(
        NODE_COUNT,
        DEGREE,
        TopologyKind::RandomRegular,
        &EdgeWeightGenerator::new(EdgeWeightKind::default()),
        &NodeWeightGenerator::new(NodeWeightKind::stake()),
        SEED,
    )
    .unwrap_or_else(|e| {
        eprintln!("Failed to generate network: {}", e);
        std::process::exit(1);
    });
    let network = Arc::new(network);
    println!("{}", network);
    if let Some(degree) = network.regularity() {
        println!("{}-regular overlay\n", degree);
    }

    let mut rng = StdRng::seed_from_u64(SEED);
    let adversary = Adversary::new(network.clone(), 0.1, AdversarySelection::Random, false, &mut rng)
        .unwrap_or_else(|e| {
            eprintln!("Failed to create adversary: {}", e);
            std::process::exit(1);
        });

    // identical sources for every protocol
    let sources: Vec<NodeId> = (0..MESSAGES)
        .map(|_| network.sample_source_excluding(&mut rng, |n| adversary.is_compromised(n)))
        .collect();

    println!(
        "{:<28} {:>17} {:>17} {:>17} {:>10}",
        "Protocol", "first_sent", "first_reach", "dummy", "p50 (ms)"
    );
    println!("{:<28} {:>17} {:>17} {:>17}", "", "hit    ndcg", "hit    ndcg", "hit    ndcg");
    println!("{}", "-".repeat(95));

    for mode in [BroadcastMode::All, BroadcastMode::Sqrt] {
        let broadcast = BroadcastProtocol::new(network.clone(), mode);
        evaluate(&broadcast, &adversary, &sources, &format!("Broadcast ({:?})", mode));
    }

    for stem_probability in [0.25, 0.5, 0.75, 0.9] {
        let mut graph_rng = StdRng::seed_from_u64(SEED + 1);
        match DandelionProtocol::new(network.clone(), stem_probability, BroadcastMode::All, &mut graph_rng) {
            Ok(dandelion) => evaluate(
                &dandelion,
                &adversary,
                &sources,
                &format!("Dandelion (p={})", stem_probability),
            ),
            Err(e) => eprintln!("Dandelion p={}: {}", stem_probability, e),
        }

        let mut graph_rng = StdRng::seed_from_u64(SEED + 1);
        match DandelionPlusPlusProtocol::new(network.clone(), stem_probability, BroadcastMode::All, &mut graph_rng) {
            Ok(dandelion_pp) => evaluate(
                &dandelion_pp,
                &adversary,
                &sources,
                &format!("Dandelion++ (p={})", stem_probability),
            ),
            Err(e) => eprintln!("Dandelion++ p={}: {}", stem_probability, e),
        }
    }

    println!("\n{}", "=".repeat(95));

    // stem load: how evenly the anonymity graph spreads incoming lines
    println!("\nAnonymity graph in-degree (min / mean / max):");
    let mut graph_rng = StdRng::seed_from_u64(SEED + 1);
    if let Ok(dandelion) = DandelionProtocol::new(network.clone(), 0.5, BroadcastMode::All, &mut graph_rng) {
        print_in_degree("Dandelion", dandelion.anonymity_graph(), &network);
    }
    let mut graph_rng = StdRng::seed_from_u64(SEED + 1);
    if let Ok(dandelion_pp) = DandelionPlusPlusProtocol::new(network.clone(), 0.5, BroadcastMode::All, &mut graph_rng) {
        print_in_degree("Dandelion++", dandelion_pp.anonymity_graph(), &network);
    }

    println!("\n✓ Comparison complete!\n");
}
