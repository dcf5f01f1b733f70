use ep_rust::{
    Adversary, BroadcastMode, BroadcastProtocol, DandelionPlusPlusProtocol, DandelionProtocol,
    EdgeWeightGenerator, EdgeWeightKind, Network, NodeWeightGenerator, NodeWeightKind, Protocol,
    TopologyKind,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;

/// Benchmark single-message propagation cost per protocol and network size
fn main() {
    std::env::set_var("RUST_LOG", "error");
    let _ = simple_logger::init();

    println!("\n=== Propagation Benchmark (single message) ===\n");

    let sizes = vec![(100, 4), (1_000, 8), (10_000, 8), (50_000, 16)];

    println!(
        "{:<28} {:>10} {:>12} {:>15}",
        "Protocol", "Nodes", "Time (ms)", "Messages/s"
    );
    println!("{}", "-".repeat(70));

    for (node_count, degree) in sizes {
        let network = match Network::generate(
            node_count,
            degree,
            TopologyKind::RandomRegular,
            &EdgeWeightGenerator::new(EdgeWeightKind::default()),
            &NodeWeightGenerator::new(NodeWeightKind::Uniform),
            1,
        ) {
            Ok(network) => Arc::new(network),
            Err(e) => {
                eprintln!("n={} d={}: {}", node_count, degree, e);
                continue;
            }
        };

        let adversary = match Adversary::with_nodes(network.clone(), &[], false) {
            Ok(adversary) => adversary,
            Err(e) => {
                eprintln!("adversary: {}", e);
                continue;
            }
        };

        let mut rng = StdRng::seed_from_u64(2);
        let mut protocols: Vec<(String, Box<dyn Protocol>)> = vec![
            (
                "Broadcast (All)".to_string(),
                Box::new(BroadcastProtocol::new(network.clone(), BroadcastMode::All)),
            ),
            (
                "Broadcast (Sqrt)".to_string(),
                Box::new(BroadcastProtocol::new(network.clone(), BroadcastMode::Sqrt)),
            ),
        ];
        if let Ok(dandelion) = DandelionProtocol::new(network.clone(), 0.9, BroadcastMode::All, &mut rng) {
            protocols.push(("Dandelion (p=0.9)".to_string(), Box::new(dandelion)));
        }
        if let Ok(dandelion_pp) =
            DandelionPlusPlusProtocol::new(network.clone(), 0.9, BroadcastMode::All, &mut rng)
        {
            protocols.push(("Dandelion++ (p=0.9)".to_string(), Box::new(dandelion_pp)));
        }

        for (name, protocol) in &protocols {
            // Warm-up
            let _ = protocol.propagate(0, &adversary, &mut rng);

            let samples = 20;
            let start = Instant::now();
            for i in 0..samples {
                let source = (i * 7919 % node_count) as u64;
                let _ = protocol.propagate(source, &adversary, &mut rng);
            }
            let avg_time_ms = start.elapsed().as_secs_f64() * 1000.0 / samples as f64;

            println!(
                "{:<28} {:>10} {:>12.3} {:>15.0}",
                name,
                node_count,
                avg_time_ms,
                1000.0 / avg_time_ms
            );
        }
    }

    println!("\n{}", "=".repeat(70));
}
