//! Queue waiting-time simulator
//!
//! Usage:
//!   cargo run --release --bin queue_sim -- [experiments/mm2_sjf.toml]
//!
//! Without a path the built-in defaults are used (M/M/1 FIFO, 100 x 500
//! customers). Set `RUST_LOG=debug` for per-replication logging.

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use queue_sim::{SimConfig, run_replications, wait_matrix};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => SimConfig::from_path(path),
        None => Ok(SimConfig::default()),
    };
    let scenario = match config.and_then(|c| c.validate()) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("=== Queue Simulation: {} ===", scenario.model.kendall());
    println!("Customers per replication: {}", scenario.model.customers);
    println!("Replications: {}", scenario.replications);
    println!("Offered load per server: {:.3}", scenario.load());
    println!();

    let start = Instant::now();
    let results = run_replications(&scenario);
    let elapsed = start.elapsed();

    for result in &results {
        match result {
            Ok(r) => println!(
                "Replication {:>4}: served {:>6}, mean wait {:>9.4}, max wait {:>9.4}",
                r.index,
                r.completed,
                r.mean_wait().unwrap_or(0.0),
                r.max_wait().unwrap_or(0.0)
            ),
            Err(e) => println!("Replication failed: {e}"),
        }
    }

    let waits = wait_matrix(&results);
    let all: Vec<f64> = waits.iter().flatten().copied().collect();
    println!();
    println!("=== Summary ===");
    println!("Successful: {}/{}", waits.len(), results.len());
    if !all.is_empty() {
        println!(
            "Mean wait over all customers: {:.4}",
            all.iter().sum::<f64>() / all.len() as f64
        );
    }
    println!("Elapsed: {:.2}s", elapsed.as_secs_f64());

    if waits.len() == results.len() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
