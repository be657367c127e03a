//! FIFO against SJF across service distributions
//!
//! Builds each scenario's event loops directly and fans them out with
//! `des::parallel`, reading the pool stats back out of every replication.
//!
//! Run with:
//!   cargo run --release --example discipline_sweep -p queue_sim

use des::parallel::{ParallelRunner, run_batched, simple_progress_reporter};
use queue_sim::{Discipline, Model, Process, Replication, Stats};

const CUSTOMERS: usize = 2_000;
const REPLICATIONS: usize = 40;
const SEED: u64 = 42;

fn mean_wait(results: &[Result<Vec<Stats>, String>]) -> (f64, f64) {
    let pools: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .filter_map(|stats| stats.iter().find_map(Stats::as_pool).cloned())
        .collect();

    let waits: Vec<f64> = pools.iter().flat_map(|p| p.wait_times.iter().copied()).collect();
    let utilization = pools.iter().map(|p| p.busy_fraction()).sum::<f64>() / pools.len() as f64;
    (waits.iter().sum::<f64>() / waits.len() as f64, utilization)
}

fn main() {
    println!("=== FIFO vs SJF, {REPLICATIONS} x {CUSTOMERS} customers, load 0.8 ===\n");

    let services = [
        Process::exponential(1.6),
        Process::deterministic(1.6),
        Process::hyperexponential(),
    ];

    for service in services {
        let Ok(service) = service else {
            continue;
        };
        // H2 has mean 2, so keep the load at 0.8 for it too
        let Ok(inter_arrival) = Process::exponential(service.mean() / 0.8) else {
            continue;
        };

        for discipline in [Discipline::Fifo, Discipline::Sjf] {
            let model = Model {
                customers: CUSTOMERS,
                servers: 1,
                discipline,
                inter_arrival,
                service,
            };
            let start = std::time::Instant::now();
            let results = ParallelRunner::new(REPLICATIONS, |i| {
                Replication::new(&model, i, SEED + i as u64, false).into_event_loop()
            })
            .progress(simple_progress_reporter(REPLICATIONS / 2))
            .run();

            let (wait, utilization) = mean_wait(&results);
            println!(
                "{:<12} mean wait {:>8.4}  utilization {:.3}  ({:.2}s)",
                model.kendall(),
                wait,
                utilization,
                start.elapsed().as_secs_f64()
            );
        }
    }

    // Batching bounds how many loops are alive at once
    println!("\nM/M/4 SJF in batches of 8:");
    let Ok(model) = Process::exponential(0.5).and_then(|inter_arrival| {
        Ok(Model {
            customers: CUSTOMERS,
            servers: 4,
            discipline: Discipline::Sjf,
            inter_arrival,
            service: Process::exponential(1.6)?,
        })
    }) else {
        return;
    };
    let results = run_batched(REPLICATIONS, 8, |i| {
        Replication::new(&model, i, SEED + i as u64, false).into_event_loop()
    });
    let (wait, utilization) = mean_wait(&results);
    println!("{:<12} mean wait {:>8.4}  utilization {:.3}", model.kendall(), wait, utilization);
}
