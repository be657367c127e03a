//! Fan-out of independent replications over a thread pool

use des::parallel::{ParallelRunner, simple_progress_reporter};
use tracing::info;

use crate::config::Scenario;
use crate::engine::{Replication, ReplicationResult};

/// Run every replication of `scenario`, results in replication order
///
/// Each replication gets its own seed from [`Scenario::replication_seed`], so
/// the output does not depend on the number of threads.
pub fn run_replications(scenario: &Scenario) -> Vec<Result<ReplicationResult, String>> {
    info!(
        model = %scenario.model.kendall(),
        replications = scenario.replications,
        customers = scenario.model.customers,
        "running replications"
    );

    let mut runner = ParallelRunner::new(scenario.replications, |index| {
        Replication::new(
            &scenario.model,
            index,
            scenario.replication_seed(index),
            scenario.verbose,
        )
        .into_event_loop()
    })
    .progress(simple_progress_reporter((scenario.replications / 10).max(1)));
    if let Some(n) = scenario.threads {
        runner = runner.num_threads(n);
    }

    runner
        .run()
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| {
            let stats = outcome?;
            ReplicationResult::from_stats(
                index,
                scenario.replication_seed(index),
                scenario.model.customers,
                &stats,
            )
            .map_err(|e| e.to_string())
        })
        .collect()
}

/// Wait-time sequences of the successful replications, by replication index
pub fn wait_matrix(results: &[Result<ReplicationResult, String>]) -> Vec<Vec<f64>> {
    let mut ok: Vec<&ReplicationResult> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    ok.sort_by_key(|r| r.index);
    ok.into_iter().map(|r| r.wait_times.clone()).collect()
}
