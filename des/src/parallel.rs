//! Parallel execution of independent EventLoop scenarios
//!
//! Each scenario gets a fresh [`EventLoop`] from a builder closure, runs it
//! until its queue drains, and reports the stats of every agent. Scenarios
//! share nothing, so they are spread over a rayon thread pool and joined at
//! the end.
//!
//! # Example
//!
//! ```rust
//! use des::parallel::{ParallelRunner, simple_progress_reporter};
//! # use des::{Agent, EventLoop};
//! # struct TestAgent;
//! # impl Agent<u8, usize> for TestAgent {
//! #     fn stats(&self) -> usize { 1 }
//! # }
//!
//! let results = ParallelRunner::new(100, |scenario_id| {
//!     let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(TestAgent)];
//!     EventLoop::new(vec![(scenario_id as f64, 1)], agents)
//! })
//! .progress(simple_progress_reporter(10))
//! .num_threads(8)
//! .run();
//!
//! assert_eq!(results.len(), 100);
//! ```
//!
//! # Determinism
//!
//! Results are deterministic when:
//! 1. Builder function uses `scenario_id` to derive unique seeds
//! 2. Agents use seeded RNGs (e.g., `StdRng::seed_from_u64(seed)`)
//! 3. No shared mutable state across scenarios
//!
//! Running the same scenarios twice produces identical results regardless of
//! execution order or thread count.
//!
//! # Error Handling
//!
//! Panics and scheduling errors in individual scenarios are returned as
//! `Err(String)`. Other scenarios continue executing normally.

use crate::EventLoop;
use rayon::prelude::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Executes multiple EventLoop scenarios in parallel
///
/// The builder `F` takes a scenario id and returns a fresh EventLoop. It is
/// called on worker threads, so it must be `Send + Sync`; the loop itself
/// never crosses threads.
pub struct ParallelRunner<T, S, F>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    num_scenarios: usize,
    builder: F,
    num_threads: Option<usize>,
    progress_callback: Option<Arc<dyn Fn(usize, usize) + Send + Sync>>,
    _marker: PhantomData<fn() -> (T, S)>,
}

impl<T, S, F> ParallelRunner<T, S, F>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    pub fn new(num_scenarios: usize, builder: F) -> Self {
        ParallelRunner {
            num_scenarios,
            builder,
            num_threads: None,
            progress_callback: None,
            _marker: PhantomData,
        }
    }

    /// Set number of threads (defaults to rayon's global pool)
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Set progress callback, called with `(completed, total)` after each scenario
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    fn run_one(&self, scenario_id: usize) -> Result<Vec<S>, String> {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut event_loop = (self.builder)(scenario_id);
            event_loop.run().map(|()| event_loop.stats())
        }));

        match result {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => {
                if let Some(s) = panic.downcast_ref::<&str>() {
                    Err(s.to_string())
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    Err(s.clone())
                } else {
                    Err("Unknown panic".to_string())
                }
            }
        }
    }

    /// Execute all scenarios to completion and return results in scenario_id order
    pub fn run(self) -> Vec<Result<Vec<S>, String>> {
        let progress_counter = AtomicUsize::new(0);

        let pool = match self.num_threads {
            Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(error = %e, "could not build thread pool, using global pool");
                    None
                }
            },
            None => None,
        };

        let execute = || {
            (0..self.num_scenarios)
                .into_par_iter()
                .map(|scenario_id| {
                    let result = self.run_one(scenario_id);
                    if let Err(e) = &result {
                        warn!(scenario_id, error = %e, "scenario failed");
                    }

                    let completed = progress_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(completed, self.num_scenarios);
                    }
                    result
                })
                .collect()
        };

        if let Some(pool) = pool {
            pool.install(execute)
        } else {
            execute()
        }
    }
}

/// Run scenarios in parallel with simple API
pub fn run_parallel<T, S, F>(num_scenarios: usize, builder: F) -> Vec<Result<Vec<S>, String>>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    ParallelRunner::new(num_scenarios, builder).run()
}

/// Run scenarios in batches to limit memory usage
///
/// At most `batch_size` scenarios are alive at once. Results are still
/// returned in scenario_id order.
pub fn run_batched<T, S, F>(
    num_scenarios: usize,
    batch_size: usize,
    builder: F,
) -> Vec<Result<Vec<S>, String>>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    let mut all_results = Vec::with_capacity(num_scenarios);

    for batch_start in (0..num_scenarios).step_by(batch_size.max(1)) {
        let batch_end = (batch_start + batch_size.max(1)).min(num_scenarios);
        let batch_results = run_parallel(batch_end - batch_start, |local_id| {
            builder(batch_start + local_id)
        });
        all_results.extend(batch_results);
    }

    all_results
}

/// Progress callback that logs every `interval` completed scenarios
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            info!("Completed {}/{} scenarios", completed, total);
        }
    }
}
