//! One replication: an event loop holding an arrival process and a pool
//!
//! The loop is single-threaded and runs until its event queue is empty, at
//! which point every customer has been served.

use des::{Agent, EventLoop};
use tracing::{debug, info};

use crate::arrivals::ArrivalProcess;
use crate::error::SimError;
use crate::pool::{Discipline, ResourcePool};
use crate::process::Process;
use crate::{Customer, Event, Stats};

/// The queueing system being simulated
#[derive(Debug, Clone, Copy)]
pub struct Model {
    pub customers: usize,
    pub servers: usize,
    pub discipline: Discipline,
    /// Already scaled by the number of servers
    pub inter_arrival: Process,
    pub service: Process,
}

impl Model {
    /// e.g. `M/H2/3 SJF`
    pub fn kendall(&self) -> String {
        format!(
            "{}/{}/{} {}",
            self.inter_arrival.kendall(),
            self.service.kendall(),
            self.servers,
            self.discipline
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Customers still to arrive
    Running,
    /// Everyone has arrived, some still waiting or in service
    Draining,
    Done,
}

impl Phase {
    pub fn from_counts(customers: usize, arrived: usize, completed: usize) -> Phase {
        if arrived < customers {
            Phase::Running
        } else if completed < customers {
            Phase::Draining
        } else {
            Phase::Done
        }
    }
}

/// Observer installed on every replication loop
///
/// Follows the phase of the replication and, when verbose, logs each
/// customer's arrival, admission and departure.
struct Tracer {
    replication: usize,
    customers: usize,
    requested: usize,
    completed: usize,
    phase: Phase,
    verbose: bool,
}

impl Tracer {
    fn new(replication: usize, customers: usize, verbose: bool) -> Tracer {
        Tracer {
            replication,
            customers,
            requested: 0,
            completed: 0,
            phase: Phase::from_counts(customers, 0, 0),
            verbose,
        }
    }

    fn observe(&mut self, t: f64, event: &Event) {
        match event {
            Event::Request(customer) => {
                self.requested += 1;
                if self.verbose {
                    info!(replication = self.replication, customer = customer.id, "{t:7.4} arrived");
                }
            }
            Event::ServiceStart(admission) => {
                if self.verbose {
                    info!(
                        replication = self.replication,
                        customer = admission.customer.id,
                        "{t:7.4} waited {:6.3}",
                        admission.wait()
                    );
                }
            }
            Event::ServiceComplete(admission) => {
                self.completed += 1;
                if self.verbose {
                    info!(replication = self.replication, customer = admission.customer.id, "{t:7.4} finished");
                }
            }
            _ => {}
        }

        let phase = Phase::from_counts(self.customers, self.requested, self.completed);
        if phase != self.phase {
            debug!(replication = self.replication, t, from = ?self.phase, to = ?phase, "phase change");
            self.phase = phase;
        }
    }
}

/// Wait times of one replication
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationResult {
    pub index: usize,
    pub seed: u64,
    /// One per customer, in order of admission to a server
    pub wait_times: Vec<f64>,
    pub admission_order: Vec<usize>,
    pub completed: usize,
    pub busy_time: f64,
    pub end_t: f64,
}

impl ReplicationResult {
    /// Collect the result from agent stats, checking every customer was served
    pub fn from_stats(
        index: usize,
        seed: u64,
        customers: usize,
        stats: &[Stats],
    ) -> Result<ReplicationResult, SimError> {
        let pool = stats
            .iter()
            .find_map(Stats::as_pool)
            .ok_or(SimError::MissingPoolStats)?;

        if pool.total_completed != customers || pool.wait_times.len() != customers {
            return Err(SimError::Incomplete {
                expected: customers,
                completed: pool.total_completed,
            });
        }

        Ok(ReplicationResult {
            index,
            seed,
            wait_times: pool.wait_times.clone(),
            admission_order: pool.admission_order.clone(),
            completed: pool.total_completed,
            busy_time: pool.busy_time,
            end_t: pool.last_completion_t,
        })
    }

    pub fn mean_wait(&self) -> Option<f64> {
        if self.wait_times.is_empty() {
            return None;
        }
        Some(self.wait_times.iter().sum::<f64>() / self.wait_times.len() as f64)
    }

    pub fn max_wait(&self) -> Option<f64> {
        self.wait_times.iter().copied().reduce(f64::max)
    }
}

/// A single, independent run of the model
pub struct Replication {
    index: usize,
    seed: u64,
    customers: usize,
    event_loop: EventLoop<Event, Stats>,
}

impl Replication {
    /// Arrivals drawn from `model` with a random stream seeded by `seed`
    pub fn new(model: &Model, index: usize, seed: u64, verbose: bool) -> Replication {
        let agents: Vec<Box<dyn Agent<Event, Stats>>> = vec![
            Box::new(ArrivalProcess::new(
                model.customers,
                model.inter_arrival,
                model.service,
                seed,
            )),
            Box::new(ResourcePool::new(model.servers, model.discipline)),
        ];
        let mut tracer = Tracer::new(index, model.customers, verbose);
        let event_loop = EventLoop::new(vec![(0.0, Event::Start)], agents)
            .with_observer(move |t, event| tracer.observe(t, event));

        Replication {
            index,
            seed,
            customers: model.customers,
            event_loop,
        }
    }

    /// Replay fixed `(arrival time, service duration)` pairs through a pool
    ///
    /// No randomness is involved; customer ids follow the order of `trace`.
    pub fn from_trace(servers: usize, discipline: Discipline, trace: &[(f64, f64)]) -> Replication {
        let events = trace
            .iter()
            .enumerate()
            .map(|(id, &(arrival_t, service_duration))| {
                (
                    arrival_t,
                    Event::Request(Customer {
                        id,
                        arrival_t,
                        service_duration,
                    }),
                )
            })
            .collect();
        let agents: Vec<Box<dyn Agent<Event, Stats>>> =
            vec![Box::new(ResourcePool::new(servers, discipline))];
        let mut tracer = Tracer::new(0, trace.len(), false);
        let event_loop =
            EventLoop::new(events, agents).with_observer(move |t, event| tracer.observe(t, event));

        Replication {
            index: 0,
            seed: 0,
            customers: trace.len(),
            event_loop,
        }
    }

    pub fn into_event_loop(self) -> EventLoop<Event, Stats> {
        self.event_loop
    }

    pub fn run(mut self) -> Result<ReplicationResult, SimError> {
        self.event_loop.run()?;
        debug!(
            replication = self.index,
            events = self.event_loop.dispatched(),
            t = self.event_loop.current_t(),
            "replication done"
        );
        ReplicationResult::from_stats(
            self.index,
            self.seed,
            self.customers,
            &self.event_loop.stats(),
        )
    }
}
