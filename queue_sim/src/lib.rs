//! Waiting-time estimation for M/M/c, M/D/c and M/H2/c queues.
//!
//! Each replication is a `des::EventLoop` with two agents: an
//! [`ArrivalProcess`] that generates customers and a [`ResourcePool`] of
//! identical servers that admits them under FIFO or shortest-job-first.
//! Replications are independent and fan out over a thread pool.

pub mod arrivals;
pub mod config;
pub mod engine;
pub mod error;
pub mod pool;
pub mod process;
pub mod runner;

pub use arrivals::{ArrivalProcess, ArrivalStats};
pub use config::{Scenario, SimConfig};
pub use engine::{Model, Phase, Replication, ReplicationResult};
pub use error::{ConfigError, SimError};
pub use pool::{Discipline, PoolStats, ResourcePool};
pub use process::Process;
pub use runner::{run_replications, wait_matrix};

/// A customer, created when it arrives
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Customer {
    pub id: usize,
    pub arrival_t: f64,
    /// Sampled at arrival; also the priority key under SJF
    pub service_duration: f64,
}

/// A customer handed a server at `start_t`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    pub customer: Customer,
    pub start_t: f64,
}

impl Admission {
    pub fn new(customer: Customer, start_t: f64) -> Admission {
        Admission { customer, start_t }
    }

    pub fn wait(&self) -> f64 {
        self.start_t - self.customer.arrival_t
    }

    pub fn end_t(&self) -> f64 {
        self.start_t + self.customer.service_duration
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Kick off the arrival process
    Start,
    /// Customer with this ordinal arrives
    Arrival(usize),
    /// Arrived customer asks the pool for a server
    Request(Customer),
    /// Hand free servers to waiting customers
    Dispatch,
    ServiceStart(Admission),
    ServiceComplete(Admission),
}

#[derive(Debug, Clone)]
pub enum Stats {
    Arrivals(ArrivalStats),
    Pool(PoolStats),
}

impl Stats {
    pub fn as_pool(&self) -> Option<&PoolStats> {
        match self {
            Stats::Pool(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_arrivals(&self) -> Option<&ArrivalStats> {
        match self {
            Stats::Arrivals(a) => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_wait_and_end() {
        let customer = Customer {
            id: 3,
            arrival_t: 2.0,
            service_duration: 5.0,
        };
        let admission = Admission::new(customer, 10.0);
        assert_eq!(admission.wait(), 8.0);
        assert_eq!(admission.end_t(), 15.0);
    }
}
