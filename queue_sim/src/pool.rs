use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::str::FromStr;

use des::Response;

use crate::error::ConfigError;
use crate::{Admission, Customer, Event, Stats};

/// Rule for choosing which waiting customer gets the next free server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    Fifo,
    /// Shortest job first, ties broken by arrival order
    Sjf,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Fifo => write!(f, "FIFO"),
            Discipline::Sjf => write!(f, "SJF"),
        }
    }
}

impl FromStr for Discipline {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIFO" => Ok(Discipline::Fifo),
            "SJF" => Ok(Discipline::Sjf),
            _ => Err(ConfigError::Unsupported {
                option: "discipline",
                value: s.to_string(),
            }),
        }
    }
}

struct ShortestFirst {
    seq: u64,
    customer: Customer,
}

impl PartialEq for ShortestFirst {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ShortestFirst {}

impl Ord for ShortestFirst {
    // reversed: BinaryHeap pops the maximum
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .customer
            .service_duration
            .total_cmp(&self.customer.service_duration)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ShortestFirst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

enum WaitingLine {
    Fifo(VecDeque<Customer>),
    Sjf {
        heap: BinaryHeap<ShortestFirst>,
        next_seq: u64,
    },
}

impl WaitingLine {
    fn new(discipline: Discipline) -> WaitingLine {
        match discipline {
            Discipline::Fifo => WaitingLine::Fifo(VecDeque::new()),
            Discipline::Sjf => WaitingLine::Sjf {
                heap: BinaryHeap::new(),
                next_seq: 0,
            },
        }
    }

    fn push(&mut self, customer: Customer) {
        match self {
            WaitingLine::Fifo(queue) => queue.push_back(customer),
            WaitingLine::Sjf { heap, next_seq } => {
                heap.push(ShortestFirst {
                    seq: *next_seq,
                    customer,
                });
                *next_seq += 1;
            }
        }
    }

    fn pop(&mut self) -> Option<Customer> {
        match self {
            WaitingLine::Fifo(queue) => queue.pop_front(),
            WaitingLine::Sjf { heap, .. } => heap.pop().map(|entry| entry.customer),
        }
    }

    fn len(&self) -> usize {
        match self {
            WaitingLine::Fifo(queue) => queue.len(),
            WaitingLine::Sjf { heap, .. } => heap.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolStats {
    pub capacity: usize,
    pub discipline: Discipline,

    // Current state
    pub current_occupancy: usize,
    pub current_queue_length: usize,

    // Cumulative metrics
    pub total_requests: usize,
    pub total_started: usize,
    pub total_completed: usize,
    pub busy_time: f64,
    pub last_completion_t: f64,

    // Per-customer, in order of admission
    pub wait_times: Vec<f64>,
    pub admission_order: Vec<usize>,
}

impl PoolStats {
    pub fn new(capacity: usize, discipline: Discipline) -> Self {
        PoolStats {
            capacity,
            discipline,
            current_occupancy: 0,
            current_queue_length: 0,
            total_requests: 0,
            total_started: 0,
            total_completed: 0,
            busy_time: 0.0,
            last_completion_t: 0.0,
            wait_times: Vec::new(),
            admission_order: Vec::new(),
        }
    }

    pub fn is_at_capacity(&self) -> bool {
        self.current_occupancy >= self.capacity
    }

    pub fn has_queue(&self) -> bool {
        self.current_queue_length > 0
    }

    /// Fraction of servers currently busy
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.current_occupancy as f64 / self.capacity as f64
    }

    /// Share of server time spent serving, from 0 to the last departure
    pub fn busy_fraction(&self) -> f64 {
        if self.capacity == 0 || self.last_completion_t <= 0.0 {
            return 0.0;
        }
        self.busy_time / (self.capacity as f64 * self.last_completion_t)
    }

    pub fn mean_wait(&self) -> Option<f64> {
        if self.wait_times.is_empty() {
            return None;
        }
        Some(self.wait_times.iter().sum::<f64>() / self.wait_times.len() as f64)
    }

    /// Customers that never waited
    pub fn immediate_admissions(&self) -> usize {
        self.wait_times.iter().filter(|w| **w == 0.0).count()
    }
}

/// `capacity` identical servers plus a waiting line ordered by discipline
pub struct ResourcePool {
    capacity: usize,
    occupancy: usize,
    waiting: WaitingLine,
    stats: PoolStats,
}

impl ResourcePool {
    pub fn new(capacity: usize, discipline: Discipline) -> ResourcePool {
        ResourcePool {
            capacity,
            occupancy: 0,
            waiting: WaitingLine::new(discipline),
            stats: PoolStats::new(capacity, discipline),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn has_free_server(&self) -> bool {
        self.occupancy < self.capacity
    }

    /// Seize a server now if one is free and nobody is waiting, else join the line
    ///
    /// Returns the customer when it was admitted immediately.
    pub fn request(&mut self, customer: Customer) -> Option<Customer> {
        if self.has_free_server() && self.waiting.len() == 0 {
            self.occupancy += 1;
            return Some(customer);
        }
        self.waiting.push(customer);
        None
    }

    /// Join the waiting line without trying for a server
    pub fn enqueue(&mut self, customer: Customer) {
        self.waiting.push(customer);
    }

    /// Hand a free server to the head of the waiting line
    pub fn admit_next(&mut self) -> Option<Customer> {
        if !self.has_free_server() {
            return None;
        }
        let customer = self.waiting.pop()?;
        self.occupancy += 1;
        Some(customer)
    }

    /// Free one server and admit the next waiter, if any
    pub fn release(&mut self) -> Option<Customer> {
        debug_assert!(self.occupancy > 0, "release with no busy server");
        self.occupancy = self.occupancy.saturating_sub(1);
        self.admit_next()
    }

    fn start_all(&mut self, current_t: f64) -> Vec<(f64, Event)> {
        let mut events = Vec::new();
        while let Some(customer) = self.admit_next() {
            events.push((
                current_t,
                Event::ServiceStart(Admission::new(customer, current_t)),
            ));
        }
        events
    }
}

impl des::Agent<Event, Stats> for ResourcePool {
    fn act(&mut self, current_t: f64, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::Request(customer) => {
                self.stats.total_requests += 1;
                // Admission waits for Dispatch so that requests already made at
                // this instant compete under the discipline.
                self.enqueue(*customer);
                if self.has_free_server() {
                    Response::event(current_t, Event::Dispatch)
                } else {
                    Response::new()
                }
            }
            Event::Dispatch => Response::events(self.start_all(current_t)),
            Event::ServiceStart(admission) => {
                self.stats.total_started += 1;
                self.stats.wait_times.push(admission.wait());
                self.stats.admission_order.push(admission.customer.id);
                Response::event(admission.end_t(), Event::ServiceComplete(*admission))
            }
            Event::ServiceComplete(admission) => {
                self.stats.total_completed += 1;
                self.stats.busy_time += admission.customer.service_duration;
                self.stats.last_completion_t = current_t;
                match self.release() {
                    Some(next) => Response::event(
                        current_t,
                        Event::ServiceStart(Admission::new(next, current_t)),
                    ),
                    None => Response::new(),
                }
            }
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        let mut stats = self.stats.clone();
        stats.current_occupancy = self.occupancy;
        stats.current_queue_length = self.waiting.len();
        Stats::Pool(stats)
    }
}
