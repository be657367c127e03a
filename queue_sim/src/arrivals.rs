use des::Response;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::process::Process;
use crate::{Customer, Event, Stats};

#[derive(Debug, Clone)]
pub struct ArrivalStats {
    pub customers_total: usize,
    pub arrived: usize,
}

impl ArrivalStats {
    pub fn remaining(&self) -> usize {
        self.customers_total.saturating_sub(self.arrived)
    }
}

/// Generates a fixed number of customers
///
/// Owns the replication's random stream. The gap to the next arrival is drawn
/// first, then the arriving customer's service duration.
pub struct ArrivalProcess {
    customers_total: usize,
    arrived: usize,
    inter_arrival: Process,
    service: Process,
    rng: StdRng,
}

impl ArrivalProcess {
    pub fn new(customers_total: usize, inter_arrival: Process, service: Process, seed: u64) -> Self {
        ArrivalProcess {
            customers_total,
            arrived: 0,
            inter_arrival,
            service,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl des::Agent<Event, Stats> for ArrivalProcess {
    fn act(&mut self, current_t: f64, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::Start => {
                if self.customers_total == 0 {
                    return Response::new();
                }
                Response::event(current_t, Event::Arrival(0))
            }
            Event::Arrival(k) => {
                self.arrived += 1;
                let mut events = Vec::with_capacity(2);
                if k + 1 < self.customers_total {
                    let gap = self.inter_arrival.sample(&mut self.rng);
                    events.push((current_t + gap, Event::Arrival(k + 1)));
                }
                let customer = Customer {
                    id: *k,
                    arrival_t: current_t,
                    service_duration: self.service.sample(&mut self.rng),
                };
                events.push((current_t, Event::Request(customer)));
                Response::events(events)
            }
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::Arrivals(ArrivalStats {
            customers_total: self.customers_total,
            arrived: self.arrived,
        })
    }
}
