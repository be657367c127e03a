//! A small discrete-event simulation kernel.
//!
//! Agents react to events popped from a time-ordered queue and answer with
//! new events (and, occasionally, new agents). Virtual time is an `f64` that
//! only moves forward as events are dispatched.

use tracing::{debug, trace};

mod error;
pub mod parallel;
mod queue;

pub use error::EventError;
pub use queue::EventQueue;

/// What an agent wants to happen after seeing an event
pub struct Response<T, S> {
    pub events: Vec<(f64, T)>,
    pub agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> Default for Response<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> Response<T, S> {
    pub fn new() -> Response<T, S> {
        Response {
            events: Vec::new(),
            agents: Vec::new(),
        }
    }

    pub fn event(t: f64, data: T) -> Response<T, S> {
        Response {
            events: vec![(t, data)],
            agents: Vec::new(),
        }
    }

    pub fn events(events: Vec<(f64, T)>) -> Response<T, S> {
        Response {
            events,
            agents: Vec::new(),
        }
    }
}

pub trait Agent<T, S> {
    fn act(&mut self, _current_t: f64, _data: &T) -> Response<T, S> {
        Response::new()
    }

    fn stats(&self) -> S;
}

/// Callback invoked with every dispatched event, before agents see it
pub type Observer<T> = Box<dyn FnMut(f64, &T)>;

pub struct EventLoop<T, S> {
    queue: EventQueue<T>,
    current_t: f64,
    dispatched: usize,
    agents: Vec<Box<dyn Agent<T, S>>>,
    observer: Option<Observer<T>>,
    // first invalid initial event, reported by `run`
    rejected: Option<EventError>,
}

impl<T, S> EventLoop<T, S> {
    pub fn new(events: Vec<(f64, T)>, agents: Vec<Box<dyn Agent<T, S>>>) -> EventLoop<T, S> {
        let mut queue = EventQueue::new();
        let mut rejected = None;
        for (t, data) in events {
            if let Err(e) = queue.schedule(t, data) {
                rejected.get_or_insert(e);
            }
        }
        EventLoop {
            queue,
            current_t: 0.0,
            dispatched: 0,
            agents,
            observer: None,
            rejected,
        }
    }

    /// Install a hook that sees every event as it is dispatched
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(f64, &T) + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn current_t(&self) -> f64 {
        self.current_t
    }

    /// Number of events handled so far
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }

    fn broadcast(&mut self) -> Result<(), EventError> {
        let Some((t, data)) = self.queue.pop_next() else {
            return Ok(());
        };
        self.current_t = t;
        self.dispatched += 1;
        trace!(t, seq = self.dispatched, "dispatch");

        if let Some(observer) = self.observer.as_mut() {
            observer(t, &data);
        }

        let mut new_agents = Vec::<Box<dyn Agent<T, S>>>::new();
        for agent in &mut self.agents {
            let response = agent.act(self.current_t, &data);
            for (new_t, new_data) in response.events {
                self.queue.schedule(new_t, new_data)?;
            }
            new_agents.extend(response.agents);
        }
        self.agents.extend(new_agents);
        Ok(())
    }

    /// Dispatch events until the queue is empty
    pub fn run(&mut self) -> Result<(), EventError> {
        if let Some(e) = self.rejected.take() {
            return Err(e);
        }
        debug!(
            pending = self.queue.len(),
            agents = self.agents.len(),
            "event loop started"
        );
        while !self.queue.is_empty() {
            self.broadcast()?;
        }
        debug!(
            t = self.current_t,
            dispatched = self.dispatched,
            "event loop drained"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NoddyAgent {}

    impl Agent<u8, ()> for NoddyAgent {
        fn stats(&self) {}
    }

    #[test]
    fn noddy_run() {
        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(NoddyAgent {})];
        let mut event_loop = EventLoop::new(vec![(1.0, 1), (2.5, 2)], agents);

        event_loop.run().unwrap();

        assert_eq!(event_loop.current_t(), 2.5);
        assert_eq!(event_loop.dispatched(), 2);
        assert_eq!(event_loop.pending(), 0);
    }

    #[test]
    fn new_agent() {
        struct Spawner {}
        impl Agent<u8, ()> for Spawner {
            fn act(&mut self, _current_t: f64, _data: &u8) -> Response<u8, ()> {
                Response {
                    events: Vec::new(),
                    agents: vec![Box::new(Spawner {})],
                }
            }
            fn stats(&self) {}
        }
        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(Spawner {})];
        let mut event_loop = EventLoop::new(vec![(1.0, 1), (2.0, 2)], agents);

        event_loop.run().unwrap();

        // First event: 1 new agent
        // Second event: 2 new agents
        assert_eq!(event_loop.stats().len(), 4)
    }

    #[test]
    fn countdown_reschedules_until_exhausted() {
        struct Countdown {
            seen: Vec<u8>,
        }
        impl Agent<u8, Vec<u8>> for Countdown {
            fn act(&mut self, current_t: f64, data: &u8) -> Response<u8, Vec<u8>> {
                self.seen.push(*data);
                if *data == 0 {
                    return Response::new();
                }
                Response::event(current_t + 0.5, data - 1)
            }
            fn stats(&self) -> Vec<u8> {
                self.seen.clone()
            }
        }

        let agents: Vec<Box<dyn Agent<u8, Vec<u8>>>> = vec![Box::new(Countdown { seen: vec![] })];
        let mut event_loop = EventLoop::new(vec![(0.0, 3)], agents);
        event_loop.run().unwrap();

        assert_eq!(event_loop.stats(), vec![vec![3, 2, 1, 0]]);
        assert_eq!(event_loop.current_t(), 1.5);
    }

    #[test]
    fn observer_sees_every_event_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(NoddyAgent {})];
        let mut event_loop = EventLoop::new(vec![(2.0, 7), (1.0, 8), (2.0, 9)], agents)
            .with_observer(move |t, data| sink.borrow_mut().push((t, *data)));

        event_loop.run().unwrap();

        assert_eq!(*seen.borrow(), vec![(1.0, 8), (2.0, 7), (2.0, 9)]);
    }

    #[test]
    fn agent_scheduling_into_the_past_fails_the_run() {
        struct TimeTraveller {}
        impl Agent<u8, ()> for TimeTraveller {
            fn act(&mut self, current_t: f64, _data: &u8) -> Response<u8, ()> {
                Response::event(current_t - 1.0, 0)
            }
            fn stats(&self) {}
        }
        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(TimeTraveller {})];
        let mut event_loop = EventLoop::new(vec![(5.0, 1)], agents);

        let err = event_loop.run().unwrap_err();
        assert_eq!(
            err,
            EventError::ScheduleInPast {
                requested: 4.0,
                now: 5.0
            }
        );
    }

    #[test]
    fn invalid_initial_event_is_reported_by_run() {
        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(NoddyAgent {})];
        let mut event_loop = EventLoop::new(vec![(f64::NAN, 1), (1.0, 2)], agents);

        assert!(matches!(event_loop.run(), Err(EventError::InvalidTime(_))));
        assert_eq!(event_loop.dispatched(), 0);
    }
}
