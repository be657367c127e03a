use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::EventError;

struct Event<T> {
    t: f64,
    seq: u64,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    // BinaryHeap is a max-heap: reverse both keys so the earliest time,
    // then the earliest insertion, sits on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered queue of pending events
///
/// Events with equal times are popped in the order they were scheduled.
pub struct EventQueue<T> {
    heap: BinaryHeap<Event<T>>,
    next_seq: u64,
    now: f64,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> EventQueue<T> {
        EventQueue {
            heap: BinaryHeap::new(),
            next_seq: 0,
            now: 0.0,
        }
    }

    /// Insert an event at virtual time `t`
    ///
    /// Fails if `t` is not finite or lies before the time of the last
    /// popped event.
    pub fn schedule(&mut self, t: f64, data: T) -> Result<(), EventError> {
        if !t.is_finite() {
            return Err(EventError::InvalidTime(t));
        }
        if t < self.now {
            return Err(EventError::ScheduleInPast {
                requested: t,
                now: self.now,
            });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event { t, seq, data });
        Ok(())
    }

    /// Remove the earliest event, advancing `now` to its time
    pub fn pop_next(&mut self) -> Option<(f64, T)> {
        let event = self.heap.pop()?;
        self.now = event.t;
        Some((event.t, event.data))
    }

    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.t)
    }

    /// Time of the last popped event
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_queue() {
        let mut queue = EventQueue::<u8>::new();
        queue.schedule(2.0, 2).unwrap();
        queue.schedule(1.0, 1).unwrap();
        assert_eq!(queue.peek_time(), Some(1.0));
        assert_eq!(queue.pop_next(), Some((1.0, 1)));
        assert_eq!(queue.pop_next(), Some((2.0, 2)));
        assert_eq!(queue.pop_next(), None);
    }

    #[test]
    fn equal_times_pop_in_schedule_order() {
        let mut queue = EventQueue::<u8>::new();
        for data in [5, 3, 9, 1] {
            queue.schedule(4.0, data).unwrap();
        }
        queue.schedule(0.5, 0).unwrap();

        let popped: Vec<u8> = std::iter::from_fn(|| queue.pop_next().map(|(_, d)| d)).collect();
        assert_eq!(popped, vec![0, 5, 3, 9, 1]);
    }

    #[test]
    fn now_follows_popped_events() {
        let mut queue = EventQueue::<u8>::new();
        queue.schedule(3.5, 1).unwrap();
        assert_eq!(queue.now(), 0.0);
        queue.pop_next();
        assert_eq!(queue.now(), 3.5);
        assert!(queue.is_empty());
    }

    #[test]
    fn rejects_past_and_non_finite_times() {
        let mut queue = EventQueue::<u8>::new();
        queue.schedule(10.0, 1).unwrap();
        queue.pop_next();

        assert_eq!(
            queue.schedule(9.0, 2),
            Err(EventError::ScheduleInPast {
                requested: 9.0,
                now: 10.0
            })
        );
        assert!(matches!(
            queue.schedule(f64::NAN, 3),
            Err(EventError::InvalidTime(_))
        ));
        assert!(queue.schedule(f64::INFINITY, 3).is_err());

        // same instant is fine
        assert!(queue.schedule(10.0, 4).is_ok());
        assert_eq!(queue.len(), 1);
    }
}
