use thiserror::Error;

/// Errors raised while scheduling events
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("event time {0} is not a finite number")]
    InvalidTime(f64),

    #[error("cannot schedule event at t={requested} before current time t={now}")]
    ScheduleInPast { requested: f64, now: f64 },
}
