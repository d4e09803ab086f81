//! Variable-delay repeating scheduler.
//!
//! This crate provides an interval timer whose period changes over time:
//! - Delays are taken from the end of a caller-supplied list, one per firing
//! - The last remaining delay repeats until the schedule is stopped
//! - Each schedule is tracked by an [`IntervalId`] for cancellation
//! - Timers are pluggable: tokio tasks or a manually advanced virtual clock

mod error;
mod handler;
mod scheduler;
mod timer;
mod types;

pub use error::SchedulerError;
pub use handler::Handler;
pub use scheduler::WaitingIntervals;
pub use timer::{
    ManualTimer, ManualTimerHandle, OneShotTimer, TimerCallback, TokioTimer, TokioTimerHandle,
};
pub use types::{DelaySequence, IntervalId};
