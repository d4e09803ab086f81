//! Scheduler types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::SchedulerError;

/// Identifier for one active repeating schedule.
///
/// Issued by [`crate::WaitingIntervals::start_repeating`] from a monotonically
/// increasing counter. Identifiers are never reused within one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntervalId(u64);

impl IntervalId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value behind this identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interval-{}", self.0)
    }
}

/// An ordered list of delays, drained from the end.
///
/// While more than one delay remains, each call to [`next_delay`] removes and
/// returns the **last** element. Once a single delay is left it is returned on
/// every call and never removed. Given `[5000, 2000, 2000, 500]` (ms) the
/// delays applied are 500, 2000, 2000, then 5000 forever.
///
/// [`next_delay`]: DelaySequence::next_delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelaySequence {
    delays: Vec<Duration>,
}

impl DelaySequence {
    /// Build a sequence, rejecting zero durations.
    ///
    /// An empty list is accepted here; it fails on the first [`next_delay`]
    /// call instead.
    ///
    /// [`next_delay`]: DelaySequence::next_delay
    pub fn new(delays: Vec<Duration>) -> Result<Self, SchedulerError> {
        if let Some(index) = delays.iter().position(Duration::is_zero) {
            return Err(SchedulerError::ZeroDelay { index });
        }
        Ok(Self { delays })
    }

    /// Build a sequence from millisecond values.
    pub fn from_millis(millis: impl IntoIterator<Item = u64>) -> Result<Self, SchedulerError> {
        Self::new(millis.into_iter().map(Duration::from_millis).collect())
    }

    /// Return the next delay to wait.
    pub fn next_delay(&mut self) -> Result<Duration, SchedulerError> {
        match self.delays.len() {
            0 => Err(SchedulerError::EmptySequence),
            1 => Ok(self.delays[0]),
            _ => self.delays.pop().ok_or(SchedulerError::EmptySequence),
        }
    }

    /// The delays that would be returned by the next `count` calls, without
    /// consuming anything.
    pub fn preview(&self, count: usize) -> Vec<Duration> {
        let mut drained = self.delays.iter().rev();
        let floor = self.delays.first().copied();
        (0..count)
            .map_while(|i| {
                if i + 1 < self.delays.len() {
                    drained.next().copied()
                } else {
                    floor
                }
            })
            .collect()
    }

    /// Number of delays still held.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// Remaining delays in stored order.
    pub fn as_slice(&self) -> &[Duration] {
        &self.delays
    }
}

impl TryFrom<Vec<Duration>> for DelaySequence {
    type Error = SchedulerError;

    fn try_from(delays: Vec<Duration>) -> Result<Self, Self::Error> {
        Self::new(delays)
    }
}

/// Parses a comma-separated list of milliseconds, e.g. `"5000,2000,500"`.
impl FromStr for DelaySequence {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let millis = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|e| SchedulerError::InvalidDelay(format!("'{}': {}", part, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if millis.is_empty() {
            return Err(SchedulerError::EmptySequence);
        }
        Self::from_millis(millis)
    }
}
