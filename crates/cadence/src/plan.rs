//! Delay plan preview.

use std::time::Duration;

use cadence_scheduler::DelaySequence;

/// One line per upcoming firing: its index, the wait before it and the
/// elapsed time at which it fires.
pub fn describe(delays: &DelaySequence, count: usize) -> Vec<String> {
    let mut elapsed = Duration::ZERO;
    delays
        .preview(count)
        .into_iter()
        .enumerate()
        .map(|(i, delay)| {
            elapsed += delay;
            format!(
                "#{:<4} wait {:>8}ms  fires at {:>10}ms",
                i + 1,
                delay.as_millis(),
                elapsed.as_millis()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_ramp() {
        let delays = DelaySequence::from_millis([5000, 2000, 500]).unwrap();
        let lines = describe(&delays, 4);

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("wait      500ms"));
        assert!(lines[1].contains("fires at       2500ms"));
        assert!(lines[3].contains("wait     5000ms"));
        assert!(lines[3].contains("fires at      12500ms"));
    }

    #[test]
    fn test_describe_zero_count() {
        let delays = DelaySequence::from_millis([100]).unwrap();
        assert!(describe(&delays, 0).is_empty());
    }
}
