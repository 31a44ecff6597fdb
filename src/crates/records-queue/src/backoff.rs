//! Retry backoff for job redelivery (spec.md §4.6, §7).
//!
//! Grounded in `ADD TO EXISTING email-queue.js`'s `agentQueue` options,
//! which configure BullMQ with `attempts: 3` and an exponential backoff
//! starting at a few seconds.

use std::time::Duration;

/// Delay before the `attempt`'th redelivery (0-indexed: `attempt == 0` is
/// the delay before the first retry, after the initial attempt failed).
/// Doubles each attempt, capped so a misbehaving attempt counter can't
/// overflow the shift.
pub fn backoff_delay(attempt: u32, base_secs: u64) -> Duration {
    let factor = 1u64 << attempt.min(10);
    Duration::from_secs(base_secs.saturating_mul(factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_each_attempt() {
        assert_eq!(backoff_delay(0, 5), Duration::from_secs(5));
        assert_eq!(backoff_delay(1, 5), Duration::from_secs(10));
        assert_eq!(backoff_delay(2, 5), Duration::from_secs(20));
    }

    #[test]
    fn caps_the_exponent_instead_of_overflowing() {
        let huge = backoff_delay(u32::MAX, 5);
        assert!(huge.as_secs() > 0);
    }

    #[test]
    fn zero_base_never_delays() {
        assert_eq!(backoff_delay(4, 0), Duration::ZERO);
    }
}
