//! Backoff policy and the scheduler's polling state.

use std::time::Duration;

/// Steady interval plus exponential backoff after failed cycles:
/// `min(base * 2^(failures - 1), max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub poll_interval: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(1800),
        }
    }
}

impl BackoffPolicy {
    /// Delay after `failures` consecutive failed cycles (1-indexed).
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    Steady,
    Backoff,
}

/// Consecutive-failure counter and the delay before the next cycle.
///
/// Only [`record_success`](Self::record_success) and
/// [`record_failure`](Self::record_failure) change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    consecutive_failures: u32,
    delay: Duration,
}

impl PollState {
    pub fn new(policy: &BackoffPolicy) -> Self {
        Self {
            consecutive_failures: 0,
            delay: policy.poll_interval,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn mode(&self) -> PollMode {
        if self.consecutive_failures == 0 {
            PollMode::Steady
        } else {
            PollMode::Backoff
        }
    }

    pub fn record_success(&mut self, policy: &BackoffPolicy) -> Duration {
        self.consecutive_failures = 0;
        self.delay = policy.poll_interval;
        self.delay
    }

    pub fn record_failure(&mut self, policy: &BackoffPolicy) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.delay = policy.backoff_delay(self.consecutive_failures);
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn failures_double_the_delay_then_success_resets() {
        let policy = BackoffPolicy::default();
        let mut state = PollState::new(&policy);
        assert_eq!(state.mode(), PollMode::Steady);
        assert_eq!(state.delay(), secs(300));

        assert_eq!(state.record_failure(&policy), secs(60));
        assert_eq!(state.record_failure(&policy), secs(120));
        assert_eq!(state.record_failure(&policy), secs(240));
        assert_eq!(state.consecutive_failures(), 3);
        assert_eq!(state.mode(), PollMode::Backoff);

        assert_eq!(state.record_success(&policy), secs(300));
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.mode(), PollMode::Steady);

        assert_eq!(state.record_failure(&policy), secs(60));
    }

    #[test]
    fn delay_is_capped_for_long_failure_streaks() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.backoff_delay(5), secs(960));
        assert_eq!(policy.backoff_delay(6), secs(1800));
        assert_eq!(policy.backoff_delay(40), secs(1800));
        assert_eq!(policy.backoff_delay(u32::MAX), secs(1800));
    }

    #[test]
    fn zero_failures_has_no_backoff() {
        assert_eq!(BackoffPolicy::default().backoff_delay(0), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn backoff_is_monotone_and_bounded(
            base in 1u64..600,
            extra in 0u64..7200,
            failures in 1u32..64,
        ) {
            let policy = BackoffPolicy {
                poll_interval: secs(300),
                base_delay: secs(base),
                max_delay: secs(base + extra),
            };

            let delay = policy.backoff_delay(failures);
            let next = policy.backoff_delay(failures + 1);

            prop_assert!(delay >= policy.base_delay);
            prop_assert!(delay <= policy.max_delay);
            prop_assert!(next >= delay);
        }
    }
}
