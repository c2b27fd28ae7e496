use std::time::Duration;

use backoff::backoff::Backoff as _;

/// Defaults per the execution loop's overall retry pacing: 0.5s initial, 60s
/// cap, x1.5 growth, +/-50% jitter, 15 minute default elapsed-time budget.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
pub const DEFAULT_MAX_ELAPSED: Duration = Duration::from_secs(15 * 60);

/// Stateful randomized backoff with an overall elapsed-time limit, wrapping
/// the `backoff` crate's exponential backoff so the jitter math matches the
/// one battle-tested implementation already pulled in for per-node health.
pub struct ExponentialBackoff {
    inner: backoff::ExponentialBackoff,
}

impl ExponentialBackoff {
    pub fn new(initial_interval: Duration, max_interval: Duration, max_elapsed: Option<Duration>) -> Self {
        let inner = backoff::ExponentialBackoffBuilder::new()
            .with_initial_interval(initial_interval)
            .with_max_interval(max_interval)
            .with_multiplier(DEFAULT_MULTIPLIER)
            .with_randomization_factor(DEFAULT_RANDOMIZATION_FACTOR)
            .with_max_elapsed_time(max_elapsed)
            .build();
        Self { inner }
    }

    pub fn with_defaults(max_elapsed: Option<Duration>) -> Self {
        Self::new(DEFAULT_INITIAL_INTERVAL, DEFAULT_MAX_INTERVAL, max_elapsed.or(Some(DEFAULT_MAX_ELAPSED)))
    }

    /// Returns the next backoff duration, or `None` once the elapsed-time
    /// budget (if any) has been exhausted.
    pub fn next(&mut self) -> Option<Duration> {
        self.inner.next_backoff()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}
