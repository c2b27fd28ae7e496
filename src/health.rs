use std::time::{Duration, Instant};

use backoff::backoff::Backoff as _;

/// Circuit opens after this many consecutive failures without an intervening success.
pub const CIRCUIT_OPEN_THRESHOLD: usize = 5;
/// How long a circuit stays open before going half-open.
pub const CIRCUIT_OPEN_DURATION: Duration = Duration::from_secs(5 * 60);
/// How long a healthy/half-open node is considered "recently pinged".
pub const RECENTLY_PINGED_WINDOW: Duration = Duration::from_secs(15 * 60);

const MIN_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(30 * 60);

/// Per-node circuit-breaker state. Carried forward by identity across
/// successor network snapshots so concurrent health updates for a node
/// remain visible regardless of which snapshot a reader holds.
#[derive(Debug, Clone, Copy)]
pub enum NodeHealth {
    /// Never attempted; treated as healthy for selection purposes.
    Unused,
    /// Most recent attempt succeeded.
    Healthy { used_at: Instant },
    /// Recent attempts failed but the circuit has not tripped.
    Unhealthy { backoff_interval: Duration, healthy_at: Instant, consecutive_failures: usize },
    /// Failure threshold reached; excluded from selection until `reopen_at`.
    CircuitOpen { reopen_at: Instant },
}

impl Default for NodeHealth {
    fn default() -> Self {
        Self::Unused
    }
}

impl NodeHealth {
    fn consecutive_failures(&self) -> usize {
        match self {
            Self::Unhealthy { consecutive_failures, .. } => *consecutive_failures,
            _ => 0,
        }
    }

    fn previous_interval(&self) -> Duration {
        match self {
            Self::Unhealthy { backoff_interval, .. } => *backoff_interval,
            _ => MIN_BACKOFF,
        }
    }

    /// Records a failed attempt. A node already in `CircuitOpen` is left
    /// alone -- it is already paying its penalty.
    pub fn mark_unhealthy(&mut self, now: Instant) {
        if matches!(self, Self::CircuitOpen { .. }) {
            return;
        }

        let consecutive_failures = self.consecutive_failures() + 1;

        if consecutive_failures >= CIRCUIT_OPEN_THRESHOLD {
            tracing::warn!(consecutive_failures, reopen_in = ?CIRCUIT_OPEN_DURATION, "opening circuit for node after repeated failures");
            *self = Self::CircuitOpen { reopen_at: now + CIRCUIT_OPEN_DURATION };
            return;
        }

        let mut backoff = backoff::ExponentialBackoff {
            current_interval: self.previous_interval(),
            initial_interval: MIN_BACKOFF,
            max_interval: MAX_BACKOFF,
            max_elapsed_time: None,
            ..Default::default()
        };
        let interval = backoff.next_backoff().expect("max_elapsed_time is fixed to None");

        *self = Self::Unhealthy { backoff_interval: interval, healthy_at: now + interval, consecutive_failures };
    }

    /// Records a successful attempt, unconditionally clearing any prior penalty.
    pub fn mark_healthy(&mut self, now: Instant) {
        *self = Self::Healthy { used_at: now };
    }

    pub fn is_healthy(&self, now: Instant) -> bool {
        match self {
            Self::Unused | Self::Healthy { .. } => true,
            Self::Unhealthy { healthy_at, .. } => now >= *healthy_at,
            Self::CircuitOpen { reopen_at } => now >= *reopen_at,
        }
    }

    pub fn recently_pinged(&self, now: Instant) -> bool {
        match self {
            Self::Unused => false,
            Self::Healthy { used_at } => now < *used_at + RECENTLY_PINGED_WINDOW,
            Self::Unhealthy { healthy_at, .. } => now < *healthy_at,
            Self::CircuitOpen { reopen_at } => now < *reopen_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_is_healthy() {
        assert!(NodeHealth::Unused.is_healthy(Instant::now()));
    }

    #[test]
    fn mark_healthy_clears_failures() {
        let now = Instant::now();
        let mut health = NodeHealth::Unused;
        for _ in 0..3 {
            health.mark_unhealthy(now);
        }
        health.mark_healthy(now);
        assert!(matches!(health, NodeHealth::Healthy { .. }));
        assert!(health.is_healthy(now));
    }

    #[test]
    #[tracing_test::traced_test]
    fn opening_the_circuit_logs_a_warning() {
        let now = Instant::now();
        let mut health = NodeHealth::Unused;
        for _ in 0..CIRCUIT_OPEN_THRESHOLD {
            health.mark_unhealthy(now);
        }
        assert!(logs_contain("opening circuit"));
    }

    #[test]
    fn opens_circuit_after_five_consecutive_failures() {
        let now = Instant::now();
        let mut health = NodeHealth::Unused;
        for _ in 0..CIRCUIT_OPEN_THRESHOLD {
            health.mark_unhealthy(now);
        }
        match health {
            NodeHealth::CircuitOpen { reopen_at } => {
                assert_eq!(reopen_at, now + CIRCUIT_OPEN_DURATION);
            }
            other => panic!("expected circuit open, got {other:?}"),
        }
        assert!(!health.is_healthy(now));
        assert!(health.is_healthy(now + CIRCUIT_OPEN_DURATION));
    }

    #[test]
    fn circuit_open_ignores_further_failures() {
        let now = Instant::now();
        let mut health = NodeHealth::Unused;
        for _ in 0..CIRCUIT_OPEN_THRESHOLD {
            health.mark_unhealthy(now);
        }
        let before = match health {
            NodeHealth::CircuitOpen { reopen_at } => reopen_at,
            _ => unreachable!(),
        };
        health.mark_unhealthy(now + Duration::from_secs(1));
        let after = match health {
            NodeHealth::CircuitOpen { reopen_at } => reopen_at,
            _ => unreachable!(),
        };
        assert_eq!(before, after);
    }

    #[test]
    fn unhealthy_interval_grows_with_repeated_failures() {
        let now = Instant::now();
        let mut health = NodeHealth::Unused;
        health.mark_unhealthy(now);
        let first_interval = match health {
            NodeHealth::Unhealthy { backoff_interval, .. } => backoff_interval,
            _ => unreachable!(),
        };
        health.mark_unhealthy(now);
        let second_interval = match health {
            NodeHealth::Unhealthy { backoff_interval, .. } => backoff_interval,
            _ => unreachable!(),
        };
        assert!(second_interval >= first_interval);
    }

    #[test]
    fn recently_pinged_window_matches_healthy_state() {
        let now = Instant::now();
        let health = NodeHealth::Healthy { used_at: now };
        assert!(health.recently_pinged(now));
        assert!(!health.recently_pinged(now + RECENTLY_PINGED_WINDOW + Duration::from_secs(1)));
    }
}
