//! Retry Backoff
//!
//! Exponential backoff with jitter between retry attempts. Shared by the
//! fetch retry loop in the pipeline and the publisher's delivery loop.

use std::time::Duration;

use rand::Rng;

/// Configuration for backoff between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each attempt).
    pub multiplier: f64,
    /// Jitter factor as a fraction (e.g., 0.1 = ±10% randomization).
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffConfig {
    /// Default shape with a different starting delay.
    #[must_use]
    pub fn with_initial_delay(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            ..Self::default()
        }
    }

    /// No waiting at all, for tests.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }
}

/// Backoff state for one retry loop.
///
/// Each pipeline run creates its own policy, so nothing is shared between
/// concurrent requests.
///
/// # Example
///
/// ```rust
/// use stock_streamer::application::services::backoff::{BackoffConfig, BackoffPolicy};
/// use std::time::Duration;
///
/// let mut policy = BackoffPolicy::new(BackoffConfig {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(1),
///     multiplier: 2.0,
///     jitter_factor: 0.0,
/// });
///
/// assert_eq!(policy.next_delay(), Duration::from_millis(100));
/// assert_eq!(policy.next_delay(), Duration::from_millis(200));
/// ```
#[derive(Debug)]
pub struct BackoffPolicy {
    config: BackoffConfig,
    current_delay: Duration,
}

impl BackoffPolicy {
    /// Create a new backoff policy.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            current_delay: initial_delay,
        }
    }

    /// Get the next delay duration, applying exponential backoff with jitter.
    pub fn next_delay(&mut self) -> Duration {
        let delay_with_jitter = self.apply_jitter(self.current_delay);

        #[allow(clippy::cast_precision_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier).round();
        let next_millis = if scaled.is_finite() && scaled > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                scaled as u128
            }
        } else {
            0
        };
        let capped = next_millis.min(self.config.max_delay.as_millis());
        self.current_delay = Duration::from_millis(u64::try_from(capped).unwrap_or(u64::MAX));

        delay_with_jitter.min(self.config.max_delay)
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 || duration.is_zero() {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.config.jitter_factor;
        let mut rng = rand::rng();
        let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);
        let adjusted_millis = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_u64 = adjusted_millis as u64;
        Duration::from_millis(adjusted_u64)
    }
}
