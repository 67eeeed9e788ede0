//! Retry policies and backoff strategies.
//!
//! Used by the event producer for publish retries and by the AI gateway
//! for provider call retries.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay every time.
    Fixed { delay_ms: u64 },
    /// Delay grows by a constant step per attempt.
    Linear {
        initial_delay_ms: u64,
        increment_ms: u64,
    },
    /// Delay multiplies per attempt, capped at a ceiling.
    Exponential {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
    },
    /// Exponential with random jitter to spread out retry storms.
    ExponentialWithJitter {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
        jitter_factor: f64,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl BackoffStrategy {
    /// Delay before retrying after `attempt` attempts have failed
    /// (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let millis = match self {
            Self::Fixed { delay_ms } => *delay_ms,
            Self::Linear {
                initial_delay_ms,
                increment_ms,
            } => initial_delay_ms + increment_ms * attempt as u64,
            Self::Exponential {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
            } => {
                let delay = *initial_delay_ms as f64 * multiplier.powi(attempt as i32);
                delay.min(*max_delay_ms as f64) as u64
            }
            Self::ExponentialWithJitter {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
                jitter_factor,
            } => {
                let capped = (*initial_delay_ms as f64 * multiplier.powi(attempt as i32))
                    .min(*max_delay_ms as f64);
                // delay * (1 +/- jitter_factor)
                let jitter = (rand_simple() * 2.0 - 1.0) * capped * jitter_factor;
                (capped + jitter).max(1.0) as u64
            }
        };

        Duration::from_millis(millis)
    }
}

/// Pseudo-random value in [0, 1) for jitter; no need for a real RNG here.
fn rand_simple() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    hasher.write_u64(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64)
            .unwrap_or(0),
    );
    (hasher.finish() % 10_000) as f64 / 10_000.0
}

/// Maximum attempts plus the backoff between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, counting the first one (1 = no retries).
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::default(),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempt` attempts have run.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the next retry (0-indexed attempt).
    pub fn next_retry_delay(&self, attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(attempt)
    }
}
