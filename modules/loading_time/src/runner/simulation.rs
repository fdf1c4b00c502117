//! Artificial latency and fault injection for work items.
//!
//! Both knobs stand in for a real calculation backend. A zero-width delay
//! range together with a failure probability of `0.0` or `1.0` makes the
//! runner fully deterministic.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    delay_min: Duration,
    delay_max: Duration,
    failure_probability: f64,
}

impl Simulation {
    /// Out-of-range inputs are normalised: bounds are ordered and the
    /// probability is clamped to `[0, 1]` (non-finite values become `0`).
    #[must_use]
    pub fn new(delay_min: Duration, delay_max: Duration, failure_probability: f64) -> Self {
        let (delay_min, delay_max) = if delay_min <= delay_max {
            (delay_min, delay_max)
        } else {
            (delay_max, delay_min)
        };
        let failure_probability = if failure_probability.is_finite() {
            failure_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            delay_min,
            delay_max,
            failure_probability,
        }
    }

    /// No delay, no injected failures.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 0.0)
    }

    #[must_use]
    pub fn delay_range(&self) -> (Duration, Duration) {
        (self.delay_min, self.delay_max)
    }

    #[must_use]
    pub fn failure_probability(&self) -> f64 {
        self.failure_probability
    }

    /// Uniform sample from `[delay_min, delay_max]`.
    #[must_use]
    pub fn sample_delay(&self) -> Duration {
        if self.delay_min >= self.delay_max {
            return self.delay_min;
        }
        rand::rng().random_range(self.delay_min..=self.delay_max)
    }

    /// Whether this work item should be reported as failed regardless of its value.
    #[must_use]
    pub fn should_fail(&self) -> bool {
        self.failure_probability > 0.0 && rand::rng().random_bool(self.failure_probability)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::disabled()
    }
}
