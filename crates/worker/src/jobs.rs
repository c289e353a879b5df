//! The slow computation run for every accepted measurement.

use std::time::Duration;

use mapcalc_core::measurement::{Measurement, TaskResult};
use mapcalc_core::pressure;
use rand::Rng;

/// Default lower bound of the simulated computation time.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(5);

/// Default upper bound of the simulated computation time.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Inclusive range the per-task delay is drawn from, uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDelay {
    min: Duration,
    max: Duration,
}

impl TaskDelay {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay, at millisecond resolution.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }
}

impl Default for TaskDelay {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY, DEFAULT_MAX_DELAY)
    }
}

/// Wait a random time from `delay`, then compute MAP and stage.
pub async fn long_task(measurement: Measurement, delay: TaskDelay) -> TaskResult {
    let pause = delay.sample();
    tracing::debug!(
        record_id = measurement.id,
        delay_ms = pause.as_millis() as u64,
        "Computing pressure stage"
    );
    tokio::time::sleep(pause).await;

    let result = pressure::evaluate(&measurement);
    tracing::info!(
        record_id = result.id,
        result_map = ?result.result_map,
        stage = %result.result_stage,
        "Pressure stage computed"
    );
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn default_range_is_five_to_ten_seconds() {
        let delay = TaskDelay::default();
        assert_eq!(delay.min(), Duration::from_secs(5));
        assert_eq!(delay.max(), Duration::from_secs(10));
    }

    #[test]
    fn inverted_bounds_are_swapped() {
        let delay = TaskDelay::new(Duration::from_secs(3), Duration::from_secs(1));
        assert_eq!(delay.min(), Duration::from_secs(1));
        assert_eq!(delay.max(), Duration::from_secs(3));
    }

    #[test]
    fn samples_stay_within_bounds() {
        let delay = TaskDelay::default();
        for _ in 0..200 {
            let d = delay.sample();
            assert!(d >= delay.min() && d <= delay.max(), "out of range: {d:?}");
        }
        assert_eq!(TaskDelay::none().sample(), Duration::ZERO);
    }

    #[tokio::test]
    async fn long_task_waits_then_computes() {
        let delay = TaskDelay::new(Duration::from_millis(40), Duration::from_millis(40));
        let started = Instant::now();

        let result = long_task(
            Measurement {
                id: 42,
                sys: Some(120.0),
                dia: Some(80.0),
            },
            delay,
        )
        .await;

        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(result.id, 42);
        assert!((result.result_map.unwrap() - 93.333).abs() < 0.001);
        assert_eq!(result.result_stage, "Стадия 1");
    }
}
