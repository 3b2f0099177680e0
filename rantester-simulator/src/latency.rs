//! Latency models for the simulated procedures.
//!
//! - `FixedLatencyModel`: always the same delay.
//! - `JitteredLatencyModel`: a base delay plus a uniform random jitter.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;

/// Trait for procedure latency models.
pub trait LatencyModel: Send + Sync {
    /// Draws the delay of the next procedure.
    fn sample(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedLatencyModel {
    delay: Duration,
}

impl FixedLatencyModel {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(latency_ms),
        }
    }
}

impl LatencyModel for FixedLatencyModel {
    #[inline]
    fn sample(&self) -> Duration {
        self.delay
    }
}

/// Base delay plus `0..=magnitude_ms` of jitter drawn from a shared RNG.
#[derive(Debug)]
pub struct JitteredLatencyModel {
    base: Duration,
    magnitude_ms: u64,
    rng: Arc<Mutex<StdRng>>,
}

impl JitteredLatencyModel {
    pub fn new(base_ms: u64, magnitude_ms: u64, rng: Arc<Mutex<StdRng>>) -> Self {
        Self {
            base: Duration::from_millis(base_ms),
            magnitude_ms,
            rng,
        }
    }
}

impl LatencyModel for JitteredLatencyModel {
    fn sample(&self) -> Duration {
        if self.magnitude_ms == 0 {
            return self.base;
        }
        let jitter = self.rng.lock().random_range(0..=self.magnitude_ms);
        self.base + Duration::from_millis(jitter)
    }
}

/// Builds the model matching a base delay and jitter magnitude.
pub fn latency_model(
    base_ms: u64,
    jitter_ms: u64,
    rng: &Arc<Mutex<StdRng>>,
) -> Arc<dyn LatencyModel> {
    if jitter_ms == 0 {
        Arc::new(FixedLatencyModel::new(base_ms))
    } else {
        Arc::new(JitteredLatencyModel::new(base_ms, jitter_ms, Arc::clone(rng)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn fixed_latency_is_constant() {
        let model = FixedLatencyModel::new(100);
        assert_eq!(model.sample(), Duration::from_millis(100));
        assert_eq!(model.sample(), Duration::from_millis(100));
    }

    #[test]
    fn jitter_stays_within_magnitude() {
        let rng = Arc::new(Mutex::new(StdRng::seed_from_u64(7)));
        let model = JitteredLatencyModel::new(10, 5, rng);
        for _ in 0..100 {
            let delay = model.sample();
            assert!(delay >= Duration::from_millis(10));
            assert!(delay <= Duration::from_millis(15));
        }
    }
}
