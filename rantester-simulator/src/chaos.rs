//! Failure injection: registrations that never complete.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct FailureInjector {
    probability: f64,
    rng: Arc<Mutex<StdRng>>,
}

impl FailureInjector {
    pub fn new(probability: f64, rng: Arc<Mutex<StdRng>>) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng,
        }
    }

    /// Whether the next registration should silently stall.
    pub fn should_fail(&self) -> bool {
        if self.probability <= 0.0 {
            return false;
        }
        if self.probability >= 1.0 {
            return true;
        }
        self.rng.lock().random_bool(self.probability)
    }
}
