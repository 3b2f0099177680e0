//! Parameters of the in-process gNB/UE stand-ins.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SimulatorConfig {
    /// Seed for jitter and failure injection.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Time a gNB needs before acknowledging readiness.
    #[validate(range(max = 60_000))]
    #[serde(default = "default_setup_latency")]
    pub gnb_setup_latency_ms: u64,

    #[validate(range(max = 60_000))]
    #[serde(default = "default_registration_latency")]
    pub registration_latency_ms: u64,

    #[validate(range(max = 60_000))]
    #[serde(default = "default_session_latency")]
    pub session_latency_ms: u64,

    /// Maximum random delay added to every latency.
    #[validate(range(max = 10_000))]
    #[serde(default)]
    pub jitter_ms: u64,

    /// Probability that a registration never completes.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default)]
    pub failure_probability: f64,
}

fn default_seed() -> u64 {
    42
}

fn default_setup_latency() -> u64 {
    50
}

fn default_registration_latency() -> u64 {
    20
}

fn default_session_latency() -> u64 {
    5
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            gnb_setup_latency_ms: default_setup_latency(),
            registration_latency_ms: default_registration_latency(),
            session_latency_ms: default_session_latency(),
            jitter_ms: 0,
            failure_probability: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_is_bounded() {
        let config = SimulatorConfig {
            failure_probability: 1.5,
            ..SimulatorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
