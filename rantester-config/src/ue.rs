//! Simulated UE configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::plmn::PlmnConfig;
use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct UeConfig {
    /// MSIN of UE 1. UE `n` uses `msin + n - 1`, zero-padded to the same width.
    #[validate(custom(function = validation::validate_msin))]
    #[serde(default = "default_msin")]
    pub msin: String,

    #[validate(nested)]
    #[serde(default)]
    pub plmn: PlmnConfig,

    /// Deadline for observing the registered state (milliseconds, 0 = wait forever).
    #[serde(default)]
    pub registration_timeout_ms: u64,
}

fn default_msin() -> String {
    "0000000120".into()
}

impl Default for UeConfig {
    fn default() -> Self {
        Self {
            msin: default_msin(),
            plmn: PlmnConfig::default(),
            registration_timeout_ms: 0,
        }
    }
}
