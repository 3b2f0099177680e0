//! Logging configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TelemetryConfig {
    /// Default level when `RUST_LOG` is not set.
    #[validate(custom(function = validation::validate_level))]
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_true")]
    pub thread_names: bool,
}

fn default_level() -> String {
    "info".into()
}

fn default_true() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            thread_names: true,
        }
    }
}
