use thiserror::Error;

use rantester_config::ConfigError;
use rantester_core::{RuntimeError, TopologyError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("No station serves UE {0}")]
    MissingStation(u32),
}

