//! Error types for configuration loading and validation

use std::path::PathBuf;
use thiserror::Error;
use validator::ValidationErrors;

/// Unified configuration error type.
///
/// Every variant is fatal and reported before any gNB or UE is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("--tunnel requires a dedicated gNB per UE")]
    TunnelRequiresDedicatedGnb,

    #[error(
        "with tunnels enabled the time between registrations must be at least {floor_ms} ms \
         (got {delay_ms} ms); creating GTP tunnels faster can crash the kernel module"
    )]
    SpawnDelayBelowTunnelFloor { delay_ms: u64, floor_ms: u64 },

    #[error("{requested} PDU sessions per UE requested, at most {max} are allowed")]
    TooManyPduSessions { requested: u8, max: u8 },
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    for (field, errors) in errors.field_errors() {
        let _ = writeln!(output, "Field '{}':", field);
        for error in errors {
            let message = match &error.message {
                Some(msg) => msg.to_string(),
                None => error.code.to_string(),
            };
            let _ = writeln!(output, "  - {}", message);
        }
    }
    output
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

