//! Structured logging with tracing and OpenTelemetry attributes.

use opentelemetry::KeyValue;
use rantester_config::TelemetryConfig;
use thiserror::Error;
use tracing::{info_span, Instrument};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
#[error("failed to install the log subscriber: {0}")]
pub struct LoggingInitError(String);

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` wins over the configured level.
    pub fn try_init(config: &TelemetryConfig) -> Result<(), LoggingInitError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

        fmt()
            .with_env_filter(filter)
            .with_thread_names(config.thread_names)
            .with_target(false)
            .try_init()
            .map_err(|e| LoggingInitError(e.to_string()))
    }

    /// Emits one lifecycle event with its attributes.
    pub async fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!("tester_event", event_type = event_type, otel.kind = "INTERNAL");

        async {
            tracing::info!(metadata = ?metadata, "Tester event");
        }
        .instrument(span)
        .await
    }
}
