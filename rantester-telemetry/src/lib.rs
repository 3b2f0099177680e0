//! # rantester telemetry
//!
//! Logging and metrics for the multi-UE tester.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::{ActiveUe, MetricsRecorder};
