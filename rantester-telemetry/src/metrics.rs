//! Prometheus metrics for the UE fleet.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub ues_spawned: IntCounter,
    pub ues_terminated: IntCounter,
    pub registrations: IntCounter,
    pub registration_timeouts: IntCounter,
    pub pdu_sessions_requested: IntCounter,
    pub active_ues: IntGauge,
    pub registration_latency: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let ues_spawned = IntCounter::new("rantester_ues_spawned_total", "UE actors spawned")?;
        let ues_terminated =
            IntCounter::new("rantester_ues_terminated_total", "UE actors terminated")?;
        let registrations = IntCounter::new(
            "rantester_registrations_total",
            "Registered-state transitions observed",
        )?;
        let registration_timeouts = IntCounter::new(
            "rantester_registration_timeouts_total",
            "UEs that missed their registration deadline",
        )?;
        let pdu_sessions_requested = IntCounter::new(
            "rantester_pdu_sessions_requested_total",
            "EstablishSession commands issued",
        )?;
        let active_ues = IntGauge::new("rantester_active_ues", "UE actors currently running")?;
        let registration_latency = Histogram::with_opts(
            HistogramOpts::new(
                "rantester_registration_latency_ms",
                "Time from spawn to the registered state",
            )
            .buckets(vec![10.0, 50.0, 100.0, 500.0, 1_000.0, 5_000.0, 10_000.0]),
        )?;

        registry.register(Box::new(ues_spawned.clone()))?;
        registry.register(Box::new(ues_terminated.clone()))?;
        registry.register(Box::new(registrations.clone()))?;
        registry.register(Box::new(registration_timeouts.clone()))?;
        registry.register(Box::new(pdu_sessions_requested.clone()))?;
        registry.register(Box::new(active_ues.clone()))?;
        registry.register(Box::new(registration_latency.clone()))?;

        Ok(Self {
            registry,
            ues_spawned,
            ues_terminated,
            registrations,
            registration_timeouts,
            pdu_sessions_requested,
            active_ues,
            registration_latency,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Counts one UE as spawned and active until the returned guard drops,
    /// including when the owning task unwinds.
    pub fn track_ue(&self) -> ActiveUe {
        self.ues_spawned.inc();
        self.active_ues.inc();
        ActiveUe {
            active: self.active_ues.clone(),
            terminated: self.ues_terminated.clone(),
        }
    }
}

/// Live UE held by its actor; see [`MetricsRecorder::track_ue`].
#[derive(Debug)]
#[must_use]
pub struct ActiveUe {
    active: IntGauge,
    terminated: IntCounter,
}

impl Drop for ActiveUe {
    fn drop(&mut self) {
        self.terminated.inc();
        self.active.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_active_ues() {
        let metrics = MetricsRecorder::new().unwrap();
        let first = metrics.track_ue();
        let _second = metrics.track_ue();
        drop(first);
        assert_eq!(metrics.active_ues.get(), 1);
        assert_eq!(metrics.ues_terminated.get(), 1);
        assert_eq!(metrics.ues_spawned.get(), 2);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("rantester_ues_spawned_total 2"));
        assert!(text.contains("rantester_active_ues 1"));
    }

    #[test]
    fn unwinding_owner_releases_its_ue() {
        let metrics = MetricsRecorder::new().unwrap();
        let guard = metrics.track_ue();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = guard;
            panic!("actor blew up");
        }));

        assert!(outcome.is_err());
        assert_eq!(metrics.active_ues.get(), 0);
        assert_eq!(metrics.ues_spawned.get(), 1);
        assert_eq!(metrics.ues_terminated.get(), 1);
    }
}
