//! In-process gNB stand-in.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use rantester_core::barrier::JoinBarrier;
use rantester_core::error::RuntimeError;
use rantester_core::runtime::{StationHandle, StationRuntime};
use rantester_core::topology::BaseStationContext;

use crate::latency::LatencyModel;
use crate::ledger::SimulationLedger;

/// Pretends to run NG setup and then idles until shutdown.
pub struct SimulatedGnbRuntime {
    setup: Arc<dyn LatencyModel>,
    ledger: SimulationLedger,
    acknowledge_ready: bool,
}

impl SimulatedGnbRuntime {
    pub fn new(setup: Arc<dyn LatencyModel>, ledger: SimulationLedger) -> Self {
        Self {
            setup,
            ledger,
            acknowledge_ready: true,
        }
    }

    /// Stations started by this runtime do not report readiness, so the
    /// caller has to fall back to its settle delay.
    pub fn without_ready_ack(mut self) -> Self {
        self.acknowledge_ready = false;
        self
    }
}

#[async_trait]
impl StationRuntime for SimulatedGnbRuntime {
    async fn start(
        &self,
        station: BaseStationContext,
        barrier: &JoinBarrier,
        shutdown: CancellationToken,
    ) -> Result<StationHandle, RuntimeError> {
        let context = Arc::new(station);
        let unit = barrier.enter();
        let setup = self.setup.sample();
        let ledger = self.ledger.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        ledger.station_started(&context.gnb_id);
        let span = info_span!("gnb", gnb_id = %context.gnb_id, plmn = %context.plmn);
        let n2 = SocketAddr::new(context.control_ip, context.control_port);
        let n3 = SocketAddr::new(context.data_ip, context.data_port);
        let gnb_id = context.gnb_id.clone();
        tokio::spawn(
            async move {
                let _unit = unit;
                let ready = tokio::select! {
                    _ = tokio::time::sleep(setup) => true,
                    _ = shutdown.cancelled() => false,
                };
                if ready {
                    info!(?setup, %n2, %n3, "NG setup complete");
                    // The supervisor may have stopped listening after its ready timeout.
                    let _ = ready_tx.send(());
                    shutdown.cancelled().await;
                }
                debug!("gNB shutting down");
                ledger.station_stopped(&gnb_id);
            }
            .instrument(span),
        );

        Ok(StationHandle {
            context,
            ready: self.acknowledge_ready.then_some(ready_rx),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::FixedLatencyModel;
    use rantester_core::topology::Plmn;
    use std::net::{IpAddr, Ipv4Addr};
    use tracing_test::traced_test;

    fn station() -> BaseStationContext {
        BaseStationContext {
            index: 1,
            gnb_id: "000001".to_string(),
            control_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            control_port: 38412,
            data_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 1, 1)),
            data_port: 2152,
            plmn: Plmn::new("208", "93"),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn acks_ready_and_releases_barrier_on_shutdown() {
        let ledger = SimulationLedger::new();
        let runtime = SimulatedGnbRuntime::new(Arc::new(FixedLatencyModel::new(5)), ledger.clone());
        let barrier = JoinBarrier::new();
        let shutdown = CancellationToken::new();

        let handle = runtime
            .start(station(), &barrier, shutdown.clone())
            .await
            .unwrap();
        assert_eq!(barrier.outstanding(), 1);
        handle.ready.unwrap().await.unwrap();
        assert!(logs_contain("n2=10.0.0.1:38412"));
        assert!(logs_contain("n3=10.0.1.1:2152"));

        shutdown.cancel();
        barrier.wait().await;
        assert_eq!(ledger.stations_started(), vec!["000001".to_string()]);
        assert_eq!(ledger.stations_stopped(), vec!["000001".to_string()]);
    }

    #[tokio::test]
    async fn can_run_without_ready_ack() {
        let runtime = SimulatedGnbRuntime::new(
            Arc::new(FixedLatencyModel::new(0)),
            SimulationLedger::new(),
        )
        .without_ready_ack();
        let barrier = JoinBarrier::new();
        let shutdown = CancellationToken::new();

        let handle = runtime
            .start(station(), &barrier, shutdown.clone())
            .await
            .unwrap();
        assert!(handle.ready.is_none());

        shutdown.cancel();
        barrier.wait().await;
    }
}
