//! In-process UE stand-in.
//!
//! Registration completes after a sampled latency unless the failure
//! injector decides it should stall forever. Session establishment only
//! succeeds on a registered UE.

use std::future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rantester_core::endpoint::RegistrationState;
use rantester_core::error::RuntimeError;
use rantester_core::mailbox::Command;
use rantester_core::runtime::{EndpointRuntime, EndpointSession, EndpointSpec};
use rantester_core::topology::BaseStationContext;

use crate::chaos::FailureInjector;
use crate::latency::LatencyModel;
use crate::ledger::SimulationLedger;

pub struct SimulatedUeRuntime {
    registration: Arc<dyn LatencyModel>,
    session: Arc<dyn LatencyModel>,
    faults: FailureInjector,
    ledger: SimulationLedger,
}

impl SimulatedUeRuntime {
    pub fn new(
        registration: Arc<dyn LatencyModel>,
        session: Arc<dyn LatencyModel>,
        faults: FailureInjector,
        ledger: SimulationLedger,
    ) -> Self {
        Self {
            registration,
            session,
            faults,
            ledger,
        }
    }
}

#[async_trait]
impl EndpointRuntime for SimulatedUeRuntime {
    type Session = SimulatedUeSession;

    async fn start(
        &self,
        spec: EndpointSpec,
        station: Arc<BaseStationContext>,
    ) -> Result<Self::Session, RuntimeError> {
        self.ledger
            .endpoint_started(spec.ue_id, spec.generation, &spec.identity, &station.gnb_id);
        let (state_tx, state_rx) = watch::channel(RegistrationState::Deregistered);

        Ok(SimulatedUeSession {
            spec,
            station,
            state_tx: Arc::new(state_tx),
            state_rx,
            registration: Arc::clone(&self.registration),
            session: Arc::clone(&self.session),
            faults: self.faults.clone(),
            ledger: self.ledger.clone(),
            registering: None,
            pdu_sessions: 0,
            stopped: false,
        })
    }
}

pub struct SimulatedUeSession {
    spec: EndpointSpec,
    station: Arc<BaseStationContext>,
    state_tx: Arc<watch::Sender<RegistrationState>>,
    state_rx: watch::Receiver<RegistrationState>,
    registration: Arc<dyn LatencyModel>,
    session: Arc<dyn LatencyModel>,
    faults: FailureInjector,
    ledger: SimulationLedger,
    registering: Option<JoinHandle<()>>,
    pdu_sessions: u8,
    stopped: bool,
}

impl SimulatedUeSession {
    pub fn pdu_sessions(&self) -> u8 {
        self.pdu_sessions
    }

    fn register(&mut self) -> Result<(), RuntimeError> {
        if self.station.plmn != self.spec.plmn {
            return Err(RuntimeError::Command {
                ue_id: self.spec.ue_id,
                command: Command::Register,
                reason: format!(
                    "gNB {} serves PLMN {}, subscriber belongs to {}",
                    self.station.gnb_id, self.station.plmn, self.spec.plmn
                ),
            });
        }
        if *self.state_tx.borrow() != RegistrationState::Deregistered {
            debug!(ue_id = self.spec.ue_id, "registration already in progress");
            return Ok(());
        }
        self.state_tx
            .send_replace(RegistrationState::RegisteredInitiated);

        if self.faults.should_fail() {
            warn!(
                ue_id = self.spec.ue_id,
                gnb_id = %self.station.gnb_id,
                "injected fault: registration will never complete"
            );
            return Ok(());
        }

        let latency = self.registration.sample();
        debug!(
            ue_id = self.spec.ue_id,
            imsi = %self.spec.plmn.imsi(&self.spec.identity),
            "registration request sent"
        );
        let state_tx = Arc::clone(&self.state_tx);
        self.registering = Some(tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            state_tx.send_replace(RegistrationState::Registered);
        }));
        Ok(())
    }

    async fn establish_session(&mut self) -> Result<(), RuntimeError> {
        if *self.state_tx.borrow() != RegistrationState::Registered {
            return Err(RuntimeError::Command {
                ue_id: self.spec.ue_id,
                command: Command::EstablishSession,
                reason: "UE is not registered".to_string(),
            });
        }
        tokio::time::sleep(self.session.sample()).await;
        self.pdu_sessions = self.pdu_sessions.saturating_add(1);
        // Only the first PDU session gets a user-plane tunnel.
        if self.spec.tunnel_enabled && self.pdu_sessions == 1 {
            info!(ue_id = self.spec.ue_id, identity = %self.spec.identity, "tunnel interface up");
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Some(task) = self.registering.take() {
            task.abort();
        }
        self.state_tx.send_replace(RegistrationState::Deregistered);
        self.ledger
            .endpoint_stopped(self.spec.ue_id, self.spec.generation);
    }
}

#[async_trait]
impl EndpointSession for SimulatedUeSession {
    async fn execute(&mut self, command: Command) -> Result<(), RuntimeError> {
        self.ledger
            .command(self.spec.ue_id, self.spec.generation, command);
        match command {
            Command::Register => self.register(),
            Command::EstablishSession => self.establish_session().await,
            Command::Terminate => {
                self.stop();
                Ok(())
            }
        }
    }

    async fn observe_registration_state(&mut self) -> RegistrationState {
        match self.state_rx.changed().await {
            Ok(()) => *self.state_rx.borrow_and_update(),
            // Sender lives as long as the session, but never resolve on a dead channel.
            Err(_) => future::pending().await,
        }
    }

    async fn shutdown(&mut self) {
        if self.spec.tunnel_enabled && self.pdu_sessions > 0 {
            debug!(ue_id = self.spec.ue_id, "tunnel interface down");
        }
        self.stop();
    }
}

impl Drop for SimulatedUeSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::FixedLatencyModel;
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rantester_core::topology::Plmn;
    use rand::SeedableRng;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn runtime(failure_probability: f64, ledger: &SimulationLedger) -> SimulatedUeRuntime {
        let rng = Arc::new(Mutex::new(StdRng::seed_from_u64(42)));
        SimulatedUeRuntime::new(
            Arc::new(FixedLatencyModel::new(5)),
            Arc::new(FixedLatencyModel::new(1)),
            FailureInjector::new(failure_probability, rng),
            ledger.clone(),
        )
    }

    fn spec(ue_id: u32) -> EndpointSpec {
        EndpointSpec {
            ue_id,
            identity: format!("{:010}", 119 + ue_id),
            plmn: Plmn::new("208", "93"),
            generation: 1,
            tunnel_enabled: false,
        }
    }

    fn station() -> Arc<BaseStationContext> {
        Arc::new(BaseStationContext {
            index: 1,
            gnb_id: "000001".to_string(),
            control_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            control_port: 38412,
            data_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            data_port: 2152,
            plmn: Plmn::new("208", "93"),
        })
    }

    #[tokio::test]
    async fn registers_then_accepts_sessions() {
        let ledger = SimulationLedger::new();
        let mut session = runtime(0.0, &ledger)
            .start(spec(1), station())
            .await
            .unwrap();

        session.execute(Command::Register).await.unwrap();
        let mut state = session.observe_registration_state().await;
        while state != RegistrationState::Registered {
            state = session.observe_registration_state().await;
        }

        session.execute(Command::EstablishSession).await.unwrap();
        session.execute(Command::EstablishSession).await.unwrap();
        assert_eq!(session.pdu_sessions(), 2);

        session.shutdown().await;
        let incarnation = &ledger.incarnations(1)[0];
        assert!(incarnation.stopped);
        assert_eq!(
            incarnation.commands,
            vec![
                Command::Register,
                Command::EstablishSession,
                Command::EstablishSession
            ]
        );
    }

    #[tokio::test]
    async fn session_before_registration_is_rejected() {
        let ledger = SimulationLedger::new();
        let mut session = runtime(0.0, &ledger)
            .start(spec(2), station())
            .await
            .unwrap();

        let err = session.execute(Command::EstablishSession).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Command {
                ue_id: 2,
                command: Command::EstablishSession,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn injected_failure_never_registers() {
        let ledger = SimulationLedger::new();
        let mut session = runtime(1.0, &ledger)
            .start(spec(3), station())
            .await
            .unwrap();

        session.execute(Command::Register).await.unwrap();
        assert_eq!(
            session.observe_registration_state().await,
            RegistrationState::RegisteredInitiated
        );
        let next = tokio::time::timeout(
            Duration::from_millis(50),
            session.observe_registration_state(),
        )
        .await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn dropping_a_session_marks_it_stopped() {
        let ledger = SimulationLedger::new();
        let session = runtime(0.0, &ledger)
            .start(spec(4), station())
            .await
            .unwrap();
        assert_eq!(ledger.live_endpoints(), 1);
        drop(session);
        assert_eq!(ledger.live_endpoints(), 0);
    }

    #[tokio::test]
    async fn foreign_plmn_is_rejected_at_registration() {
        let ledger = SimulationLedger::new();
        let roaming = EndpointSpec {
            plmn: Plmn::new("001", "01"),
            ..spec(5)
        };
        let mut session = runtime(0.0, &ledger)
            .start(roaming, station())
            .await
            .unwrap();

        let err = session.execute(Command::Register).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Command {
                ue_id: 5,
                command: Command::Register,
                ..
            }
        ));
        assert!(err.to_string().contains("PLMN 208-93"));
        let next = tokio::time::timeout(
            Duration::from_millis(30),
            session.observe_registration_state(),
        )
        .await;
        assert!(next.is_err());
    }
}
