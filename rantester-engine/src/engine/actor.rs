//! Endpoint actor: one task per UE incarnation.
//!
//! The actor owns its [`EndpointContext`] and the protocol session handed
//! out by the endpoint runtime. It reads commands from its private mailbox,
//! watches the registration state, and fans out `EstablishSession` once the
//! UE is registered. Its mailbox is closed only after the session has been
//! torn down, so a closed mailbox means the incarnation is gone.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, info_span, trace, warn, Instrument};

use rantester_core::barrier::BarrierUnit;
use rantester_core::endpoint::{ActorPhase, EndpointContext, RegistrationState};
use rantester_core::mailbox::{Command, Mailbox, MailboxHandle};
use rantester_core::runtime::EndpointSession;
use rantester_telemetry::{ActiveUe, EventLogger, MetricsRecorder};

/// Per-run knobs shared by every actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorSettings {
    pub sessions_per_ue: u8,
    /// Auto-terminate after this long, if set.
    pub deregistration_delay: Option<Duration>,
    /// Flag the UE as timed out if it is not registered by then.
    pub registration_timeout: Option<Duration>,
}

/// What one incarnation did before it exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorReport {
    pub ue_id: u32,
    pub generation: u64,
    pub identity: String,
    pub gnb_id: String,
    pub registrations_observed: u32,
    pub session_commands_issued: u8,
    pub sessions_established: u8,
    pub timed_out: bool,
    pub final_phase: ActorPhase,
}

enum ActorEvent {
    Command(Option<Command>),
    State(RegistrationState),
    RegistrationDeadline,
}

pub struct EndpointActor<S: EndpointSession> {
    context: EndpointContext,
    session: S,
    mailbox: Mailbox,
    /// Own sender, used for self-commands.
    handle: MailboxHandle,
    settings: ActorSettings,
    metrics: Arc<MetricsRecorder>,
    spawned_at: Instant,
    fanned_out: bool,
    registrations_observed: u32,
    session_commands_issued: u8,
    timed_out: bool,
    auto_terminate: Option<JoinHandle<()>>,
    _active: ActiveUe,
    _unit: BarrierUnit,
}

impl<S: EndpointSession> EndpointActor<S> {
    pub fn new(
        context: EndpointContext,
        session: S,
        (handle, mailbox): (MailboxHandle, Mailbox),
        settings: ActorSettings,
        metrics: Arc<MetricsRecorder>,
        unit: BarrierUnit,
    ) -> Self {
        let active = metrics.track_ue();
        Self {
            context,
            session,
            mailbox,
            handle,
            settings,
            metrics,
            spawned_at: Instant::now(),
            fanned_out: false,
            registrations_observed: 0,
            session_commands_issued: 0,
            timed_out: false,
            auto_terminate: None,
            _active: active,
            _unit: unit,
        }
    }

    /// The actor's task, inside a span carrying its UE and gNB ids.
    pub fn into_task(self) -> impl Future<Output = ActorReport> + Send + 'static {
        let span = info_span!(
            "ue",
            ue_id = self.context.ue_id,
            msin = %self.context.identity,
            gnb_id = %self.context.station.gnb_id,
            generation = self.handle.generation(),
        );
        self.run().instrument(span)
    }

    pub fn spawn(self) -> JoinHandle<ActorReport> {
        tokio::spawn(self.into_task())
    }

    /// Entry action: queue `Register` and arm the auto-terminate timer.
    fn start(&mut self) {
        self.spawned_at = Instant::now();
        if self.handle.send(Command::Register).is_err() {
            warn!("mailbox closed before start");
        }

        if let Some(delay) = self.settings.deregistration_delay {
            let handle = self.handle.clone();
            self.auto_terminate = Some(tokio::spawn(async move {
                tokio::select! {
                    _ = sleep(delay) => {
                        // The actor may already be gone, which is fine.
                        if handle.send(Command::Terminate).is_ok() {
                            debug!(ue_id = handle.ue_id(), "auto-terminate fired");
                        }
                    }
                    _ = handle.closed() => {}
                }
            }));
        }
    }

    pub async fn run(mut self) -> ActorReport {
        self.start();
        let deadline = self
            .settings
            .registration_timeout
            .map(|timeout| self.spawned_at + timeout);

        loop {
            let deadline_armed = deadline.is_some()
                && !self.timed_out
                && self.context.registration != RegistrationState::Registered
                && self.registrations_observed == 0;

            let event = tokio::select! {
                command = self.mailbox.recv() => ActorEvent::Command(command),
                state = self.session.observe_registration_state() => ActorEvent::State(state),
                _ = sleep_until(deadline.unwrap_or(self.spawned_at)), if deadline_armed => {
                    ActorEvent::RegistrationDeadline
                }
            };

            match event {
                ActorEvent::Command(Some(Command::Terminate)) | ActorEvent::Command(None) => break,
                ActorEvent::Command(Some(command)) => self.execute(command).await,
                ActorEvent::State(state) => self.on_registration_state(state),
                ActorEvent::RegistrationDeadline => self.on_registration_deadline().await,
            }
        }

        self.terminate().await
    }

    async fn execute(&mut self, command: Command) {
        trace!(?command, "executing");
        if command == Command::Register {
            self.context.advance(ActorPhase::Registering);
        }

        match self.session.execute(command).await {
            Ok(()) if command == Command::EstablishSession => {
                self.context.sessions_established =
                    self.context.sessions_established.saturating_add(1);
                if self.context.sessions_established >= self.settings.sessions_per_ue {
                    self.context.advance(ActorPhase::SessionsEstablished);
                }
            }
            Ok(()) => {}
            Err(e) => warn!("command failed: {e}"),
        }
    }

    fn on_registration_state(&mut self, state: RegistrationState) {
        self.context.registration = state;
        if state != RegistrationState::Registered {
            trace!(?state, "registration state");
            return;
        }

        self.registrations_observed += 1;
        self.metrics.registrations.inc();
        if self.registrations_observed == 1 {
            let latency = self.spawned_at.elapsed();
            self.metrics
                .registration_latency
                .observe(latency.as_secs_f64() * 1_000.0);
            info!(?latency, "UE registered");
        }
        self.context.advance(ActorPhase::Registered);

        if self.fanned_out {
            debug!("registered again, session fan-out already done");
            return;
        }
        self.fanned_out = true;

        let sessions = self.settings.sessions_per_ue;
        for _ in 0..sessions {
            if self.handle.send(Command::EstablishSession).is_err() {
                break;
            }
            self.session_commands_issued += 1;
        }
        self.metrics
            .pdu_sessions_requested
            .inc_by(u64::from(self.session_commands_issued));
        if sessions > 0 {
            self.context.advance(ActorPhase::SessionsPending);
        }
    }

    async fn on_registration_deadline(&mut self) {
        self.timed_out = true;
        self.metrics.registration_timeouts.inc();
        warn!(
            elapsed = ?self.spawned_at.elapsed(),
            "UE did not register before its deadline"
        );
        EventLogger::log_event(
            "registration_timeout",
            vec![
                KeyValue::new("ue_id", i64::from(self.context.ue_id)),
                KeyValue::new("msin", self.context.identity.clone()),
                KeyValue::new("gnb_id", self.context.station.gnb_id.clone()),
            ],
        )
        .await;
    }

    async fn terminate(mut self) -> ActorReport {
        self.context.advance(ActorPhase::Terminating);
        self.session.shutdown().await;
        self.context.advance(ActorPhase::Terminated);
        self.mailbox.close();
        // The timer returns as soon as it sees the closed mailbox.
        if let Some(timer) = self.auto_terminate.take() {
            if let Err(e) = timer.await {
                warn!("auto-terminate timer failed: {e}");
            }
        }
        debug!("UE terminated");

        ActorReport {
            ue_id: self.context.ue_id,
            generation: self.handle.generation(),
            identity: self.context.identity.clone(),
            gnb_id: self.context.station.gnb_id.clone(),
            registrations_observed: self.registrations_observed,
            session_commands_issued: self.session_commands_issued,
            sessions_established: self.context.sessions_established,
            timed_out: self.timed_out,
            final_phase: self.context.phase,
        }
    }
}
