//! Fleet supervisor: builds the stations, runs the churn loop and joins
//! everything it started before returning.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use rantester_config::{ScenarioConfig, TesterConfig};
use rantester_core::barrier::JoinBarrier;
use rantester_core::endpoint::EndpointContext;
use rantester_core::identity::IdentityGenerator;
use rantester_core::mailbox::MailboxTable;
use rantester_core::runtime::{EndpointRuntime, EndpointSpec, StationRuntime};
use rantester_core::topology::{
    plan_stations, AddressPlan, BaseStationContext, BaseStationSet, Plmn, Topology,
};
use rantester_telemetry::{EventLogger, MetricsRecorder};

use super::actor::{ActorReport, ActorSettings, EndpointActor};
use super::error::EngineError;

/// Everything derived from the configuration before any task starts.
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub topology: Topology,
    /// Home network of every UE.
    pub subscriber_plmn: Plmn,
    pub stations: Vec<BaseStationContext>,
    /// `(ue_id, msin, gnb_id)` for every UE, in spawn order.
    pub endpoints: Vec<(u32, String, String)>,
}

/// Validates the scenario against the configuration and derives the topology.
///
/// Nothing is started here, so a failure leaves no state behind.
pub fn preflight(
    config: &TesterConfig,
    scenario: &ScenarioConfig,
) -> Result<ScenarioPlan, EngineError> {
    scenario.check()?;

    let topology = Topology::from_dedicated(scenario.dedicated_gnb);
    let identities = IdentityGenerator::new(&config.ue.msin)?;
    let plan = AddressPlan {
        control_base: config.gnodeb.control_if.ip,
        control_port: config.gnodeb.control_if.port,
        control_subnet: config.gnodeb.control_if.subnet,
        data_base: config.gnodeb.data_if.ip,
        data_port: config.gnodeb.data_if.port,
        data_subnet: config.gnodeb.data_if.subnet,
    };
    let network = Plmn::new(&config.gnodeb.plmn.mcc, &config.gnodeb.plmn.mnc);
    let stations = plan_stations(topology, scenario.num_ues, &plan, &network)?;

    let endpoints = (1..=scenario.num_ues)
        .map(|ue_id| -> Result<(u32, String, String), EngineError> {
            let msin = identities.derive(ue_id)?;
            let station = stations
                .get(station_slot(topology, ue_id))
                .ok_or(EngineError::MissingStation(ue_id))?;
            Ok((ue_id, msin, station.gnb_id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ScenarioPlan {
        topology,
        subscriber_plmn: Plmn::new(&config.ue.plmn.mcc, &config.ue.plmn.mnc),
        stations,
        endpoints,
    })
}

fn station_slot(topology: Topology, ue_id: u32) -> usize {
    (topology.station_index_for(ue_id) - 1) as usize
}

/// Outcome of one supervisor run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub iterations_started: u32,
    pub iterations_completed: u32,
    pub stations_built: usize,
    pub actors_spawned: usize,
    pub spawn_failures: usize,
    pub actor_panics: usize,
    pub interrupted: bool,
    /// Units the join barrier saw over the whole run (stations plus actors).
    pub barrier_units: usize,
    pub actors: Vec<ActorReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn timed_out(&self) -> usize {
        self.actors.iter().filter(|actor| actor.timed_out).count()
    }

    pub fn registered(&self) -> usize {
        self.actors
            .iter()
            .filter(|actor| actor.registrations_observed > 0)
            .count()
    }
}

pub struct FleetSupervisor<G: StationRuntime, U: EndpointRuntime> {
    config: Arc<TesterConfig>,
    scenario: ScenarioConfig,
    plan: ScenarioPlan,
    stations: G,
    endpoints: U,
    metrics: Arc<MetricsRecorder>,
    barrier: JoinBarrier,
}

impl<G: StationRuntime, U: EndpointRuntime> FleetSupervisor<G, U> {
    /// Runs pre-flight checks; fails without touching either runtime.
    pub fn new(
        config: TesterConfig,
        scenario: ScenarioConfig,
        stations: G,
        endpoints: U,
        metrics: Arc<MetricsRecorder>,
    ) -> Result<Self, EngineError> {
        let plan = preflight(&config, &scenario)?;
        debug!(
            stations = plan.stations.len(),
            ues = plan.endpoints.len(),
            "pre-flight passed"
        );

        Ok(Self {
            config: Arc::new(config),
            scenario,
            plan,
            stations,
            endpoints,
            metrics,
            barrier: JoinBarrier::new(),
        })
    }

    pub fn plan(&self) -> &ScenarioPlan {
        &self.plan
    }

    pub fn barrier(&self) -> &JoinBarrier {
        &self.barrier
    }

    fn actor_settings(&self) -> ActorSettings {
        let registration_timeout = match self.config.ue.registration_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        ActorSettings {
            sessions_per_ue: self.scenario.num_pdu_sessions,
            deregistration_delay: self.scenario.deregistration_delay(),
            registration_timeout,
        }
    }

    /// Runs the scenario until it completes or `cancel` fires, then joins
    /// every station and actor it started.
    #[instrument(skip_all, fields(num_ues = self.scenario.num_ues, dedicated = self.scenario.dedicated_gnb))]
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport, EngineError> {
        let started = Instant::now();
        let mut report = RunReport::default();
        let station_shutdown = CancellationToken::new();

        EventLogger::log_event(
            "scenario_started",
            vec![
                KeyValue::new("num_ues", i64::from(self.scenario.num_ues)),
                KeyValue::new("stations", self.plan.stations.len() as i64),
                KeyValue::new("loop", self.scenario.loop_enabled),
                KeyValue::new("pdu_sessions", i64::from(self.scenario.num_pdu_sessions)),
            ],
        )
        .await;

        let stations = match self.build_stations(&station_shutdown).await {
            Ok(stations) => stations,
            Err(e) => {
                error!("station start failed: {e}");
                station_shutdown.cancel();
                self.barrier.wait().await;
                return Err(e);
            }
        };
        report.stations_built = stations.len();

        let mut table = MailboxTable::new();
        let mut actors = JoinSet::new();

        // The first UE is always spawned; the interrupt is polled after each spawn.
        let churned = self
            .churn(&stations, &mut table, &mut actors, &cancel, &mut report)
            .await;
        if churned.is_ok() {
            self.drain(&mut table, &cancel, &mut report).await;
        }

        let accepted = table.terminate_all().await;
        debug!(accepted, "terminate sent to remaining UEs");
        station_shutdown.cancel();
        self.barrier.wait().await;

        while let Some(joined) = actors.join_next().await {
            match joined {
                Ok(actor) => report.actors.push(actor),
                Err(e) => {
                    error!("UE task failed: {e}");
                    report.actor_panics += 1;
                }
            }
        }
        churned?;
        report.actors.sort_by_key(|actor| (actor.generation, actor.ue_id));
        report.barrier_units = self.barrier.total_registered();
        report.elapsed = started.elapsed();

        info!(
            actors = report.actors_spawned,
            registered = report.registered(),
            timed_out = report.timed_out(),
            interrupted = report.interrupted,
            elapsed = ?report.elapsed,
            "scenario complete"
        );
        EventLogger::log_event(
            "scenario_complete",
            vec![
                KeyValue::new("actors_spawned", report.actors_spawned as i64),
                KeyValue::new("iterations", i64::from(report.iterations_completed)),
                KeyValue::new("interrupted", report.interrupted),
            ],
        )
        .await;

        Ok(report)
    }

    /// Starts every planned station, then waits for them to be ready.
    async fn build_stations(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<BaseStationSet, EngineError> {
        let mut set = BaseStationSet::new(self.plan.topology);
        let mut acks = Vec::new();
        let mut unacknowledged = 0;

        for station in &self.plan.stations {
            info!(
                gnb_id = %station.gnb_id,
                control = %SocketAddr::new(station.control_ip, station.control_port),
                data = %SocketAddr::new(station.data_ip, station.data_port),
                plmn = %station.plmn,
                "starting gNB"
            );
            let handle = self
                .stations
                .start(station.clone(), &self.barrier, shutdown.clone())
                .await?;
            match handle.ready {
                Some(ready) => acks.push((handle.context.gnb_id.clone(), ready)),
                None => unacknowledged += 1,
            }
            set.insert(handle.context)?;
        }

        self.await_readiness(acks, unacknowledged).await;
        Ok(set)
    }

    async fn await_readiness(
        &self,
        acks: Vec<(String, oneshot::Receiver<()>)>,
        unacknowledged: usize,
    ) {
        let ready_timeout = Duration::from_millis(self.config.gnodeb.ready_timeout_ms);
        let pending = acks.len();
        let all_ready = async {
            for (gnb_id, ready) in acks {
                if ready.await.is_err() {
                    warn!(%gnb_id, "gNB exited before reporting ready");
                }
            }
        };
        if timeout(ready_timeout, all_ready).await.is_err() {
            warn!(pending, ?ready_timeout, "gNBs not ready in time, continuing");
        }

        if unacknowledged > 0 {
            let settle = Duration::from_millis(self.config.gnodeb.settle_delay_ms);
            debug!(unacknowledged, ?settle, "waiting for gNBs without ready signal");
            sleep(settle).await;
        }
    }

    /// Spawns the fleet once, or repeatedly when looping, in ascending UE order.
    async fn churn(
        &self,
        stations: &BaseStationSet,
        table: &mut MailboxTable,
        actors: &mut JoinSet<ActorReport>,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<(), EngineError> {
        let settings = self.actor_settings();
        let spawn_delay = self.scenario.spawn_delay();

        'iterations: loop {
            report.iterations_started += 1;
            debug!(iteration = report.iterations_started, "spawning UE batch");

            for (ue_id, msin, _) in &self.plan.endpoints {
                let ue_id = *ue_id;
                let station = stations
                    .station_for_ue(ue_id)
                    .cloned()
                    .ok_or(EngineError::MissingStation(ue_id))?;

                // Waits for the previous incarnation to accept Terminate.
                let (handle, mailbox) = table.reopen(ue_id).await;
                let spec = EndpointSpec {
                    ue_id,
                    identity: msin.clone(),
                    plmn: self.plan.subscriber_plmn.clone(),
                    generation: handle.generation(),
                    tunnel_enabled: self.scenario.tunnel_enabled,
                };

                match self.endpoints.start(spec, Arc::clone(&station)).await {
                    Ok(session) => {
                        let context = EndpointContext::new(ue_id, msin.clone(), station);
                        let actor = EndpointActor::new(
                            context,
                            session,
                            (handle, mailbox),
                            settings,
                            Arc::clone(&self.metrics),
                            self.barrier.enter(),
                        );
                        actors.spawn(actor.into_task());
                        report.actors_spawned += 1;
                    }
                    Err(e) => {
                        warn!(ue_id, "UE failed to start: {e}");
                        report.spawn_failures += 1;
                    }
                }

                while let Some(joined) = actors.try_join_next() {
                    match joined {
                        Ok(actor) => report.actors.push(actor),
                        Err(e) => {
                            error!("UE task failed: {e}");
                            report.actor_panics += 1;
                        }
                    }
                }

                sleep(spawn_delay).await;
                if cancel.is_cancelled() {
                    info!(ue_id, "interrupt received, no further UEs will be spawned");
                    report.interrupted = true;
                    break 'iterations;
                }
            }

            report.iterations_completed += 1;
            if !self.scenario.loop_enabled {
                break;
            }
        }
        Ok(())
    }

    /// Waits until the fleet is done, the run is interrupted, or the hold time ends.
    async fn drain(
        &self,
        table: &mut MailboxTable,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) {
        let live = table.live_handles();
        if live.is_empty() {
            return;
        }
        let hold = self.scenario.hold();
        let all_terminated = async {
            for handle in &live {
                handle.closed().await;
            }
        };

        tokio::select! {
            _ = all_terminated => debug!("every UE terminated on its own"),
            _ = cancel.cancelled() => {
                if !report.interrupted {
                    info!("interrupt received, stopping UEs");
                }
                report.interrupted = true;
            }
            _ = sleep(hold.unwrap_or_default()), if hold.is_some() => {
                info!(?hold, "hold time elapsed, stopping UEs");
            }
        }
    }
}
