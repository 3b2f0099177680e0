/*!
# Runtime entry points

Wires the fleet supervisor to the in-process gNB/UE stand-ins so frontends
(the CLI, tests) can run a scenario with one call.
*/

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use rantester_config::{ScenarioConfig, TesterConfig};
use rantester_simulator::{Simulation, SimulationLedger};
use rantester_telemetry::MetricsRecorder;

use crate::engine::{preflight, EngineError, FleetSupervisor, RunReport, ScenarioPlan};

/// Validates a scenario and derives its topology without starting anything.
pub fn plan_scenario(
    config: &TesterConfig,
    scenario: &ScenarioConfig,
) -> Result<ScenarioPlan, EngineError> {
    preflight(config, scenario)
}

/// Runs a scenario against the simulated runtimes until it completes or
/// `cancel` fires.
#[instrument(level = "info", name = "run_simulated_scenario", skip_all)]
pub async fn run_simulated_scenario(
    config: TesterConfig,
    scenario: ScenarioConfig,
    metrics: Arc<MetricsRecorder>,
    cancel: CancellationToken,
) -> Result<(RunReport, SimulationLedger), EngineError> {
    let simulation = Simulation::new(&config.simulator);
    let ledger = simulation.ledger.clone();

    let supervisor = FleetSupervisor::new(
        config,
        scenario,
        simulation.stations,
        simulation.endpoints,
        metrics,
    )?;
    info!(
        stations = supervisor.plan().stations.len(),
        ues = supervisor.plan().endpoints.len(),
        "starting scenario"
    );

    let report = supervisor.run(cancel).await?;
    Ok((report, ledger))
}
