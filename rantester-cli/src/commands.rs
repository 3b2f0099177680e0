use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rantester_config::{ScenarioConfig, TesterConfig};
use rantester_engine::engine::{RunReport, ScenarioPlan};
use rantester_engine::{plan_scenario, run_simulated_scenario};
use rantester_telemetry::{EventLogger, MetricsRecorder};

#[derive(Parser)]
#[command(name = "rantester", version, about)]
pub struct Cli {
    /// Configuration file; defaults to config/rantester.yaml plus environment
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a fleet of UEs against simulated gNBs
    MultiUe(ScenarioArgs),
    /// Load and validate the configuration, then print it
    CheckConfig,
    /// Print the gNBs and UE identities a scenario would use, without starting anything
    Plan(ScenarioArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScenarioArgs {
    /// Scenario file; flags below override its values
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,
    #[arg(short = 'n', long)]
    pub number_of_ues: Option<u32>,
    /// Bring up a tunnel interface per UE (needs --dedicated-gnb)
    #[arg(long)]
    pub tunnel: bool,
    /// One gNB per UE instead of a shared one
    #[arg(long)]
    pub dedicated_gnb: bool,
    /// Keep re-spawning the fleet until interrupted
    #[arg(long = "loop")]
    pub loop_enabled: bool,
    /// Delay between two UE spawns, in ms
    #[arg(long)]
    pub time_between_registration: Option<u64>,
    /// Terminate each UE this many ms after it spawned
    #[arg(long)]
    pub time_before_deregistration: Option<u64>,
    #[arg(long)]
    pub num_pdu_sessions: Option<u8>,
    /// Stop the fleet after this many ms once everything is spawned
    #[arg(long)]
    pub hold: Option<u64>,
}

impl ScenarioArgs {
    fn into_scenario(self) -> anyhow::Result<ScenarioConfig> {
        let mut scenario = match &self.scenario {
            Some(path) => ScenarioConfig::load_from_path(path)
                .with_context(|| format!("loading scenario {}", path.display()))?,
            None => ScenarioConfig::default(),
        };

        if let Some(num_ues) = self.number_of_ues {
            scenario.num_ues = num_ues;
        }
        scenario.tunnel_enabled |= self.tunnel;
        scenario.dedicated_gnb |= self.dedicated_gnb;
        scenario.loop_enabled |= self.loop_enabled;
        if let Some(delay) = self.time_between_registration {
            scenario.time_between_registration_ms = delay;
        }
        if let Some(delay) = self.time_before_deregistration {
            scenario.time_before_deregistration_ms = delay;
        }
        if let Some(sessions) = self.num_pdu_sessions {
            scenario.num_pdu_sessions = sessions;
        }
        if self.hold.is_some() {
            scenario.hold_ms = self.hold;
        }
        Ok(scenario)
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => TesterConfig::load_from_path(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => TesterConfig::load().context("loading configuration")?,
    };
    EventLogger::try_init(&config.telemetry)?;

    match cli.command {
        Commands::MultiUe(args) => multi_ue(config, args.into_scenario()?).await,
        Commands::CheckConfig => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Commands::Plan(args) => {
            let plan = plan_scenario(&config, &args.into_scenario()?)?;
            print_plan(&plan);
            Ok(())
        }
    }
}

async fn multi_ue(config: TesterConfig, scenario: ScenarioConfig) -> anyhow::Result<()> {
    let metrics = Arc::new(MetricsRecorder::new()?);
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                interrupt.cancel();
            }
            Err(e) => warn!("cannot listen for Ctrl-C: {e}"),
        }
    });

    let (report, ledger) =
        run_simulated_scenario(config, scenario, Arc::clone(&metrics), cancel).await?;
    print_report(&report);
    println!("UE starts seen by the runtime: {}", ledger.total_starts());
    println!();
    print!("{}", metrics.gather_metrics()?);
    Ok(())
}

fn print_plan(plan: &ScenarioPlan) {
    println!("{:<8} {:<8} {:<46} {:<46}", "gNB", "PLMN", "N2", "N3");
    for station in &plan.stations {
        println!(
            "{:<8} {:<8} {:<46} {:<46}",
            station.gnb_id,
            station.plmn.to_string(),
            SocketAddr::new(station.control_ip, station.control_port).to_string(),
            SocketAddr::new(station.data_ip, station.data_port).to_string(),
        );
    }
    println!();
    println!("{:<8} {:<40} {:<8}", "UE", "IMSI", "gNB");
    for (ue_id, msin, gnb_id) in &plan.endpoints {
        let imsi = plan.subscriber_plmn.imsi(msin);
        println!("{:<8} {:<40} {:<8}", ue_id, imsi, gnb_id);
    }
}

fn print_report(report: &RunReport) {
    println!(
        "iterations: {} started, {} completed{}",
        report.iterations_started,
        report.iterations_completed,
        if report.interrupted { " (interrupted)" } else { "" }
    );
    println!("gNBs: {}", report.stations_built);
    println!(
        "UEs: {} spawned, {} registered, {} timed out, {} failed to start",
        report.actors_spawned,
        report.registered(),
        report.timed_out(),
        report.spawn_failures
    );
    for actor in &report.actors {
        println!(
            "  ue {:>4} gen {:>4} msin {} gnb {} sessions {}/{} {}{}",
            actor.ue_id,
            actor.generation,
            actor.identity,
            actor.gnb_id,
            actor.sessions_established,
            actor.session_commands_issued,
            actor.final_phase,
            if actor.timed_out { " timed-out" } else { "" }
        );
    }
    println!("elapsed: {:?}", report.elapsed);
}
