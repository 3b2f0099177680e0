//! ## rantester
//! Multi-UE load tester: drives a fleet of simulated UEs through
//! registration and PDU session establishment against simulated gNBs.

use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    commands::run_command(Cli::parse()).await
}
