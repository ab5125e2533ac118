mod auth;
mod cli;
mod config;
mod devops;
mod environment;
mod error;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting FreeCICD - Azure DevOps pipeline wiring");
    cli.execute().await?;

    Ok(())
}
