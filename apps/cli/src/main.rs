//! Migration planner CLI.
//!
//! Generates AWS migration plans and batch migration-pattern recommendations
//! from Bedrock knowledge bases, locally or as a Bedrock agent action group.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
