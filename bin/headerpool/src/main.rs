//! Headerpool binary
//!
//! Runs a local miner: a development chain feeds templates into a header
//! cache, and a pool of workers requests, solves and submits headers.

#![allow(missing_docs)]

mod mine;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "headerpool")]
#[command(about = "Proof-of-work header issuance and submission")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mine blocks on an in-memory development chain
    Mine(mine::MineArgs),
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    match cli.command {
        Command::Mine(args) => runtime.block_on(args.run()),
    }
}
