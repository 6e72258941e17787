//! HDD CLI - population-weighted heating degree day forecasts and comparisons.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "hdd",
    version,
    about = "Population-weighted heating degree day engine"
)]
struct Cli {
    #[command(subcommand)]
    command: hdd_pipeline::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    hdd_pipeline::run(cli.command)
}
