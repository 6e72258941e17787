//! Run orchestration and commands for the HDD engine.
//!
//! Each data source is an [`Orchestrator`] over a [`Downloader`]; the
//! [`Runner`] polls every orchestrator inside the release windows. The
//! [`Command`] set wires sources, the database and the baseline together for
//! the `hdd` binary.

use clap::{Args, Subcommand};
use std::path::PathBuf;

pub mod archive;
pub mod baseline;
pub mod clock;
pub mod forecast;
pub mod logging;
pub mod observation;
pub mod orchestrator;
pub mod runner;
pub mod service;
pub mod source;

pub use archive::GridArchive;
pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::LogContext;
pub use orchestrator::{ComparisonSettings, Orchestrator};
pub use runner::{ReleaseGate, ReleaseWindow, Runner, TickOutcome};
pub use source::{Download, Downloader, SourceOutput};

/// Options shared by `run` and `once`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// SQLite database file
    #[arg(long, env = "HDD_DATABASE", default_value = "hdd.sqlite")]
    pub database: PathBuf,

    /// GeoJSON region boundaries
    #[arg(long, env = "HDD_REGIONS")]
    pub regions: PathBuf,

    /// Feature property holding the region name
    #[arg(long, default_value = hdd_compute::regions::DEFAULT_NAME_PROPERTY)]
    pub region_property: String,

    /// Forecast grid directory (download target when a mirror is set)
    #[arg(long, env = "DOWNLOAD_ECMWF_PATH")]
    pub forecast_dir: Option<PathBuf>,

    /// Population grid at the forecast resolution
    #[arg(long, requires = "forecast_dir")]
    pub forecast_population: Option<PathBuf>,

    /// Observation grid directory
    #[arg(long, env = "DOWNLOAD_ERA5_PATH")]
    pub observation_dir: Option<PathBuf>,

    /// Population grid at the observation resolution
    #[arg(long, requires = "observation_dir")]
    pub observation_population: Option<PathBuf>,

    /// Climatology CSV; enables forecast comparisons
    #[arg(long, env = "BASE_FILE_PATH")]
    pub baseline: Option<PathBuf>,

    /// Seconds between two polls
    #[arg(long, env = "HDD_POLL_INTERVAL", default_value_t = runner::DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval: u64,

    /// UTC release window, HH:MM-HH:MM (repeatable)
    #[arg(long = "release-window", default_values_t = runner::DEFAULT_RELEASE_WINDOWS.map(String::from))]
    pub release_windows: Vec<String>,

    /// Poll at any hour
    #[arg(long)]
    pub no_release_gate: bool,

    /// Horizons longer than the grid: truncate or reject
    #[arg(long, default_value = "truncate")]
    pub coverage: hdd_compute::CoveragePolicy,

    /// Process a forecast even when the previous run was never stored
    #[arg(long)]
    pub allow_missing_previous: bool,

    /// Forecast mirror base URL
    #[cfg(feature = "http")]
    #[arg(long, env = "HDD_FORECAST_URL")]
    pub forecast_url: Option<String>,

    /// Per-request download timeout in seconds
    #[cfg(feature = "http")]
    #[arg(long, default_value_t = 600)]
    pub download_timeout: u64,
}

#[derive(Subcommand)]
pub enum Command {
    /// Poll the configured sources until stopped
    Run(RunArgs),

    /// Run every source once, ignoring release windows
    Once(RunArgs),

    /// Average stored observations into a climatology CSV
    BuildBaseline {
        /// SQLite database file
        #[arg(long, env = "HDD_DATABASE", default_value = "hdd.sqlite")]
        database: PathBuf,

        /// First winter year included
        #[arg(long)]
        start_year: i32,

        /// Last winter year included
        #[arg(long)]
        end_year: i32,

        /// Output CSV path
        #[arg(short = 'o', long, env = "BASE_FILE_PATH")]
        output: PathBuf,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run(args) => service::run_service(&args),
        Command::Once(args) => service::run_once(&args),
        Command::BuildBaseline {
            database,
            start_year,
            end_year,
            output,
        } => baseline::build_baseline(&database, start_year, end_year, &output),
    }
}
