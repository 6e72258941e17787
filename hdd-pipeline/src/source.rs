use chrono::{DateTime, Utc};
use hdd_compute::DailyAggregates;
use hdd_core::record::{HddRecord, Source};
use hdd_core::run::RunId;
use std::path::{Path, PathBuf};

/// A grid file made available locally for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub path: PathBuf,
    pub downloaded_at: DateTime<Utc>,
}

/// What a source computes from one grid file.
#[derive(Debug, Clone)]
pub struct SourceOutput {
    pub records: Vec<HddRecord>,
    /// Daily regional series, present for forecasts only.
    pub daily: Option<DailyAggregates>,
}

/// Acquisition and computation capability of one data source.
pub trait Downloader {
    fn source(&self) -> Source;

    /// Most recent run the upstream has published, if any.
    fn check_latest_available(&self) -> anyhow::Result<Option<RunId>>;

    /// True when the run sits on the source's issue cadence.
    fn is_valid_run(&self, run: &RunId) -> bool;

    fn download(&self, run: &RunId) -> anyhow::Result<Download>;

    fn compute(&self, path: &Path, run: &RunId) -> anyhow::Result<SourceOutput>;
}
