use crate::archive::GridArchive;
use crate::source::{Download, Downloader, SourceOutput};
use anyhow::Context;
use hdd_compute::HddComputer;
use hdd_core::record::Source;
use hdd_core::run::RunId;
use std::path::Path;

/// Issue hours (UTC) of the forecast model.
pub const FORECAST_CADENCE: [u32; 2] = [0, 12];

/// ECMWF open-data forecasts, 00z and 12z runs.
pub struct ForecastSource {
    archive: GridArchive,
    computer: HddComputer,
}

impl ForecastSource {
    pub fn new(archive: GridArchive, computer: HddComputer) -> Self {
        ForecastSource { archive, computer }
    }
}

impl Downloader for ForecastSource {
    fn source(&self) -> Source {
        self.computer.source()
    }

    fn check_latest_available(&self) -> anyhow::Result<Option<RunId>> {
        self.archive.latest()
    }

    fn is_valid_run(&self, run: &RunId) -> bool {
        run.is_on_cadence(&FORECAST_CADENCE)
    }

    fn download(&self, run: &RunId) -> anyhow::Result<Download> {
        self.archive.fetch(run)
    }

    fn compute(&self, path: &Path, run: &RunId) -> anyhow::Result<SourceOutput> {
        let output = self
            .computer
            .compute_forecast(path, run)
            .with_context(|| format!("computing forecast {run} from {}", path.display()))?;
        Ok(SourceOutput {
            records: output.records,
            daily: Some(output.daily),
        })
    }
}
