use crate::archive::GridArchive;
use crate::source::{Download, Downloader, SourceOutput};
use anyhow::Context;
use hdd_compute::HddComputer;
use hdd_core::record::Source;
use hdd_core::run::RunId;
use std::path::Path;

/// Observation days are stamped at 00z.
pub const OBSERVATION_CADENCE: [u32; 1] = [0];

/// ERA5-Land reanalysis, one grid per observed day.
pub struct ObservationSource {
    archive: GridArchive,
    computer: HddComputer,
}

impl ObservationSource {
    pub fn new(archive: GridArchive, computer: HddComputer) -> Self {
        ObservationSource { archive, computer }
    }
}

impl Downloader for ObservationSource {
    fn source(&self) -> Source {
        self.computer.source()
    }

    fn check_latest_available(&self) -> anyhow::Result<Option<RunId>> {
        self.archive.latest()
    }

    fn is_valid_run(&self, run: &RunId) -> bool {
        run.is_on_cadence(&OBSERVATION_CADENCE)
    }

    fn download(&self, run: &RunId) -> anyhow::Result<Download> {
        self.archive.fetch(run)
    }

    fn compute(&self, path: &Path, run: &RunId) -> anyhow::Result<SourceOutput> {
        let records = self
            .computer
            .compute_observation(path, run)
            .with_context(|| format!("computing observation {run} from {}", path.display()))?;
        Ok(SourceOutput {
            records,
            daily: None,
        })
    }
}
