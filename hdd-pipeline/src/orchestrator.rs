use crate::logging::LogContext;
use crate::source::Downloader;
use anyhow::Context;
use hdd_compute::{Climatology, Comparator, CoveragePolicy};
use hdd_core::record::{RunResults, Source};
use hdd_core::repository::Repository;
use log::{info, warn};
use std::rc::Rc;

/// Comparison stage of a forecast orchestrator.
pub struct ComparisonSettings {
    pub climatology: Climatology,
    /// Process a run whose previous run was never stored, without the
    /// forecast-vs-forecast delta. Needed to bootstrap an empty store.
    pub allow_missing_previous: bool,
    pub coverage: CoveragePolicy,
}

impl ComparisonSettings {
    pub fn new(climatology: Climatology) -> Self {
        ComparisonSettings {
            climatology,
            allow_missing_previous: false,
            coverage: CoveragePolicy::default(),
        }
    }
}

/// One idempotent pass over a source: find the newest run, skip it if already
/// stored, otherwise download, compute, compare and persist it.
pub struct Orchestrator {
    downloader: Box<dyn Downloader>,
    repository: Rc<dyn Repository>,
    comparison: Option<ComparisonSettings>,
    log: LogContext,
}

impl Orchestrator {
    pub fn new(
        downloader: Box<dyn Downloader>,
        repository: Rc<dyn Repository>,
        log: LogContext,
    ) -> Self {
        Orchestrator {
            downloader,
            repository,
            comparison: None,
            log,
        }
    }

    pub fn with_comparison(mut self, settings: ComparisonSettings) -> Self {
        self.comparison = Some(settings);
        self
    }

    pub fn source(&self) -> Source {
        self.downloader.source()
    }

    /// `Ok(true)` when new data was persisted, `Ok(false)` for every expected
    /// skip. Nothing is written unless the whole pass succeeds.
    pub fn run(&self) -> anyhow::Result<bool> {
        let target = self.log.target();
        let source = self.downloader.source();

        let Some(run) = self
            .downloader
            .check_latest_available()
            .with_context(|| format!("checking latest {source} run"))?
        else {
            info!(target: target, "no {source} run available");
            return Ok(false);
        };

        if !self.downloader.is_valid_run(&run) {
            info!(target: target, "{source} run {run} is off cadence, skipped");
            return Ok(false);
        }

        if self.repository.exists_for_date(run.time, source)? {
            info!(target: target, "{source} run {run} already processed");
            return Ok(false);
        }

        let previous = match &self.comparison {
            Some(settings) => {
                let previous_run = run.previous();
                let stored = self.repository.get_forecast(previous_run.time)?;
                if stored.is_none() {
                    if !settings.allow_missing_previous {
                        info!(
                            target: target,
                            "{source} run {run}: previous run {previous_run} not stored yet"
                        );
                        return Ok(false);
                    }
                    warn!(
                        target: target,
                        "{source} run {run}: previous run {previous_run} missing, skipping forecast delta"
                    );
                }
                stored
            }
            None => None,
        };

        let download = self
            .downloader
            .download(&run)
            .with_context(|| format!("downloading {source} run {run}"))?;
        info!(
            target: target,
            "{source} run {run}: grid {} ({})",
            download.path.display(),
            download.downloaded_at
        );

        let output = self.downloader.compute(&download.path, &run)?;
        if output.records.is_empty() {
            anyhow::bail!("{source} run {run} produced no records");
        }

        let mut results = RunResults::new(output.records);
        if let Some(settings) = &self.comparison {
            let comparator = Comparator::new(settings.coverage);
            results
                .comparisons
                .extend(comparator.baseline_delta(&results.records, &settings.climatology));
            match (&previous, &output.daily) {
                (Some(previous), Some(daily)) => {
                    let deltas = comparator
                        .forecast_delta(previous, daily, &run)
                        .with_context(|| format!("comparing {run} with {}", run.previous()))?;
                    results.comparisons.extend(deltas);
                }
                (Some(_), None) => {
                    warn!(target: target, "{source} has no daily series, forecast delta skipped");
                }
                (None, _) => {}
            }
        }

        self.repository
            .insert_results(&results)
            .with_context(|| format!("storing {source} run {run}"))?;
        info!(
            target: target,
            "{source} run {run}: stored {} records, {} comparisons",
            results.records.len(),
            results.comparisons.len()
        );
        Ok(true)
    }
}
