//! Builds the orchestrators and runner from command-line options.

use crate::archive::GridArchive;
use crate::clock::SystemClock;
use crate::forecast::ForecastSource;
use crate::logging::LogContext;
use crate::observation::ObservationSource;
use crate::orchestrator::{ComparisonSettings, Orchestrator};
use crate::runner::{ReleaseGate, Runner, TickOutcome};
use crate::source::Downloader;
use crate::RunArgs;
use anyhow::Context;
use hdd_compute::{Climatology, HddComputer, PopulationGrid, RegionIndexCache, RegionSet};
use hdd_core::record::Source;
use hdd_core::repository::Repository;
use hdd_db::Database;
use log::info;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

/// Long-running polling service.
pub fn run_service(args: &RunArgs) -> anyhow::Result<()> {
    let gate = if args.no_release_gate {
        ReleaseGate::always_open()
    } else {
        ReleaseGate::parse(&args.release_windows)?
    };
    let runner = build_runner(args)?
        .with_gate(gate)
        .with_poll_interval(Duration::from_secs(args.poll_interval));
    runner.run_forever()
}

/// One pass over every source, outside any release window.
pub fn run_once(args: &RunArgs) -> anyhow::Result<()> {
    let runner = build_runner(args)?;
    if let TickOutcome::Ran(outcomes) = runner.tick() {
        for (source, outcome) in outcomes {
            info!("{source}: {outcome:?}");
        }
    }
    Ok(())
}

fn build_runner(args: &RunArgs) -> anyhow::Result<Runner> {
    let log = LogContext::default();
    let regions = RegionSet::load(&args.regions, &args.region_property)
        .with_context(|| format!("loading regions from {}", args.regions.display()))?;
    let cache = Rc::new(RegionIndexCache::new(regions));
    let database: Rc<dyn Repository> = Rc::new(Database::open(&args.database)?);

    let mut orchestrators = Vec::new();
    if let Some(dir) = &args.forecast_dir {
        let computer = computer_for(
            Source::Ecmwf,
            args.forecast_population.as_deref(),
            dir,
            &cache,
            args,
        )?;
        let source = ForecastSource::new(forecast_archive(dir, args)?, computer);
        let mut orchestrator = Orchestrator::new(
            Box::new(source),
            Rc::clone(&database),
            log.child(Source::Ecmwf.as_str()),
        );
        if let Some(path) = &args.baseline {
            orchestrator = orchestrator.with_comparison(ComparisonSettings {
                climatology: Climatology::read_csv(path)
                    .with_context(|| format!("loading baseline {}", path.display()))?,
                allow_missing_previous: args.allow_missing_previous,
                coverage: args.coverage,
            });
        }
        orchestrators.push(orchestrator);
    }
    if let Some(dir) = &args.observation_dir {
        let computer = computer_for(
            Source::Era5Land,
            args.observation_population.as_deref(),
            dir,
            &cache,
            args,
        )?;
        let source: Box<dyn Downloader> =
            Box::new(ObservationSource::new(GridArchive::directory(dir), computer));
        orchestrators.push(Orchestrator::new(
            source,
            Rc::clone(&database),
            log.child(Source::Era5Land.as_str()),
        ));
    }
    if orchestrators.is_empty() {
        anyhow::bail!("no source configured: set --forecast-dir and/or --observation-dir");
    }

    Ok(Runner::new(orchestrators, Rc::new(SystemClock), log))
}

/// Population grid defaults to `population.csv` inside the grid directory.
fn computer_for(
    source: Source,
    population: Option<&Path>,
    grid_dir: &Path,
    cache: &Rc<RegionIndexCache>,
    args: &RunArgs,
) -> anyhow::Result<HddComputer> {
    let path = population
        .map(Path::to_path_buf)
        .unwrap_or_else(|| grid_dir.join("population.csv"));
    let population = PopulationGrid::read_csv(&path)
        .with_context(|| format!("loading {source} population grid {}", path.display()))?;
    Ok(HddComputer::new(source, population, Rc::clone(cache)).with_coverage(args.coverage))
}

#[cfg(feature = "http")]
fn forecast_archive(dir: &Path, args: &RunArgs) -> anyhow::Result<GridArchive> {
    match &args.forecast_url {
        Some(url) => Ok(GridArchive::Http(crate::archive::HttpArchive::new(
            url.as_str(),
            dir.to_path_buf(),
            Duration::from_secs(args.download_timeout),
        )?)),
        None => Ok(GridArchive::directory(dir.to_path_buf())),
    }
}

#[cfg(not(feature = "http"))]
fn forecast_archive(dir: &Path, _args: &RunArgs) -> anyhow::Result<GridArchive> {
    Ok(GridArchive::directory(dir.to_path_buf()))
}
