use crate::aggregate::{CoveragePolicy, DailyAggregates};
use crate::degree_day::heating_degree_days;
use crate::grid::{BoundingBox, DailyField, TemperatureGrid, CONUS};
use crate::population::PopulationGrid;
use crate::regions::RegionIndexCache;
use chrono::{Duration, NaiveTime};
use hdd_core::error::Result;
use hdd_core::horizon::Horizon;
use hdd_core::record::{HddRecord, Source};
use hdd_core::run::RunId;
use std::path::Path;
use std::rc::Rc;

/// Result of one forecast computation: the per-horizon records plus the daily
/// series they were summed from, kept for the forecast-vs-forecast delta.
#[derive(Debug, Clone)]
pub struct ForecastOutput {
    pub records: Vec<HddRecord>,
    pub daily: DailyAggregates,
}

/// Turns raw Kelvin grids of one source into population-weighted HDD records.
pub struct HddComputer {
    source: Source,
    population: PopulationGrid,
    regions: Rc<RegionIndexCache>,
    bounds: BoundingBox,
    coverage: CoveragePolicy,
}

impl HddComputer {
    pub fn new(source: Source, population: PopulationGrid, regions: Rc<RegionIndexCache>) -> Self {
        HddComputer {
            source,
            population,
            regions,
            bounds: CONUS,
            coverage: CoveragePolicy::default(),
        }
    }

    pub fn with_coverage(mut self, coverage: CoveragePolicy) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn coverage(&self) -> CoveragePolicy {
        self.coverage
    }

    /// Crop, convert and window a forecast grid, then aggregate its daily
    /// degree days over the run's comparison window. A 00z run keeps its base
    /// date, the first valid day of the previous 12z run; records only use
    /// the days from the run's own first valid day.
    pub fn forecast_daily(&self, grid: &TemperatureGrid, run: &RunId) -> Result<DailyAggregates> {
        let mut us = grid.crop(&self.bounds);
        us.to_fahrenheit();
        let (start, end) = run.comparison_window();
        let daily = us.swap_to_valid_time().window(start, end)?.daily_means();
        self.aggregate(&daily)
    }

    /// Horizon records followed by one record per (region, valid day).
    pub fn forecast(&self, grid: &TemperatureGrid, run: &RunId) -> Result<ForecastOutput> {
        let daily = self.forecast_daily(grid, run)?;
        let mut records = self.horizon_records(&daily, run)?;
        let horizons = records.len();
        records.extend(self.daily_records(&daily, run));
        log::info!(
            "{} run {}: {} horizon and {} daily records",
            self.source,
            run,
            horizons,
            records.len() - horizons
        );
        Ok(ForecastOutput { records, daily })
    }

    /// Daily population-weighted HDD from the run's first valid day on.
    pub fn daily_records(&self, daily: &DailyAggregates, run: &RunId) -> Vec<HddRecord> {
        let first = run.first_valid_day();
        let mut records = Vec::new();
        for region in daily.regions() {
            for &day in daily.days().iter().filter(|day| **day >= first) {
                if let Some(value) = daily.daily_value(region, day) {
                    records.push(HddRecord::forecast_day(
                        run.time,
                        region,
                        day.and_time(NaiveTime::MIN),
                        value,
                        self.source,
                    ));
                }
            }
        }
        records
    }

    /// One record per (region, standard horizon) of the run.
    pub fn horizon_records(&self, daily: &DailyAggregates, run: &RunId) -> Result<Vec<HddRecord>> {
        let horizons = Horizon::forecast_set(run.first_valid_day());
        Ok(daily
            .horizon_values(&horizons, self.coverage)?
            .into_iter()
            .map(|(region, horizon, value)| {
                HddRecord::forecast(run.time, region, horizon, value, self.source)
            })
            .collect())
    }

    pub fn compute_forecast(&self, path: &Path, run: &RunId) -> Result<ForecastOutput> {
        let grid = TemperatureGrid::read_csv(path)?;
        self.forecast(&grid, run)
    }

    /// Daily HDD for the run's calendar day, one record per region.
    pub fn observation(&self, grid: &TemperatureGrid, run: &RunId) -> Result<Vec<HddRecord>> {
        let day = run.base_date();
        let mut us = grid.crop(&self.bounds);
        us.to_fahrenheit();
        let valid_time = day.and_time(NaiveTime::MIN);
        let daily = us
            .swap_to_valid_time()
            .window(valid_time, valid_time + Duration::seconds(86_399))?
            .daily_means();
        let aggregates = self.aggregate(&daily)?;
        let records: Vec<HddRecord> = aggregates
            .regions()
            .filter_map(|region| {
                aggregates
                    .daily_value(region, day)
                    .map(|value| HddRecord::observation(run.time, region, valid_time, value, self.source))
            })
            .collect();
        log::info!("{} day {}: {} records", self.source, day, records.len());
        Ok(records)
    }

    pub fn compute_observation(&self, path: &Path, run: &RunId) -> Result<Vec<HddRecord>> {
        let grid = TemperatureGrid::read_csv(path)?;
        self.observation(&grid, run)
    }

    fn aggregate(&self, daily: &DailyField) -> Result<DailyAggregates> {
        let hdd = DailyField {
            days: daily.days.clone(),
            latitudes: daily.latitudes.clone(),
            longitudes: daily.longitudes.clone(),
            values: daily.values.mapv(heating_degree_days),
        };
        let weights = self
            .population
            .weights_for(&hdd.latitudes, &hdd.longitudes)?;
        let index = self.regions.index_for(&hdd.latitudes, &hdd.longitudes);
        Ok(DailyAggregates::from_field(&hdd, &weights, &index))
    }
}
