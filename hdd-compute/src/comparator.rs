use crate::aggregate::{CoveragePolicy, DailyAggregates};
use crate::climatology::Climatology;
use hdd_core::error::{HddError, Result};
use hdd_core::horizon::Horizon;
use hdd_core::record::{ComparisonKind, ComparisonRecord, HddRecord};
use hdd_core::run::RunId;
use std::collections::{BTreeMap, BTreeSet};

/// Derives forecast deltas against the climatology and the previous run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    coverage: CoveragePolicy,
}

impl Comparator {
    pub fn new(coverage: CoveragePolicy) -> Self {
        Comparator { coverage }
    }

    /// Forecast minus the climatology summed over the same days of year.
    /// Regions the climatology does not know are skipped.
    pub fn baseline_delta(
        &self,
        forecast: &[HddRecord],
        climatology: &Climatology,
    ) -> Vec<ComparisonRecord> {
        let mut deltas = Vec::with_capacity(forecast.len());
        let mut unknown = BTreeSet::new();
        for record in forecast {
            let Some(horizon) = record.horizon() else {
                continue;
            };
            match climatology.horizon_total(&record.region, horizon) {
                Some(baseline) => deltas.push(ComparisonRecord {
                    forecast_run_time: record.run_time,
                    region: record.region.clone(),
                    horizon: horizon.clone(),
                    kind: ComparisonKind::VsBaseline,
                    delta: record.value - baseline,
                }),
                None => {
                    unknown.insert(record.region.as_str());
                }
            }
        }
        for region in unknown {
            log::warn!("no climatology for region {region}, baseline delta skipped");
        }
        deltas
    }

    /// Current run minus the previous run, both over the previous run's
    /// horizon bounds. The current daily series is re-summed on those bounds
    /// and joined on (region, start, end); both sides must hold exactly the
    /// same keys.
    pub fn forecast_delta(
        &self,
        previous: &[HddRecord],
        current: &DailyAggregates,
        run: &RunId,
    ) -> Result<Vec<ComparisonRecord>> {
        let mut previous_values: BTreeMap<(String, Horizon), f64> = BTreeMap::new();
        for record in previous {
            if let Some(horizon) = record.horizon() {
                previous_values.insert((record.region.clone(), horizon.clone()), record.value);
            }
        }

        let horizons: Vec<Horizon> = previous_values
            .keys()
            .map(|(_, horizon)| horizon.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let current_values: BTreeMap<(String, Horizon), f64> = current
            .horizon_values(&horizons, self.coverage)?
            .into_iter()
            .map(|(region, horizon, value)| ((region, horizon), value))
            .collect();

        let aligned = previous_values.len() == current_values.len()
            && previous_values
                .keys()
                .all(|key| current_values.contains_key(key));
        if !aligned {
            return Err(HddError::CardinalityMismatch {
                previous: previous_values.len(),
                current: current_values.len(),
            });
        }

        Ok(previous_values
            .into_iter()
            .map(|((region, horizon), before)| {
                let now = current_values[&(region.clone(), horizon.clone())];
                ComparisonRecord {
                    forecast_run_time: run.time,
                    region,
                    horizon,
                    kind: ComparisonKind::VsPreviousForecast,
                    delta: now - before,
                }
            })
            .collect())
    }
}
