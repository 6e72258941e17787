//! Population-weighted aggregation of daily degree-day fields.
//!
//! Every aggregate is a ratio of two sums over the same cells,
//! `Σ(hdd × weight) / Σ(weight)`, so densely populated cells dominate and
//! sparse cells do not bias the result the way a plain cell mean would.

use crate::grid::DailyField;
use crate::regions::RegionIndex;
use chrono::NaiveDate;
use hdd_core::error::{HddError, Result};
use hdd_core::horizon::Horizon;
use hdd_core::US_MEAN;
use ndarray::Array2;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Running weighted sum and weight sum over a set of cells.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellSum {
    pub weighted: f64,
    pub weight: f64,
}

impl CellSum {
    pub fn new(weighted: f64, weight: f64) -> Self {
        CellSum { weighted, weight }
    }

    /// Add one cell; a missing value or weight contributes to neither sum.
    pub fn add(&mut self, value: f64, weight: f64) {
        if value.is_finite() && weight.is_finite() {
            self.weighted += value * weight;
            self.weight += weight;
        }
    }

    pub fn merge(&mut self, other: &CellSum) {
        self.weighted += other.weighted;
        self.weight += other.weight;
    }

    /// Population-weighted mean, `None` when no weight was accumulated.
    pub fn mean(&self) -> Option<f64> {
        (self.weight > 0.0).then(|| self.weighted / self.weight)
    }
}

/// What to do when a horizon reaches past the available days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoveragePolicy {
    /// Sum the days that exist and log a warning.
    #[default]
    Truncate,
    /// Fail with [`HddError::HorizonCoverage`].
    Reject,
}

impl FromStr for CoveragePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "truncate" => Ok(CoveragePolicy::Truncate),
            "reject" => Ok(CoveragePolicy::Reject),
            other => Err(format!("unknown coverage policy {other:?} (truncate|reject)")),
        }
    }
}

/// Daily weighted sums for the whole domain ([`US_MEAN`]) and each region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyAggregates {
    days: Vec<NaiveDate>,
    regions: BTreeMap<String, Vec<CellSum>>,
}

impl DailyAggregates {
    /// Build from already aggregated series; every series must have one entry per day.
    pub fn new(days: Vec<NaiveDate>, regions: BTreeMap<String, Vec<CellSum>>) -> Self {
        debug_assert!(regions.values().all(|series| series.len() == days.len()));
        DailyAggregates { days, regions }
    }

    /// Weight a daily degree-day field and sum it over the domain and each
    /// indexed region.
    pub fn from_field(hdd: &DailyField, weights: &Array2<f64>, index: &RegionIndex) -> Self {
        let (n_days, n_lat, n_lon) = hdd.values.dim();
        let mut regions = BTreeMap::new();

        let domain: Vec<CellSum> = (0..n_days)
            .map(|d| {
                let mut sum = CellSum::default();
                for i in 0..n_lat {
                    for j in 0..n_lon {
                        sum.add(hdd.values[[d, i, j]], weights[[i, j]]);
                    }
                }
                sum
            })
            .collect();
        regions.insert(US_MEAN.to_string(), domain);

        for (name, cells) in index.iter() {
            let series: Vec<CellSum> = (0..n_days)
                .map(|d| {
                    let mut sum = CellSum::default();
                    for &(i, j) in cells {
                        sum.add(hdd.values[[d, i, j]], weights[[i, j]]);
                    }
                    sum
                })
                .collect();
            regions.insert(name.to_string(), series);
        }

        DailyAggregates {
            days: hdd.days.clone(),
            regions,
        }
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn series(&self, region: &str) -> Option<&[CellSum]> {
        self.regions.get(region).map(Vec::as_slice)
    }

    pub fn daily_value(&self, region: &str, day: NaiveDate) -> Option<f64> {
        let d = self.days.iter().position(|x| *x == day)?;
        self.regions.get(region)?.get(d)?.mean()
    }

    /// Days of the horizon present in this series.
    pub fn coverage(&self, horizon: &Horizon) -> usize {
        self.days.iter().filter(|day| horizon.contains(day)).count()
    }

    /// Apply the coverage policy to one horizon.
    pub fn check_coverage(&self, horizon: &Horizon, policy: CoveragePolicy) -> Result<()> {
        let available = self.coverage(horizon);
        let expected = horizon.len_days();
        if available >= expected {
            return Ok(());
        }
        match policy {
            CoveragePolicy::Reject => Err(HddError::HorizonCoverage {
                label: horizon.label.clone(),
                available,
                expected,
            }),
            CoveragePolicy::Truncate => {
                log::warn!(
                    "horizon {} ({} to {}) truncated to {} of {} days",
                    horizon.label,
                    horizon.start,
                    horizon.end,
                    available,
                    expected
                );
                Ok(())
            }
        }
    }

    /// Sum of the daily population-weighted values over the horizon's days,
    /// `None` when no day carries any weight.
    pub fn horizon_value(&self, region: &str, horizon: &Horizon) -> Option<f64> {
        let series = self.regions.get(region)?;
        self.days
            .iter()
            .zip(series)
            .filter(|(day, _)| horizon.contains(day))
            .filter_map(|(_, sum)| sum.mean())
            .fold(None, |total: Option<f64>, value| Some(total.unwrap_or(0.0) + value))
    }

    /// One value per (region, horizon), regions in name order, horizons in
    /// the order given. Horizons with no day at all are left out.
    pub fn horizon_values(
        &self,
        horizons: &[Horizon],
        policy: CoveragePolicy,
    ) -> Result<Vec<(String, Horizon, f64)>> {
        let mut covered = Vec::with_capacity(horizons.len());
        for horizon in horizons {
            self.check_coverage(horizon, policy)?;
            if self.coverage(horizon) > 0 {
                covered.push(horizon);
            }
        }
        let mut values = Vec::with_capacity(self.regions.len() * covered.len());
        for region in self.regions.keys() {
            for &horizon in &covered {
                if let Some(value) = self.horizon_value(region, horizon) {
                    values.push((region.clone(), horizon.clone(), value));
                }
            }
        }
        Ok(values)
    }
}
