//! Daily HDD climatology: one long-term mean value per day of year per region.
//!
//! File format is a wide CSV, one row per day of year:
//!
//! ```text
//! dayofyear,US Mean,Northeast,...
//! 1,31.2,38.9,...
//! ```
//!
//! Leap days are not part of the baseline: a row for day 366 is dropped on
//! load and day-of-year 366 reads day 1.

use crate::io::open_reader;
use chrono::{Datelike, NaiveDate};
use hdd_core::error::{HddError, Result};
use hdd_core::horizon::Horizon;
use hdd_core::record::{DataType, HddRecord};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

pub const DAYS_IN_BASELINE: usize = 365;

const DAY_COLUMN: &str = "dayofyear";

/// Baseline day index (0-based) for a calendar date.
fn baseline_slot(date: &NaiveDate) -> usize {
    (date.ordinal0() as usize) % DAYS_IN_BASELINE
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Climatology {
    regions: BTreeMap<String, Vec<f64>>,
}

impl Climatology {
    pub fn read_csv(path: &Path) -> Result<Self> {
        let climatology = Climatology::from_reader(open_reader(path)?)?;
        log::info!(
            "loaded climatology {} for {} regions",
            path.display(),
            climatology.regions.len()
        );
        Ok(climatology)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        match headers.get(0) {
            Some(first) if first.eq_ignore_ascii_case(DAY_COLUMN) => {}
            other => {
                return Err(HddError::Climatology(format!(
                    "first column must be {DAY_COLUMN}, found {other:?}"
                )))
            }
        }
        let names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut columns: Vec<Vec<f64>> = vec![vec![f64::NAN; DAYS_IN_BASELINE]; names.len()];
        let mut seen = vec![false; DAYS_IN_BASELINE];

        for result in rdr.records() {
            let record = result?;
            let raw_day = record.get(0).unwrap_or("");
            let day: usize = raw_day
                .parse::<f64>()
                .ok()
                .filter(|d| d.fract() == 0.0)
                .map(|d| d as usize)
                .ok_or_else(|| HddError::Climatology(format!("bad day of year {raw_day:?}")))?;
            if day == DAYS_IN_BASELINE + 1 {
                continue;
            }
            if !(1..=DAYS_IN_BASELINE).contains(&day) {
                return Err(HddError::Climatology(format!("day of year {day} out of range")));
            }
            for (column, values) in columns.iter_mut().enumerate() {
                let raw = record.get(column + 1).unwrap_or("");
                values[day - 1] = raw.parse().map_err(|_| {
                    HddError::Climatology(format!(
                        "day {day}, {}: bad value {raw:?}",
                        names[column]
                    ))
                })?;
            }
            seen[day - 1] = true;
        }

        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(HddError::Climatology(format!(
                "no row for day of year {}",
                missing + 1
            )));
        }
        Ok(Climatology {
            regions: names.into_iter().zip(columns).collect(),
        })
    }

    /// Build from per-region series of 365 values, day 1 first.
    pub fn from_regions(regions: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        if let Some((name, values)) = regions
            .iter()
            .find(|(_, values)| values.len() != DAYS_IN_BASELINE)
        {
            return Err(HddError::Climatology(format!(
                "{name} has {} days, expected {DAYS_IN_BASELINE}",
                values.len()
            )));
        }
        Ok(Climatology { regions })
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn value(&self, region: &str, date: &NaiveDate) -> Option<f64> {
        self.regions.get(region).map(|v| v[baseline_slot(date)])
    }

    /// Baseline HDD summed over the horizon's days of year, wrapping across
    /// the year end.
    pub fn horizon_total(&self, region: &str, horizon: &Horizon) -> Option<f64> {
        let values = self.regions.get(region)?;
        Some(horizon.days().map(|day| values[baseline_slot(&day)]).sum())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file)?;
        log::info!("wrote climatology {}", path.display());
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec![DAY_COLUMN.to_string()];
        header.extend(self.regions.keys().cloned());
        wtr.write_record(&header)?;
        for slot in 0..DAYS_IN_BASELINE {
            let mut row = vec![(slot + 1).to_string()];
            row.extend(self.regions.values().map(|v| v[slot].to_string()));
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Averages observed daily HDD values into a climatology.
#[derive(Debug, Default)]
pub struct ClimatologyBuilder {
    sums: BTreeMap<String, Vec<(f64, usize)>>,
}

impl ClimatologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observed day. Leap days are ignored.
    pub fn add(&mut self, region: &str, date: &NaiveDate, value: f64) {
        if !value.is_finite() || date.ordinal() as usize > DAYS_IN_BASELINE {
            return;
        }
        let slots = self
            .sums
            .entry(region.to_string())
            .or_insert_with(|| vec![(0.0, 0); DAYS_IN_BASELINE]);
        let slot = &mut slots[date.ordinal0() as usize];
        slot.0 += value;
        slot.1 += 1;
    }

    /// Add an observation record; forecast records are ignored.
    pub fn add_record(&mut self, record: &HddRecord) {
        if record.data_type != DataType::Observation {
            return;
        }
        if let Some(valid_time) = record.valid_time() {
            self.add(&record.region, &valid_time.date(), record.value);
        }
    }

    /// Every region needs at least one observation for each of the 365 days.
    pub fn build(self) -> Result<Climatology> {
        let mut regions = BTreeMap::new();
        for (region, slots) in self.sums {
            let mut values = Vec::with_capacity(DAYS_IN_BASELINE);
            for (slot, (sum, count)) in slots.into_iter().enumerate() {
                if count == 0 {
                    return Err(HddError::Climatology(format!(
                        "{region} has no observations for day of year {}",
                        slot + 1
                    )));
                }
                values.push(sum / count as f64);
            }
            regions.insert(region, values);
        }
        if regions.is_empty() {
            return Err(HddError::Climatology("no observations".to_string()));
        }
        Climatology::from_regions(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdd_core::record::Source;
    use hdd_core::US_MEAN;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn baseline_csv(extra_leap_row: bool) -> String {
        let mut csv = String::from("dayofyear,US Mean,Northeast\n");
        for day in 1..=365 {
            let value = if day == 1 { 15.0 } else { day as f64 / 10.0 };
            csv.push_str(&format!("{day},{value},{}\n", value * 2.0));
        }
        if extra_leap_row {
            csv.push_str("366,999,999\n");
        }
        csv
    }

    #[test]
    fn test_read_and_lookup() {
        let climatology = Climatology::from_reader(baseline_csv(true).as_bytes()).unwrap();
        assert_eq!(climatology.regions().collect::<Vec<_>>(), vec!["Northeast", US_MEAN]);
        assert_eq!(climatology.value(US_MEAN, &date(2025, 1, 1)), Some(15.0));
        assert_eq!(climatology.value("Northeast", &date(2025, 1, 1)), Some(30.0));
        // day 366 of a leap year reads day 1
        assert_eq!(climatology.value(US_MEAN, &date(2024, 12, 31)), Some(15.0));
        assert_eq!(climatology.value("Nowhere", &date(2025, 1, 1)), None);
    }

    #[test]
    fn test_horizon_total_wraps_year_end() {
        let climatology = Climatology::from_reader(baseline_csv(false).as_bytes()).unwrap();
        let horizon = Horizon::new("Day 1-3", date(2025, 12, 30), date(2026, 1, 1));
        // day 364 + day 365 + day 1
        let expected = 36.4 + 36.5 + 15.0;
        let total = climatology.horizon_total(US_MEAN, &horizon).unwrap();
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_incomplete_file_rejected() {
        let csv = "dayofyear,US Mean\n1,15.0\n";
        assert!(matches!(
            Climatology::from_reader(csv.as_bytes()),
            Err(HddError::Climatology(_))
        ));
        let csv = "day,US Mean\n1,15.0\n";
        assert!(matches!(
            Climatology::from_reader(csv.as_bytes()),
            Err(HddError::Climatology(_))
        ));
        let csv = "dayofyear,US Mean\n400,15.0\n";
        assert!(matches!(
            Climatology::from_reader(csv.as_bytes()),
            Err(HddError::Climatology(_))
        ));
    }

    #[test]
    fn test_write_then_read_file() {
        let climatology = Climatology::from_reader(baseline_csv(false).as_bytes()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.csv");
        climatology.write_csv(&path).unwrap();
        assert_eq!(Climatology::read_csv(&path).unwrap(), climatology);
    }

    #[test]
    fn test_builder_averages_years() {
        let mut builder = ClimatologyBuilder::new();
        for year in [2021, 2022, 2023] {
            for day in date(year, 1, 1).iter_days().take(365) {
                let value = if year == 2022 { 20.0 } else { 10.0 };
                let record = HddRecord::observation(
                    day.and_hms_opt(0, 0, 0).unwrap().and_utc(),
                    US_MEAN,
                    day.and_hms_opt(0, 0, 0).unwrap(),
                    value,
                    Source::Era5Land,
                );
                builder.add_record(&record);
            }
        }
        // leap day is ignored
        builder.add(US_MEAN, &date(2024, 12, 31), 500.0);
        // so are forecast days
        let midnight = date(2023, 7, 4).and_hms_opt(0, 0, 0).unwrap();
        builder.add_record(&HddRecord::forecast_day(
            midnight.and_utc(),
            US_MEAN,
            midnight,
            900.0,
            Source::Ecmwf,
        ));
        let climatology = builder.build().unwrap();
        let expected = 40.0 / 3.0;
        assert!((climatology.value(US_MEAN, &date(2025, 7, 4)).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_builder_needs_every_day() {
        let mut builder = ClimatologyBuilder::new();
        builder.add(US_MEAN, &date(2025, 1, 1), 10.0);
        assert!(matches!(builder.build(), Err(HddError::Climatology(_))));
        assert!(ClimatologyBuilder::new().build().is_err());
    }
}
