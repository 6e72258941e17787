//! Temperature grids indexed by (time, latitude, longitude).
//!
//! Grids are read from long-form CSV files, one sample per row:
//!
//! ```text
//! time,step,latitude,longitude,t2m
//! 2025-01-12 00:00:00,24,40.0,255.0,271.3
//! ```
//!
//! Forecast files carry the run time and a `step` column (hours after the
//! run). Observation files carry a `valid_time` column instead. Files ending
//! in `.gz` are decompressed on the fly.

use crate::degree_day::kelvin_to_fahrenheit;
use crate::io::open_reader;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use hdd_core::error::{HddError, Result};
use hdd_utils::dates::parse_grid_timestamp;
use ndarray::{Array3, Axis};
use std::io::Read;
use std::path::Path;

/// Geographic crop box in degrees, longitudes in [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// Continental United States.
pub const CONUS: BoundingBox = BoundingBox {
    lat_min: 24.0,
    lat_max: 50.0,
    lon_min: -125.0,
    lon_max: -67.0,
};

impl BoundingBox {
    pub fn contains_lat(&self, lat: f64) -> bool {
        self.lat_min <= lat && lat <= self.lat_max
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        self.lon_min <= lon && lon <= self.lon_max
    }
}

/// Remap a longitude from [0, 360) into [-180, 180].
pub fn normalize_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        ((lon + 180.0) % 360.0) - 180.0
    } else {
        lon
    }
}

/// Sorted, de-duplicated coordinate axis.
pub(crate) fn build_axis(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut axis: Vec<f64> = values.collect();
    axis.sort_by(|a, b| a.total_cmp(b));
    axis.dedup();
    axis
}

fn axis_position(axis: &[f64], value: f64) -> Option<usize> {
    axis.binary_search_by(|probe| probe.total_cmp(&value)).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Kelvin,
    Fahrenheit,
}

/// The time-like axis of a raw grid.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeAxis {
    /// Forecast steps, in hours after the run time.
    Steps {
        run_time: NaiveDateTime,
        hours: Vec<f64>,
    },
    /// Absolute valid times.
    ValidTimes(Vec<NaiveDateTime>),
}

impl TimeAxis {
    pub fn len(&self) -> usize {
        match self {
            TimeAxis::Steps { hours, .. } => hours.len(),
            TimeAxis::ValidTimes(times) => times.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn valid_times(&self) -> Vec<NaiveDateTime> {
        match self {
            TimeAxis::Steps { run_time, hours } => hours
                .iter()
                .map(|h| *run_time + Duration::seconds((h * 3600.0).round() as i64))
                .collect(),
            TimeAxis::ValidTimes(times) => times.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureGrid {
    pub time: TimeAxis,
    /// Ascending.
    pub latitudes: Vec<f64>,
    /// Ascending, in [-180, 180].
    pub longitudes: Vec<f64>,
    /// Indexed (time, latitude, longitude); NaN marks a missing sample.
    pub values: Array3<f64>,
    pub unit: TemperatureUnit,
}

#[derive(Clone, Copy)]
enum TimeLayout {
    Steps { step: usize, time: usize },
    Valid(usize),
}

impl TemperatureGrid {
    /// Read a Kelvin grid from a CSV (or `.csv.gz`) file.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let grid = TemperatureGrid::from_reader(open_reader(path)?)?;
        log::debug!(
            "read grid {}: {} times x {} lat x {} lon",
            path.display(),
            grid.time.len(),
            grid.latitudes.len(),
            grid.longitudes.len()
        );
        Ok(grid)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        let column = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let missing = |what: &str| HddError::GridFormat(format!("missing {what} column"));
        let lat_col = column(&["latitude", "lat"]).ok_or_else(|| missing("latitude"))?;
        let lon_col = column(&["longitude", "lon"]).ok_or_else(|| missing("longitude"))?;
        let value_col = column(&["t2m", "2t", "value"]).ok_or_else(|| missing("temperature"))?;
        let layout = match (column(&["step"]), column(&["time"]), column(&["valid_time"])) {
            (Some(step), Some(time), _) => TimeLayout::Steps { step, time },
            (None, _, Some(valid)) => TimeLayout::Valid(valid),
            (None, Some(time), None) => TimeLayout::Valid(time),
            _ => {
                return Err(HddError::GridFormat(
                    "expected time+step or valid_time columns".to_string(),
                ))
            }
        };

        // time key: step seconds or unix seconds, depending on layout
        let mut samples: Vec<(i64, f64, f64, f64)> = Vec::new();
        let mut run_time: Option<NaiveDateTime> = None;
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let field = |idx: usize| record.get(idx).unwrap_or("");
            let bad = |what: &str, raw: &str| {
                HddError::GridFormat(format!("row {}: bad {what} {raw:?}", line + 2))
            };
            let lat: f64 = field(lat_col).parse().map_err(|_| bad("latitude", field(lat_col)))?;
            let lon: f64 = field(lon_col).parse().map_err(|_| bad("longitude", field(lon_col)))?;
            let value = parse_sample(field(value_col)).ok_or_else(|| bad("value", field(value_col)))?;
            let key = match layout {
                TimeLayout::Steps { step, time } => {
                    let issued = parse_grid_timestamp(field(time))
                        .map_err(|_| bad("time", field(time)))?;
                    match run_time {
                        None => run_time = Some(issued),
                        Some(existing) if existing != issued => {
                            return Err(HddError::GridFormat(format!(
                                "row {}: mixed run times {existing} and {issued}",
                                line + 2
                            )))
                        }
                        Some(_) => {}
                    }
                    let hours: f64 = field(step).parse().map_err(|_| bad("step", field(step)))?;
                    (hours * 3600.0).round() as i64
                }
                TimeLayout::Valid(valid) => parse_grid_timestamp(field(valid))
                    .map_err(|_| bad("valid_time", field(valid)))?
                    .and_utc()
                    .timestamp(),
            };
            samples.push((key, lat, normalize_longitude(lon), value));
        }

        let mut keys: Vec<i64> = samples.iter().map(|s| s.0).collect();
        keys.sort_unstable();
        keys.dedup();
        let latitudes = build_axis(samples.iter().map(|s| s.1));
        let longitudes = build_axis(samples.iter().map(|s| s.2));

        let mut values = Array3::from_elem(
            (keys.len(), latitudes.len(), longitudes.len()),
            f64::NAN,
        );
        for (key, lat, lon, value) in &samples {
            let (Ok(t), Some(i), Some(j)) = (
                keys.binary_search(key),
                axis_position(&latitudes, *lat),
                axis_position(&longitudes, *lon),
            ) else {
                continue;
            };
            values[[t, i, j]] = *value;
        }

        let time = match (layout, run_time) {
            (TimeLayout::Steps { .. }, Some(run_time)) => TimeAxis::Steps {
                run_time,
                hours: keys.iter().map(|k| *k as f64 / 3600.0).collect(),
            },
            _ => TimeAxis::ValidTimes(
                keys.iter()
                    .filter_map(|k| DateTime::from_timestamp(*k, 0))
                    .map(|t| t.naive_utc())
                    .collect(),
            ),
        };

        Ok(TemperatureGrid {
            time,
            latitudes,
            longitudes,
            values,
            unit: TemperatureUnit::Kelvin,
        })
    }

    /// Keep only cells inside the box.
    pub fn crop(&self, bounds: &BoundingBox) -> Self {
        let lat_idx: Vec<usize> = (0..self.latitudes.len())
            .filter(|&i| bounds.contains_lat(self.latitudes[i]))
            .collect();
        let lon_idx: Vec<usize> = (0..self.longitudes.len())
            .filter(|&j| bounds.contains_lon(self.longitudes[j]))
            .collect();
        TemperatureGrid {
            time: self.time.clone(),
            latitudes: lat_idx.iter().map(|&i| self.latitudes[i]).collect(),
            longitudes: lon_idx.iter().map(|&j| self.longitudes[j]).collect(),
            values: self
                .values
                .select(Axis(1), &lat_idx)
                .select(Axis(2), &lon_idx),
            unit: self.unit,
        }
    }

    pub fn to_fahrenheit(&mut self) {
        if self.unit == TemperatureUnit::Kelvin {
            self.values.mapv_inplace(kelvin_to_fahrenheit);
            self.unit = TemperatureUnit::Fahrenheit;
        }
    }

    /// Re-index a step axis onto absolute valid times.
    pub fn swap_to_valid_time(mut self) -> Self {
        if let TimeAxis::Steps { .. } = self.time {
            self.time = TimeAxis::ValidTimes(self.time.valid_times());
        }
        self
    }

    /// Keep samples whose valid time falls in `[start, end]`.
    pub fn window(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        let times = self.time.valid_times();
        let keep: Vec<usize> = (0..times.len())
            .filter(|&t| start <= times[t] && times[t] <= end)
            .collect();
        if keep.is_empty() {
            return Err(HddError::EmptyWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(TemperatureGrid {
            time: TimeAxis::ValidTimes(keep.iter().map(|&t| times[t]).collect()),
            latitudes: self.latitudes.clone(),
            longitudes: self.longitudes.clone(),
            values: self.values.select(Axis(0), &keep),
            unit: self.unit,
        })
    }

    /// Resample to one mean per calendar day and cell, skipping missing samples.
    pub fn daily_means(&self) -> DailyField {
        let times = self.time.valid_times();
        let mut days: Vec<NaiveDate> = times.iter().map(|t| t.date()).collect();
        days.sort();
        days.dedup();

        let (_, n_lat, n_lon) = self.values.dim();
        let mut values = Array3::from_elem((days.len(), n_lat, n_lon), f64::NAN);
        for (d, day) in days.iter().enumerate() {
            let steps: Vec<usize> = (0..times.len())
                .filter(|&t| times[t].date() == *day)
                .collect();
            for i in 0..n_lat {
                for j in 0..n_lon {
                    let (sum, count) = steps
                        .iter()
                        .map(|&t| self.values[[t, i, j]])
                        .filter(|v| v.is_finite())
                        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
                    if count > 0 {
                        values[[d, i, j]] = sum / count as f64;
                    }
                }
            }
        }
        DailyField {
            days,
            latitudes: self.latitudes.clone(),
            longitudes: self.longitudes.clone(),
            values,
        }
    }
}

fn parse_sample(raw: &str) -> Option<f64> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw == "--" {
        return Some(f64::NAN);
    }
    raw.parse().ok()
}

/// One value per (day, latitude, longitude).
#[derive(Debug, Clone, PartialEq)]
pub struct DailyField {
    pub days: Vec<NaiveDate>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub values: Array3<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    const FORECAST_CSV: &str = "\
time,step,latitude,longitude,t2m
2025-01-12 12:00:00,0,40.0,260.0,270.0
2025-01-12 12:00:00,0,40.0,250.0,271.0
2025-01-12 12:00:00,0,60.0,250.0,250.0
2025-01-12 12:00:00,12,40.0,260.0,272.0
2025-01-12 12:00:00,12,40.0,250.0,
2025-01-12 12:00:00,12,60.0,250.0,251.0
2025-01-12 12:00:00,18,40.0,260.0,274.0
2025-01-12 12:00:00,18,40.0,250.0,275.0
2025-01-12 12:00:00,18,60.0,250.0,252.0
";

    #[test]
    fn test_read_forecast_layout() {
        let grid = TemperatureGrid::from_reader(FORECAST_CSV.as_bytes()).unwrap();
        assert_eq!(grid.latitudes, vec![40.0, 60.0]);
        // 250 -> -110, 260 -> -100
        assert_eq!(grid.longitudes, vec![-110.0, -100.0]);
        assert_eq!(grid.values.dim(), (3, 2, 2));
        assert_eq!(grid.unit, TemperatureUnit::Kelvin);
        match &grid.time {
            TimeAxis::Steps { run_time, hours } => {
                assert_eq!(*run_time, at(12, 12));
                assert_eq!(hours, &vec![0.0, 12.0, 18.0]);
            }
            other => panic!("unexpected axis {other:?}"),
        }
        assert!(grid.values[[1, 0, 0]].is_nan());
        // never sampled
        assert!(grid.values[[0, 1, 1]].is_nan());
        assert_eq!(grid.values[[2, 0, 1]], 274.0);
    }

    #[test]
    fn test_swap_to_valid_time() {
        let grid = TemperatureGrid::from_reader(FORECAST_CSV.as_bytes())
            .unwrap()
            .swap_to_valid_time();
        assert_eq!(
            grid.time,
            TimeAxis::ValidTimes(vec![at(12, 12), at(13, 0), at(13, 6)])
        );
    }

    #[test]
    fn test_crop_and_convert() {
        let mut grid = TemperatureGrid::from_reader(FORECAST_CSV.as_bytes())
            .unwrap()
            .crop(&CONUS);
        assert_eq!(grid.latitudes, vec![40.0]);
        assert_eq!(grid.longitudes, vec![-110.0, -100.0]);
        grid.to_fahrenheit();
        grid.to_fahrenheit();
        let expected = kelvin_to_fahrenheit(270.0);
        assert!((grid.values[[0, 0, 1]] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_window_and_daily_means() {
        let grid = TemperatureGrid::from_reader(FORECAST_CSV.as_bytes())
            .unwrap()
            .swap_to_valid_time();
        let windowed = grid.window(at(13, 0), at(26, 23)).unwrap();
        assert_eq!(windowed.time.len(), 2);
        let daily = windowed.daily_means();
        assert_eq!(daily.days, vec![NaiveDate::from_ymd_opt(2025, 1, 13).unwrap()]);
        // missing 00z sample skipped for the -110 cell
        assert_eq!(daily.values[[0, 0, 0]], 275.0);
        assert_eq!(daily.values[[0, 0, 1]], 273.0);
    }

    #[test]
    fn test_empty_window_is_an_error() {
        let grid = TemperatureGrid::from_reader(FORECAST_CSV.as_bytes()).unwrap();
        let result = grid.window(at(20, 0), at(21, 0));
        assert!(matches!(result, Err(HddError::EmptyWindow { .. })));
    }

    #[test]
    fn test_read_observation_layout() {
        let csv = "\
valid_time,latitude,longitude,t2m
2025-01-05T00:00:00Z,30.0,-90.0,280.0
2025-01-05T12:00:00Z,30.0,-90.0,284.0
";
        let grid = TemperatureGrid::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(grid.time, TimeAxis::ValidTimes(vec![at(5, 0), at(5, 12)]));
        let daily = grid.daily_means();
        assert_eq!(daily.values[[0, 0, 0]], 282.0);
    }

    #[test]
    fn test_missing_columns_rejected() {
        let csv = "latitude,longitude,t2m\n30.0,-90.0,280.0\n";
        assert!(matches!(
            TemperatureGrid::from_reader(csv.as_bytes()),
            Err(HddError::GridFormat(_))
        ));
        let csv = "valid_time,latitude,t2m\n2025-01-05 00:00:00,30.0,280.0\n";
        assert!(matches!(
            TemperatureGrid::from_reader(csv.as_bytes()),
            Err(HddError::GridFormat(_))
        ));
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(235.0), -125.0);
        assert_eq!(normalize_longitude(293.0), -67.0);
        assert_eq!(normalize_longitude(-90.0), -90.0);
        assert_eq!(normalize_longitude(180.0), 180.0);
    }
}
