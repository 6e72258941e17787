use crate::horizon::Horizon;
use chrono::{DateTime, NaiveDateTime, Utc};
use hdd_utils::dates::winter_year_for_date;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream data family a record was computed from.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Source {
    /// ECMWF open-data operational forecast
    Ecmwf,
    /// ERA5-Land reanalysis
    Era5Land,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ecmwf => "ecmwf",
            Source::Era5Land => "era5_land",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ecmwf" => Ok(Source::Ecmwf),
            "era5_land" => Ok(Source::Era5Land),
            other => anyhow::bail!("unknown source {other:?}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum DataType {
    Forecast,
    Observation,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Forecast => "forecast",
            DataType::Observation => "observation",
        }
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forecast" => Ok(DataType::Forecast),
            "observation" => Ok(DataType::Observation),
            other => anyhow::bail!("unknown data type {other:?}"),
        }
    }
}

/// What period a record's value covers: a forecast horizon or one observed day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordSpan {
    Horizon(Horizon),
    ValidTime(NaiveDateTime),
}

/// One persisted population-weighted HDD value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HddRecord {
    pub run_time: DateTime<Utc>,
    pub region: String,
    pub span: RecordSpan,
    pub value: f64,
    pub source: Source,
    pub data_type: DataType,
    /// May-to-May heating season the span starts in.
    pub winter_year: i32,
}

impl HddRecord {
    pub fn forecast(
        run_time: DateTime<Utc>,
        region: impl Into<String>,
        horizon: Horizon,
        value: f64,
        source: Source,
    ) -> Self {
        let winter_year = winter_year_for_date(&horizon.start);
        HddRecord {
            run_time,
            region: region.into(),
            span: RecordSpan::Horizon(horizon),
            value,
            source,
            data_type: DataType::Forecast,
            winter_year,
        }
    }

    /// One forecast day: the daily population-weighted HDD at a valid time.
    pub fn forecast_day(
        run_time: DateTime<Utc>,
        region: impl Into<String>,
        valid_time: NaiveDateTime,
        value: f64,
        source: Source,
    ) -> Self {
        HddRecord {
            data_type: DataType::Forecast,
            ..HddRecord::observation(run_time, region, valid_time, value, source)
        }
    }

    pub fn observation(
        run_time: DateTime<Utc>,
        region: impl Into<String>,
        valid_time: NaiveDateTime,
        value: f64,
        source: Source,
    ) -> Self {
        let winter_year = winter_year_for_date(&valid_time.date());
        HddRecord {
            run_time,
            region: region.into(),
            span: RecordSpan::ValidTime(valid_time),
            value,
            source,
            data_type: DataType::Observation,
            winter_year,
        }
    }

    pub fn horizon(&self) -> Option<&Horizon> {
        match &self.span {
            RecordSpan::Horizon(horizon) => Some(horizon),
            RecordSpan::ValidTime(_) => None,
        }
    }

    pub fn valid_time(&self) -> Option<NaiveDateTime> {
        match self.span {
            RecordSpan::ValidTime(time) => Some(time),
            RecordSpan::Horizon(_) => None,
        }
    }
}

/// Which reference series a delta was taken against.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum ComparisonKind {
    /// Current forecast minus 30-year climatology
    VsBaseline,
    /// Current forecast minus the run issued 12 hours earlier
    VsPreviousForecast,
}

impl ComparisonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonKind::VsBaseline => "vs_baseline",
            ComparisonKind::VsPreviousForecast => "vs_previous_forecast",
        }
    }
}

impl FromStr for ComparisonKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vs_baseline" => Ok(ComparisonKind::VsBaseline),
            "vs_previous_forecast" => Ok(ComparisonKind::VsPreviousForecast),
            other => anyhow::bail!("unknown comparison kind {other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub forecast_run_time: DateTime<Utc>,
    pub region: String,
    pub horizon: Horizon,
    pub kind: ComparisonKind,
    pub delta: f64,
}

/// Everything one orchestrator pass persists, written in a single call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResults {
    pub records: Vec<HddRecord>,
    pub comparisons: Vec<ComparisonRecord>,
}

impl RunResults {
    pub fn new(records: Vec<HddRecord>) -> Self {
        RunResults {
            records,
            comparisons: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.comparisons.is_empty()
    }
}
