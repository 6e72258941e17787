//! Population-weighted heating degree day computation.
//!
//! Raw temperature grids are cropped to the continental US, converted to
//! Fahrenheit, windowed and resampled to daily means, transformed into
//! degree days, then aggregated per region with population weights.
//! The [`comparator`] derives deltas against the climatology baseline and
//! against the previous forecast run.

pub mod aggregate;
pub mod climatology;
pub mod comparator;
pub mod computer;
pub mod degree_day;
pub mod grid;
mod io;
pub mod population;
pub mod regions;

pub use aggregate::{CellSum, CoveragePolicy, DailyAggregates};
pub use climatology::{Climatology, ClimatologyBuilder};
pub use comparator::Comparator;
pub use computer::{ForecastOutput, HddComputer};
pub use grid::{BoundingBox, DailyField, TemperatureGrid, CONUS};
pub use population::PopulationGrid;
pub use regions::{RegionIndex, RegionIndexCache, RegionSet};
