/// Error types for the HDD engine
use thiserror::Error;

/// Main error type for grid loading, HDD computation and comparison
#[derive(Error, Debug)]
pub enum HddError {
    /// Reading a grid, population or baseline file failed
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Failed to parse JSON data
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A grid file is missing columns or holds unparsable values
    #[error("Invalid grid file: {0}")]
    GridFormat(String),

    /// The region definition resource could not be loaded
    #[error("Region definition unusable: {0}")]
    RegionDefinition(String),

    /// The population grid does not cover a data grid coordinate
    #[error("Population grid has no {axis} coordinate {value}")]
    PopulationMismatch { axis: &'static str, value: f64 },

    /// No grid samples remained after temporal windowing
    #[error("No samples between {start} and {end}")]
    EmptyWindow { start: String, end: String },

    /// A horizon extends past the available valid times
    #[error("Horizon {label} covers {available} of {expected} days")]
    HorizonCoverage {
        label: String,
        available: usize,
        expected: usize,
    },

    /// Previous and current forecast series do not line up
    #[error("Forecast series mismatch (previous: {previous}, current: {current})")]
    CardinalityMismatch { previous: usize, current: usize },

    /// Baseline climatology file is malformed
    #[error("Invalid climatology: {0}")]
    Climatology(String),
}

/// Type alias for Results using HddError
pub type Result<T> = std::result::Result<T, HddError>;
