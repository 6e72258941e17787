pub mod error;
pub mod horizon;
pub mod record;
pub mod repository;
pub mod run;

/// Region label used for the whole-domain aggregate.
pub const US_MEAN: &str = "US Mean";
