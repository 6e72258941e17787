use crate::record::{HddRecord, RunResults, Source};
use chrono::{DateTime, Utc};

/// Persistence capability the orchestrator depends on.
///
/// The existence check and the insert are separate calls; callers must not
/// assume they are atomic with respect to each other.
pub trait Repository {
    /// True if any record exists for this run time and source.
    fn exists_for_date(&self, run_time: DateTime<Utc>, source: Source) -> anyhow::Result<bool>;

    /// Forecast records stored for a run, or `None` if that run was never processed.
    fn get_forecast(&self, run_time: DateTime<Utc>) -> anyhow::Result<Option<Vec<HddRecord>>>;

    /// Persist all records and comparisons of one pass.
    fn insert_results(&self, results: &RunResults) -> anyhow::Result<()>;
}
