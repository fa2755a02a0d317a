use crate::api::{error::Result, experiment::*, id::*, run::*, search::*};
use crate::backend::pages::SearchPages;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewType {
    #[default]
    #[serde(rename = "ACTIVE_ONLY")]
    Active,
    #[serde(rename = "DELETED_ONLY")]
    Deleted,
    #[serde(rename = "ALL")]
    All,
}

/// The operations of the tracking server.
///
/// Calls never retry. A rejection by the server surfaces as
/// [`Error::Rejected`](crate::api::error::Error::Rejected), never as a
/// successfully returned value.
#[rustfmt::skip]
pub trait Client {
    fn create_experiment(&self, name: &str, artifact_location: &str) -> Result<ExperimentId>;
    fn list_experiments(&self) -> Result<Vec<Experiment>>;
    fn get_experiment(&self, id: &ExperimentId) -> Result<Experiment>;
    fn get_experiment_by_name(&self, name: &str) -> Result<Experiment>;
    fn delete_experiment(&self, id: &ExperimentId) -> Result<()>;

    fn create_run(&self, experiment: &ExperimentId, start_time: i64, tags: &[RunTag]) -> Result<Run>;
    fn get_run(&self, id: &RunId, run_uuid: &str) -> Result<Run>;
    fn update_run(&self, id: &RunId, status: RunStatus, end_time: i64) -> Result<RunInfo>;
    fn delete_run(&self, id: &RunId) -> Result<()>;
    fn search_runs(&self, query: &SearchRuns) -> Result<RunPage>;

    fn log_param(&self, run: &RunId, key: &str, value: &str) -> Result<()>;
    fn log_metric(&self, run: &RunId, key: &str, value: f64, timestamp: i64, step: i64) -> Result<()>;
    fn log_batch(&self, run: &RunId, metrics: &[Metric], params: &[Param], tags: &[RunTag]) -> Result<()>;

    /// Lazily walk all pages of a search, starting at `query.page_token`.
    fn search_runs_pages(&self, query: SearchRuns) -> SearchPages<'_> where Self: Sized {
        SearchPages::new(self, query)
    }
}
