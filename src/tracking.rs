//! Record a run locally and send it in as few requests as possible.

mod run;

pub use run::TrackingRun;
