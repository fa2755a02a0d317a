use serde::{Deserialize, Serialize};

use crate::{api::opt_int64, ExperimentId};

/// A named collection of runs with an artifact storage location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: ExperimentId,
    pub name: String,
    #[serde(default)]
    pub artifact_location: String,
    #[serde(default)]
    pub lifecycle_stage: String,
    #[serde(default, with = "opt_int64", skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<i64>,
    #[serde(default, with = "opt_int64", skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<ExperimentTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentTag {
    pub key: String,
    pub value: String,
}
