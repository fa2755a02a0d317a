use crate::api::{
    client::ViewType,
    id::{ExperimentId, PageToken},
    run::Run,
};
use serde::{Deserialize, Serialize};

/// Default page size of the tracking server.
pub const DEFAULT_MAX_RESULTS: i32 = 1000;

/// Parameters of a run search.
///
/// `filter` and `order_by` use the server's own grammar and are sent as is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRuns {
    pub experiment_ids: Vec<ExperimentId>,
    pub filter: String,
    pub run_view_type: ViewType,
    pub max_results: i32,
    pub order_by: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<PageToken>,
}

impl SearchRuns {
    pub fn new<I, E>(experiment_ids: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ExperimentId>,
    {
        SearchRuns {
            experiment_ids: experiment_ids.into_iter().map(Into::into).collect(),
            filter: String::new(),
            run_view_type: ViewType::default(),
            max_results: DEFAULT_MAX_RESULTS,
            order_by: Vec::new(),
            page_token: None,
        }
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn view(mut self, view_type: ViewType) -> Self {
        self.run_view_type = view_type;
        self
    }

    pub fn max_results(mut self, max_results: i32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by.push(clause.into());
        self
    }

    pub fn page_token(mut self, token: impl Into<PageToken>) -> Self {
        self.page_token = Some(token.into());
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunPage {
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<PageToken>,
}

impl RunPage {
    /// The token of the following page, if the server announced one.
    pub fn next(&self) -> Option<&PageToken> {
        self.next_page_token.as_ref().filter(|token| !token.is_empty())
    }
}
