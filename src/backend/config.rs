//! Endpoint table and client construction.

use crate::api::error::{Error, Result};
use crate::backend::{
    observer::{NoopObserver, Observer},
    rest::Server,
    transport::{Method, Transport, UreqTransport},
};
use std::{collections::HashMap, env, sync::Arc, time::Duration};

pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";
pub const REQUEST_TIMEOUT_ENV: &str = "MLFLOW_HTTP_REQUEST_TIMEOUT";

const USER_AGENT: &str = concat!("mlflow-rest/", env!("CARGO_PKG_VERSION"));

/// A remote operation of the tracking server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateExperiment,
    ListExperiments,
    GetExperiment,
    GetExperimentByName,
    DeleteExperiment,
    CreateRun,
    GetRun,
    UpdateRun,
    DeleteRun,
    SearchRuns,
    LogParam,
    LogMetric,
    LogBatch,
}

impl Operation {
    pub fn path(self) -> &'static str {
        match self {
            Operation::CreateExperiment => "/api/2.0/mlflow/experiments/create",
            Operation::ListExperiments => "/api/2.0/mlflow/experiments/list",
            Operation::GetExperiment => "/api/2.0/mlflow/experiments/get",
            Operation::GetExperimentByName => "/api/2.0/mlflow/experiments/get-by-name",
            Operation::DeleteExperiment => "/api/2.0/mlflow/experiments/delete",
            Operation::CreateRun => "/api/2.0/mlflow/runs/create",
            Operation::GetRun => "/api/2.0/mlflow/runs/get",
            Operation::UpdateRun => "/api/2.0/mlflow/runs/update",
            Operation::DeleteRun => "/api/2.0/mlflow/runs/delete",
            Operation::SearchRuns => "/api/2.0/mlflow/runs/search",
            Operation::LogParam => "/api/2.0/mlflow/runs/log-parameter",
            Operation::LogMetric => "/api/2.0/mlflow/runs/log-metric",
            Operation::LogBatch => "/api/2.0/mlflow/runs/log-batch",
        }
    }

    /// The verb the REST API documents for this operation.
    pub fn rest_verb(self) -> Verb {
        match self {
            Operation::ListExperiments | Operation::GetExperiment | Operation::GetExperimentByName => {
                Verb::Get
            }
            _ => Verb::Post,
        }
    }
}

/// How a payload travels for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// GET, payload encoded as query string.
    Get,
    /// GET, payload as JSON body.
    GetWithBody,
    /// POST, payload as JSON body.
    Post,
}

impl Verb {
    pub fn method(self) -> Method {
        match self {
            Verb::Get | Verb::GetWithBody => Method::Get,
            Verb::Post => Method::Post,
        }
    }
}

/// Maps each [`Operation`] to its [`Verb`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerbTable {
    overrides: HashMap<Operation, Verb>,
}

impl VerbTable {
    /// The documented REST verbs.
    pub fn rest() -> Self {
        VerbTable::default()
    }

    /// GET with JSON bodies for get, get-by-name and delete, as older
    /// clients sent them.
    pub fn legacy() -> Self {
        VerbTable::rest()
            .with(Operation::GetExperiment, Verb::GetWithBody)
            .with(Operation::GetExperimentByName, Verb::GetWithBody)
            .with(Operation::DeleteExperiment, Verb::GetWithBody)
    }

    pub fn with(mut self, operation: Operation, verb: Verb) -> Self {
        self.overrides.insert(operation, verb);
        self
    }

    pub fn verb(&self, operation: Operation) -> Verb {
        self.overrides
            .get(&operation)
            .copied()
            .unwrap_or_else(|| operation.rest_verb())
    }
}

/// Builder for a [`Server`].
///
/// Timeouts apply to every call and cannot be changed afterwards.
pub struct ServerBuilder {
    base_url: String,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: String,
    verbs: VerbTable,
    observer: Arc<dyn Observer>,
    transport: Option<Arc<dyn Transport>>,
}

impl ServerBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        ServerBuilder {
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: None,
            connect_timeout: None,
            user_agent: USER_AGENT.to_owned(),
            verbs: VerbTable::rest(),
            observer: Arc::new(NoopObserver),
            transport: None,
        }
    }

    /// Configure from `MLFLOW_TRACKING_URI` and `MLFLOW_HTTP_REQUEST_TIMEOUT`.
    pub fn from_env() -> Result<Self> {
        let uri = env::var(TRACKING_URI_ENV)
            .map_err(|_| Error::Config(format!("{} is not set", TRACKING_URI_ENV)))?;
        let mut builder = ServerBuilder::new(uri);
        if let Ok(secs) = env::var(REQUEST_TIMEOUT_ENV) {
            builder = builder.timeout(parse_timeout(&secs)?);
        }
        Ok(builder)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn verbs(mut self, verbs: VerbTable) -> Self {
        self.verbs = verbs;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the ureq transport. Timeouts and user agent are then up to
    /// the given transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Server {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(UreqTransport::with_timeouts(
                self.timeout,
                self.connect_timeout,
                &self.user_agent,
            )),
        };
        Server {
            base_url: self.base_url,
            verbs: self.verbs,
            observer: self.observer,
            transport,
        }
    }
}

fn parse_timeout(secs: &str) -> Result<Duration> {
    secs.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|err| Error::Config(format!("{} must be whole seconds: {}", REQUEST_TIMEOUT_ENV, err)))
}
