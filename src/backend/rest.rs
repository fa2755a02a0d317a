use crate::{
    api::{
        client::{Client, ViewType},
        error::{BatchError, Error, Result},
        experiment::Experiment,
        limits,
        run::{Metric, Param, Run, RunInfo, RunStatus, RunTag},
        search::{RunPage, SearchRuns},
    },
    backend::{
        config::{Operation, ServerBuilder, VerbTable},
        dispatch::dispatch,
        observer::Observer,
        transport::Transport,
    },
    ExperimentId, RunId,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// A client for a MLflow Tracking Server.
///
/// Holds no mutable state: it can be cloned and shared between threads, and
/// connections are reused through the underlying transport.
#[derive(Clone)]
pub struct Server {
    pub(crate) base_url: String,
    pub(crate) verbs: VerbTable,
    pub(crate) observer: Arc<dyn Observer>,
    pub(crate) transport: Arc<dyn Transport>,
}

impl Server {
    /// Connect to `host` and `port`, e.g. `Server::new("http://localhost", "5000")`.
    ///
    /// The host must carry the scheme. Nothing is validated.
    pub fn new(host: &str, port: &str) -> Self {
        Server::from_url(format!("{}:{}", host, port))
    }

    /// Connect to a base url like `http://127.0.0.1:5000`.
    pub fn from_url(url: impl Into<String>) -> Self {
        ServerBuilder::new(url).build()
    }

    pub fn from_env() -> Result<Self> {
        Ok(ServerBuilder::from_env()?.build())
    }

    pub fn builder(url: impl Into<String>) -> ServerBuilder {
        ServerBuilder::new(url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, operation: Operation) -> String {
        format!("{}{}", self.base_url, operation.path())
    }

    fn execute<Ep>(&self, request: &Ep) -> Result<Ep::Value>
    where
        Ep: Endpoint + Serialize,
    {
        let operation = Ep::OPERATION;
        let result = dispatch(
            &*self.transport,
            &self.endpoint(operation),
            self.verbs.verb(operation),
            Some(request),
        )
        .and_then(|body| {
            self.observer.on_response(operation, &body);
            read_response::<Ep::Response>(&body)
        });
        match result {
            Ok(response) => Ok(Ep::extract(response)),
            Err(error) => {
                self.observer.on_error(operation, &error);
                Err(error)
            }
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("base_url", &self.base_url)
            .field("verbs", &self.verbs)
            .finish_non_exhaustive()
    }
}

fn read_response<R: DeserializeOwned>(body: &[u8]) -> Result<R> {
    // Some endpoints answer with an empty body instead of `{}`.
    let json: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(json).map_err(|source| Error::Deserialize {
        source,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

impl Client for Server {
    fn create_experiment(&self, name: &str, artifact_location: &str) -> Result<ExperimentId> {
        self.execute(&CreateExperiment {
            name,
            artifact_location,
        })
    }

    fn list_experiments(&self) -> Result<Vec<Experiment>> {
        self.execute(&ListExperiments { view_type: None })
    }

    fn get_experiment(&self, id: &ExperimentId) -> Result<Experiment> {
        self.execute(&GetExperiment { experiment_id: id })
    }

    fn get_experiment_by_name(&self, name: &str) -> Result<Experiment> {
        self.execute(&GetExperimentByName {
            experiment_name: name,
        })
    }

    fn delete_experiment(&self, id: &ExperimentId) -> Result<()> {
        self.execute(&DeleteExperiment { experiment_id: id })
    }

    fn create_run(&self, experiment_id: &ExperimentId, start_time: i64, tags: &[RunTag]) -> Result<Run> {
        self.execute(&CreateRun {
            experiment_id,
            start_time,
            tags,
        })
    }

    fn get_run(&self, run_id: &RunId, run_uuid: &str) -> Result<Run> {
        self.execute(&GetRun { run_id, run_uuid })
    }

    fn update_run(&self, run_id: &RunId, status: RunStatus, end_time: i64) -> Result<RunInfo> {
        self.execute(&UpdateRun {
            run_id,
            status,
            end_time,
        })
    }

    fn delete_run(&self, run_id: &RunId) -> Result<()> {
        self.execute(&DeleteRun { run_id })
    }

    fn search_runs(&self, query: &SearchRuns) -> Result<RunPage> {
        self.execute(query)
    }

    fn log_param(&self, run_id: &RunId, key: &str, value: &str) -> Result<()> {
        self.execute(&LogParam { run_id, key, value })
    }

    fn log_metric(&self, run_id: &RunId, key: &str, value: f64, timestamp: i64, step: i64) -> Result<()> {
        self.execute(&LogMetric {
            run_id,
            key,
            value,
            timestamp,
            step,
        })
    }

    fn log_batch(&self, run_id: &RunId, metrics: &[Metric], params: &[Param], tags: &[RunTag]) -> Result<()> {
        let request = LogBatch {
            run_id,
            metrics,
            params,
            tags,
        };
        request.validate()?;
        self.execute(&request)
    }
}

trait Endpoint {
    const OPERATION: Operation;

    type Response: DeserializeOwned;
    type Value;

    fn extract(response: Self::Response) -> Self::Value;
}
trait VoidEndpoint {
    const OPERATION: Operation;
}
impl<E> Endpoint for E
where
    E: VoidEndpoint,
{
    const OPERATION: Operation = E::OPERATION;

    type Response = VoidResponse;
    type Value = ();

    fn extract(_response: Self::Response) -> Self::Value {}
}

#[derive(Deserialize)]
struct VoidResponse {}

#[derive(Debug, Clone, Copy, Serialize)]
struct CreateExperiment<'a> {
    pub name: &'a str,
    pub artifact_location: &'a str,
}
#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: ExperimentId,
}
impl Endpoint for CreateExperiment<'_> {
    const OPERATION: Operation = Operation::CreateExperiment;
    type Response = CreateExperimentResponse;
    type Value = ExperimentId;

    fn extract(response: Self::Response) -> Self::Value {
        response.experiment_id
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct ListExperiments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_type: Option<ViewType>,
}
#[derive(Deserialize)]
struct ListExperimentsResponse {
    #[serde(default)]
    experiments: Vec<Experiment>,
}
impl Endpoint for ListExperiments {
    const OPERATION: Operation = Operation::ListExperiments;
    type Response = ListExperimentsResponse;
    type Value = Vec<Experiment>;

    fn extract(response: Self::Response) -> Self::Value {
        response.experiments
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GetExperiment<'a> {
    pub experiment_id: &'a ExperimentId,
}
#[derive(Deserialize)]
struct GetExperimentResponse {
    experiment: Experiment,
}
impl Endpoint for GetExperiment<'_> {
    const OPERATION: Operation = Operation::GetExperiment;
    type Response = GetExperimentResponse;
    type Value = Experiment;

    fn extract(response: Self::Response) -> Self::Value {
        response.experiment
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GetExperimentByName<'a> {
    pub experiment_name: &'a str,
}
impl Endpoint for GetExperimentByName<'_> {
    const OPERATION: Operation = Operation::GetExperimentByName;
    type Response = GetExperimentResponse;
    type Value = Experiment;

    fn extract(response: Self::Response) -> Self::Value {
        response.experiment
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct DeleteExperiment<'a> {
    pub experiment_id: &'a ExperimentId,
}
impl VoidEndpoint for DeleteExperiment<'_> {
    const OPERATION: Operation = Operation::DeleteExperiment;
}

#[derive(Debug, Clone, Copy, Serialize)]
struct CreateRun<'a> {
    pub experiment_id: &'a ExperimentId,
    pub start_time: i64,
    pub tags: &'a [RunTag],
}
#[derive(Deserialize)]
struct RunResponse {
    run: Run,
}
impl Endpoint for CreateRun<'_> {
    const OPERATION: Operation = Operation::CreateRun;
    type Response = RunResponse;
    type Value = Run;

    fn extract(response: Self::Response) -> Self::Value {
        response.run
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GetRun<'a> {
    pub run_id: &'a RunId,
    pub run_uuid: &'a str,
}
impl Endpoint for GetRun<'_> {
    const OPERATION: Operation = Operation::GetRun;
    type Response = RunResponse;
    type Value = Run;

    fn extract(response: Self::Response) -> Self::Value {
        response.run
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct UpdateRun<'a> {
    pub run_id: &'a RunId,
    pub status: RunStatus,
    pub end_time: i64,
}
#[derive(Deserialize)]
struct UpdateRunResponse {
    run_info: RunInfo,
}
impl Endpoint for UpdateRun<'_> {
    const OPERATION: Operation = Operation::UpdateRun;
    type Response = UpdateRunResponse;
    type Value = RunInfo;

    fn extract(response: Self::Response) -> Self::Value {
        response.run_info
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct DeleteRun<'a> {
    pub run_id: &'a RunId,
}
impl VoidEndpoint for DeleteRun<'_> {
    const OPERATION: Operation = Operation::DeleteRun;
}

impl Endpoint for SearchRuns {
    const OPERATION: Operation = Operation::SearchRuns;
    type Response = RunPage;
    type Value = RunPage;

    fn extract(response: Self::Response) -> Self::Value {
        response
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct LogParam<'a> {
    pub run_id: &'a RunId,
    pub key: &'a str,
    pub value: &'a str,
}
impl VoidEndpoint for LogParam<'_> {
    const OPERATION: Operation = Operation::LogParam;
}

#[derive(Debug, Clone, Copy, Serialize)]
struct LogMetric<'a> {
    pub run_id: &'a RunId,
    pub key: &'a str,
    pub value: f64,
    pub timestamp: i64,
    pub step: i64,
}
impl VoidEndpoint for LogMetric<'_> {
    const OPERATION: Operation = Operation::LogMetric;
}

#[derive(Debug, Clone, Copy, Serialize)]
struct LogBatch<'a> {
    pub run_id: &'a RunId,
    pub metrics: &'a [Metric],
    pub params: &'a [Param],
    pub tags: &'a [RunTag],
}
impl LogBatch<'_> {
    fn validate(&self) -> Result<(), BatchError> {
        let total = self.metrics.len() + self.params.len() + self.tags.len();
        if self.metrics.len() > limits::BATCH_METRICS {
            Err(BatchError::TooManyMetrics(self.metrics.len()))
        } else if self.params.len() > limits::BATCH_PARAMS {
            Err(BatchError::TooManyParams(self.params.len()))
        } else if self.tags.len() > limits::BATCH_TAGS {
            Err(BatchError::TooManyTags(self.tags.len()))
        } else if total > limits::BATCH_ITEMS {
            Err(BatchError::TooManyItems(total))
        } else {
            Ok(())
        }
    }
}
impl VoidEndpoint for LogBatch<'_> {
    const OPERATION: Operation = Operation::LogBatch;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::error::{ErrorCode, TransportError},
        backend::{
            config::Verb,
            transport::{HttpRequest, HttpResponse, Method},
        },
    };
    use serde_json::{json, Value};
    use std::{collections::VecDeque, sync::Mutex};

    #[derive(Default)]
    struct Scripted {
        responses: Mutex<VecDeque<std::result::Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn reply(self, status: u16, body: Value) -> Self {
            self.responses.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                body: body.to_string().into_bytes(),
            }));
            self
        }

        fn reply_raw(self, status: u16, body: &str) -> Self {
            self.responses.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            }));
            self
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for Scripted {
        fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("no scripted response".into())))
        }
    }

    fn server(transport: &Arc<Scripted>) -> Server {
        Server::builder("http://localhost:5000")
            .transport(transport.clone())
            .build()
    }

    fn body(request: &HttpRequest) -> Value {
        serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
    }

    fn experiment_json(id: &str, name: &str) -> Value {
        json!({
            "experiment_id": id,
            "name": name,
            "artifact_location": format!("./mlruns/{}", id),
            "lifecycle_stage": "active"
        })
    }

    #[test]
    fn new_joins_host_and_port() {
        let server = Server::new("http://localhost", "5000");
        assert_eq!(server.base_url(), "http://localhost:5000");
        assert_eq!(
            server.endpoint(Operation::CreateExperiment),
            "http://localhost:5000/api/2.0/mlflow/experiments/create"
        );
    }

    #[test]
    fn create_experiment() {
        let transport = Arc::new(Scripted::default().reply(200, json!({"experiment_id": "1"})));
        let id = server(&transport).create_experiment("test1", "./mlruns/1").unwrap();
        assert_eq!(id.as_ref(), "1");

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "http://localhost:5000/api/2.0/mlflow/experiments/create");
        assert_eq!(body(&requests[0]), json!({"name": "test1", "artifact_location": "./mlruns/1"}));
    }

    #[test]
    fn empty_strings_are_sent_verbatim() {
        let transport = Arc::new(Scripted::default().reply(200, json!({"experiment_id": "2"})));
        server(&transport).create_experiment("", "").unwrap();
        assert_eq!(body(&transport.requests()[0]), json!({"name": "", "artifact_location": ""}));
    }

    #[test]
    fn create_existing_experiment_is_rejected() {
        let transport = Arc::new(Scripted::default().reply(
            400,
            json!({"error_code": "RESOURCE_ALREADY_EXISTS", "message": "Experiment 'test1' already exists."}),
        ));
        let error = server(&transport).create_experiment("test1", "").unwrap_err();
        assert!(error.is_already_exists());
    }

    #[test]
    fn list_experiments_without_payload() {
        let transport = Arc::new(Scripted::default().reply(
            200,
            json!({"experiments": [experiment_json("0", "Default"), experiment_json("1", "test1")]}),
        ));
        let experiments = server(&transport).list_experiments().unwrap();
        assert_eq!(experiments.len(), 2);
        assert_eq!(experiments[1].name, "test1");

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "http://localhost:5000/api/2.0/mlflow/experiments/list");
        assert_eq!(request.body, None);
    }

    #[test]
    fn list_without_experiments_is_empty() {
        let transport = Arc::new(Scripted::default().reply(200, json!({})));
        assert!(server(&transport).list_experiments().unwrap().is_empty());
    }

    #[test]
    fn get_experiment_uses_query() {
        let transport = Arc::new(Scripted::default().reply(200, json!({"experiment": experiment_json("7", "e")})));
        let experiment = server(&transport).get_experiment(&"7".into()).unwrap();
        assert_eq!(experiment.artifact_location, "./mlruns/7");

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Get);
        assert!(request.url.ends_with("/experiments/get?experiment_id=7"));
    }

    #[test]
    fn legacy_verbs_send_get_with_body() {
        let transport = Arc::new(
            Scripted::default()
                .reply(200, json!({"experiment": experiment_json("7", "my exp")}))
                .reply(200, json!({})),
        );
        let server = Server::builder("http://localhost:5000")
            .verbs(VerbTable::legacy())
            .transport(transport.clone())
            .build();
        server.get_experiment_by_name("my exp").unwrap();
        server.delete_experiment(&"7".into()).unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Get);
        assert!(requests[0].url.ends_with("/experiments/get-by-name"));
        assert_eq!(body(&requests[0]), json!({"experiment_name": "my exp"}));
        assert_eq!(requests[1].method, Method::Get);
        assert_eq!(body(&requests[1]), json!({"experiment_id": "7"}));
    }

    #[test]
    fn missing_experiment_is_not_found() {
        let transport = Arc::new(Scripted::default().reply(
            404,
            json!({"error_code": "RESOURCE_DOES_NOT_EXIST", "message": "No Experiment with id=9 exists"}),
        ));
        let error = server(&transport).get_experiment(&"9".into()).unwrap_err();
        assert!(error.is_not_found());
    }

    #[test]
    fn delete_accepts_empty_body() {
        let transport = Arc::new(Scripted::default().reply_raw(200, ""));
        server(&transport).delete_experiment(&"3".into()).unwrap();
        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(body(request), json!({"experiment_id": "3"}));
    }

    #[test]
    fn malformed_body_is_a_deserialize_error() {
        let transport = Arc::new(Scripted::default().reply_raw(200, "{\"experiment_id\": "));
        let error = server(&transport).create_experiment("x", "").unwrap_err();
        assert!(matches!(error, Error::Deserialize { ref body, .. } if body.starts_with("{\"experiment_id\"")));
    }

    #[test]
    fn missing_field_is_a_deserialize_error() {
        let transport = Arc::new(Scripted::default().reply(200, json!({})));
        let error = server(&transport).get_experiment(&"1".into()).unwrap_err();
        assert!(matches!(error, Error::Deserialize { .. }));
    }

    #[test]
    fn get_run_sends_both_ids() {
        let transport = Arc::new(Scripted::default().reply(
            200,
            json!({"run": {
                "info": {"run_id": "r1", "run_uuid": "r1", "experiment_id": "1", "status": "RUNNING", "start_time": 10},
                "data": {"metrics": [{"key": "loss", "value": 1.5}]}
            }}),
        ));
        let run = server(&transport).get_run(&"r1".into(), "r1").unwrap();
        assert_eq!(run.info.status, RunStatus::Running);
        assert_eq!(run.data.metrics[0].value, 1.5);

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(body(request), json!({"run_id": "r1", "run_uuid": "r1"}));
    }

    #[test]
    fn search_runs_posts_query() {
        let transport = Arc::new(Scripted::default().reply(200, json!({"runs": [], "next_page_token": "abc"})));
        let query = SearchRuns::new(["1"])
            .filter("params.lr = '0.1'")
            .view(ViewType::Deleted)
            .max_results(5)
            .order_by("start_time DESC");
        let page = server(&transport).search_runs(&query).unwrap();
        assert_eq!(page.next().map(|token| token.as_ref()), Some("abc"));

        assert_eq!(
            body(&transport.requests()[0]),
            json!({
                "experiment_ids": ["1"],
                "filter": "params.lr = '0.1'",
                "run_view_type": "DELETED_ONLY",
                "max_results": 5,
                "order_by": ["start_time DESC"]
            })
        );
    }

    #[test]
    fn run_lifecycle_requests() {
        let transport = Arc::new(
            Scripted::default()
                .reply(
                    200,
                    json!({"run": {"info": {"run_id": "r", "experiment_id": "1", "status": "RUNNING", "start_time": "5"}}}),
                )
                .reply(200, json!({}))
                .reply(200, json!({}))
                .reply(
                    200,
                    json!({"run_info": {"run_id": "r", "experiment_id": "1", "status": "FINISHED", "start_time": 5, "end_time": 9}}),
                )
                .reply(200, json!({})),
        );
        let server = server(&transport);
        let run = server.create_run(&"1".into(), 5, &[RunTag::new("source", "test")]).unwrap();
        let id = run.info.run_id;
        server.log_param(&id, "lr", "0.1").unwrap();
        server.log_metric(&id, "loss", 0.5, 7, 1).unwrap();
        let info = server.update_run(&id, RunStatus::Finished, 9).unwrap();
        assert_eq!(info.end_time, Some(9));
        server.delete_run(&id).unwrap();

        let requests = transport.requests();
        let paths: Vec<_> = requests
            .iter()
            .map(|request| request.url.trim_start_matches("http://localhost:5000/api/2.0/mlflow/"))
            .collect();
        assert_eq!(
            paths,
            vec!["runs/create", "runs/log-parameter", "runs/log-metric", "runs/update", "runs/delete"]
        );
        assert_eq!(
            body(&requests[0]),
            json!({"experiment_id": "1", "start_time": 5, "tags": [{"key": "source", "value": "test"}]})
        );
        assert_eq!(
            body(&requests[2]),
            json!({"run_id": "r", "key": "loss", "value": 0.5, "timestamp": 7, "step": 1})
        );
        assert_eq!(
            body(&requests[3]),
            json!({"run_id": "r", "status": "FINISHED", "end_time": 9})
        );
    }

    #[test]
    fn oversized_batch_is_refused_locally() {
        let transport = Arc::new(Scripted::default());
        let params: Vec<_> = (0..101).map(|i| Param::new(format!("p{}", i), "v")).collect();
        let error = server(&transport)
            .log_batch(&"r".into(), &[], &params, &[])
            .unwrap_err();
        assert!(matches!(error, Error::Batch(BatchError::TooManyParams(101))));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn batch_total_is_limited() {
        let metrics: Vec<_> = (0..950)
            .map(|step| Metric {
                key: "m".into(),
                value: 0.0,
                timestamp: 0,
                step,
            })
            .collect();
        let params: Vec<_> = (0..60).map(|i| Param::new(format!("p{}", i), "v")).collect();
        let run_id = RunId::from("r");
        let batch = LogBatch {
            run_id: &run_id,
            metrics: &metrics,
            params: &params,
            tags: &[],
        };
        assert_eq!(batch.validate(), Err(BatchError::TooManyItems(1010)));
    }

    #[test]
    fn transport_errors_surface_immediately() {
        let transport = Arc::new(Scripted::default());
        let error = server(&transport).list_experiments().unwrap_err();
        assert!(matches!(error, Error::Transport { .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn rejection_code_survives() {
        let transport = Arc::new(Scripted::default().reply(
            400,
            json!({"error_code": "INVALID_PARAMETER_VALUE", "message": "bad filter"}),
        ));
        let error = server(&transport).search_runs(&SearchRuns::new(["1"])).unwrap_err();
        assert_eq!(error.code(), Some(&ErrorCode::InvalidParameterValue));
    }

    #[test]
    fn verb_override_for_single_operation() {
        let transport = Arc::new(Scripted::default().reply(200, json!({"experiments": []})));
        let server = Server::builder("http://localhost:5000")
            .verbs(VerbTable::rest().with(Operation::ListExperiments, Verb::Post))
            .transport(transport.clone())
            .build();
        server.list_experiments().unwrap();
        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(body(request), json!({}));
    }
}
