//! In-process mock control plane for tests.
//!
//! Serves the subset of the engine API flowkeeper uses on an ephemeral
//! localhost port, records every call, and can be scripted to fail
//! specific method/path pairs.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::client::ControlPlaneClient;
use crate::types::*;

const BASE_PATH: &str = "/api/v1";

/// One request received by the mock. `path` is relative to the API base.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub at: Instant,
}

#[derive(Default)]
struct MockState {
    pipelines: BTreeMap<String, Pipeline>,
    jobs: HashMap<String, Vec<Job>>,
    profiles: Vec<ConnectionProfile>,
    tables: BTreeMap<String, Value>,
    failures: HashMap<(Method, String), (StatusCode, String)>,
    calls: Vec<RecordedCall>,
    next_id: u64,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }
}

type Shared = Arc<Mutex<MockState>>;

/// A running mock control plane. The server stops when this is dropped.
pub struct MockControlPlane {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl MockControlPlane {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));

        let api = Router::new()
            .route("/pipelines", get(list_pipelines).post(create_pipeline))
            .route("/pipelines/{id}", get(get_pipeline).delete(delete_pipeline))
            .route("/pipelines/{id}/jobs", get(list_jobs))
            .route("/connection_profiles", get(list_profiles))
            .route("/connection_tables", post(create_table))
            .with_state(state.clone());

        let app = Router::new()
            .nest(BASE_PATH, api)
            .layer(middleware::from_fn_with_state(state.clone(), record_and_script));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock control plane");
        let addr = listener.local_addr().expect("mock control plane address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// A client pointed at this mock.
    pub fn client(&self) -> ControlPlaneClient {
        ControlPlaneClient::new(&self.address(), BASE_PATH, Duration::from_secs(2))
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    /// Seed a pipeline and return its id.
    pub fn add_pipeline(&self, name: &str, query: &str, parallelism: Option<u32>) -> String {
        let mut s = self.lock();
        let id = s.next_id("pl");
        s.pipelines.insert(
            id.clone(),
            Pipeline {
                id: id.clone(),
                name: name.to_string(),
                query: query.to_string(),
                parallelism,
                checkpoint_interval_micros: Some(10_000_000),
            },
        );
        id
    }

    pub fn set_jobs(&self, pipeline_id: &str, jobs: Vec<Job>) {
        self.lock().jobs.insert(pipeline_id.to_string(), jobs);
    }

    pub fn add_profile(&self, id: &str, connector: &str) {
        self.lock().profiles.push(ConnectionProfile {
            id: id.to_string(),
            name: format!("{connector}-{id}"),
            connector: connector.to_string(),
            description: None,
        });
    }

    /// Answer `method path` with `status` and `body` until cleared.
    pub fn fail(&self, method: Method, path: &str, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).expect("valid status code");
        self.lock()
            .failures
            .insert((method, path.to_string()), (status, body.to_string()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Calls matching a method and relative path.
    pub fn calls_to(&self, method: &Method, path: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| &c.method == method && c.path == path)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn pipelines(&self) -> Vec<Pipeline> {
        self.lock().pipelines.values().cloned().collect()
    }

    pub fn pipeline_by_name(&self, name: &str) -> Option<Pipeline> {
        self.lock().pipelines.values().find(|p| p.name == name).cloned()
    }

    /// Stored connection table requests, keyed by name.
    pub fn tables(&self) -> BTreeMap<String, Value> {
        self.lock().tables.clone()
    }
}

impl Drop for MockControlPlane {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record_and_script(State(state): State<Shared>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let path = parts
        .uri
        .path()
        .strip_prefix(BASE_PATH)
        .unwrap_or(parts.uri.path())
        .to_string();

    let scripted = {
        let mut s = state.lock().expect("mock state poisoned");
        s.calls.push(RecordedCall {
            method: parts.method.clone(),
            path: path.clone(),
            body: serde_json::from_slice(&bytes).ok(),
            at: Instant::now(),
        });
        s.failures.get(&(parts.method.clone(), path)).cloned()
    };

    if let Some((status, body)) = scripted {
        return (status, body).into_response();
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn list_pipelines(State(state): State<Shared>) -> impl IntoResponse {
    let s = state.lock().expect("mock state poisoned");
    let data: Vec<PipelineSummary> = s
        .pipelines
        .values()
        .map(|p| PipelineSummary {
            id: p.id.clone(),
            name: p.name.clone(),
            query: Some(p.query.clone()),
        })
        .collect();
    Json(json!({ "data": data }))
}

async fn get_pipeline(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let s = state.lock().expect("mock state poisoned");
    match s.pipelines.get(&id) {
        Some(p) => Json(p.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "pipeline not found").into_response(),
    }
}

async fn delete_pipeline(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut s = state.lock().expect("mock state poisoned");
    match s.pipelines.remove(&id) {
        Some(_) => {
            s.jobs.remove(&id);
            StatusCode::OK.into_response()
        }
        None => (StatusCode::NOT_FOUND, "pipeline not found").into_response(),
    }
}

async fn create_pipeline(
    State(state): State<Shared>,
    Json(req): Json<CreatePipelineRequest>,
) -> Response {
    let mut s = state.lock().expect("mock state poisoned");
    if s.pipelines.values().any(|p| p.name == req.name) {
        return (
            StatusCode::BAD_REQUEST,
            format!("pipeline with name '{}' already exists", req.name),
        )
            .into_response();
    }
    let id = s.next_id("pl");
    let pipeline = Pipeline {
        id: id.clone(),
        name: req.name,
        query: req.query,
        parallelism: Some(req.parallelism),
        checkpoint_interval_micros: Some(req.checkpoint_interval_micros),
    };
    s.pipelines.insert(id, pipeline.clone());
    Json(pipeline).into_response()
}

async fn list_jobs(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let s = state.lock().expect("mock state poisoned");
    if !s.pipelines.contains_key(&id) {
        return (StatusCode::NOT_FOUND, "pipeline not found").into_response();
    }
    let jobs = s.jobs.get(&id).cloned().unwrap_or_default();
    Json(json!({ "data": jobs })).into_response()
}

async fn list_profiles(State(state): State<Shared>) -> impl IntoResponse {
    let s = state.lock().expect("mock state poisoned");
    Json(json!({ "data": s.profiles }))
}

async fn create_table(State(state): State<Shared>, Json(req): Json<Value>) -> Response {
    let mut s = state.lock().expect("mock state poisoned");
    let name = req
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if s.tables.contains_key(&name) {
        return (
            StatusCode::CONFLICT,
            format!("connection table '{name}' already exists"),
        )
            .into_response();
    }
    let id = s.next_id("ct");
    s.tables.insert(name.clone(), req);
    Json(json!({ "id": id, "name": name })).into_response()
}
